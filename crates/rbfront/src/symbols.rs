//! The symbol table: C3 from the design.
//!
//! A [`SymbolTable`] is a second append-only arena, structurally identical in
//! spirit to [`crate::intern::NameTable`] (stable `u32` handles, no reuse, no
//! remapping) but indexed by `(owner, name)` membership rather than by a
//! global hash bucket: `enterSymbol` inserts into `owner`'s `members` map
//! directly (§4.2), so there is no separate probe sequence to hand-roll here.

use indexmap::IndexMap;

use crate::intern::NameRef;

/// Index into the symbol arena. `SymbolRef(0)` is `noSymbol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct SymbolRef(u32);

impl SymbolRef {
    pub const NO_SYMBOL: Self = Self(0);

    #[inline]
    fn from_index(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn exists(self) -> bool {
        self.0 != 0
    }
}

/// The four mutually-exclusive symbol kinds (§3.2 invariant: "exactly one
/// kind once set"). Stored as one-hot bits in `SymbolInfo::flags` rather than
/// a 2-bit field, matching the original frontend's bit layout bit-for-bit
/// (`examples/original_source/ast/Symbols.h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Array,
    Field,
    Method,
}

impl SymbolKind {
    fn bit(self) -> u32 {
        match self {
            Self::Class => FLAG_KIND_CLASS,
            Self::Array => FLAG_KIND_ARRAY,
            Self::Field => FLAG_KIND_FIELD,
            Self::Method => FLAG_KIND_METHOD,
        }
    }
}

/// The completion state machine (§4.2): `Uninitialized` ->
/// `LoadingFromFile`/`LoadingFromJar` -> `Completed`. `mixins()`/`parent()` are
/// only readable once `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompletionState {
    Uninitialized,
    LoadingFromFile,
    LoadingFromJar,
    Completed,
}

impl CompletionState {
    fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::Uninitialized,
            1 => Self::LoadingFromFile,
            2 => Self::LoadingFromJar,
            3 => Self::Completed,
            _ => unreachable!("completion state is a 2-bit field"),
        }
    }

    fn to_bits(self) -> u32 {
        match self {
            Self::Uninitialized => 0,
            Self::LoadingFromFile => 1,
            Self::LoadingFromJar => 2,
            Self::Completed => 3,
        }
    }
}

const FLAG_KIND_CLASS: u32 = 0x8000;
const FLAG_KIND_ARRAY: u32 = 0x4000;
const FLAG_KIND_FIELD: u32 = 0x2000;
const FLAG_KIND_METHOD: u32 = 0x1000;
const KIND_MASK: u32 = FLAG_KIND_CLASS | FLAG_KIND_ARRAY | FLAG_KIND_FIELD | FLAG_KIND_METHOD;

const COMPLETION_SHIFT: u32 = 10;
const COMPLETION_MASK: u32 = 0x0C00;

const FLAG_ABSTRACT: u32 = 1 << 0;
const FLAG_OVERRIDE: u32 = 1 << 1;
const FLAG_OVERLOADABLE: u32 = 1 << 2;
const FLAG_PRIVATE: u32 = 1 << 3;
const FLAG_PROTECTED: u32 = 1 << 4;
const FLAG_SELF_METHOD: u32 = 1 << 5;
const FLAG_DSL_SYNTHESIZED: u32 = 1 << 6;

/// A declared name in the program: a class, module, method, field, or array
/// arity marker (§3.2). `argumentsOrMixins` and `resultOrParentOrLoader` are
/// reused slots whose meaning depends on `kind()` — this mirrors the
/// original's memory-conscious layout, kept here for ABI/debug-dump fidelity
/// rather than for memory pressure reasons.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    owner: SymbolRef,
    name: NameRef,
    flags: u32,
    /// Mixin/ancestor refs for a class; positional+keyword+block argument
    /// symbols in declaration order for a method.
    arguments_or_mixins: Vec<SymbolRef>,
    /// Superclass for a class; return-type symbol for a method; loader tag
    /// while `completion() != Completed`.
    result_or_parent_or_loader: SymbolRef,
    /// Nested scope entries, insertion-ordered, last-write-wins on a repeated
    /// `NameRef` (§3.2).
    members: IndexMap<NameRef, SymbolRef>,
}

impl SymbolInfo {
    fn new(owner: SymbolRef, name: NameRef) -> Self {
        Self {
            owner,
            name,
            flags: 0,
            arguments_or_mixins: Vec::new(),
            result_or_parent_or_loader: SymbolRef::NO_SYMBOL,
            members: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn owner(&self) -> SymbolRef {
        self.owner
    }

    #[must_use]
    pub fn name(&self) -> NameRef {
        self.name
    }

    #[must_use]
    pub fn kind(&self) -> Option<SymbolKind> {
        match self.flags & KIND_MASK {
            FLAG_KIND_CLASS => Some(SymbolKind::Class),
            FLAG_KIND_ARRAY => Some(SymbolKind::Array),
            FLAG_KIND_FIELD => Some(SymbolKind::Field),
            FLAG_KIND_METHOD => Some(SymbolKind::Method),
            0 => None,
            _ => unreachable!("kind bits are one-hot by construction"),
        }
    }

    #[must_use]
    pub fn completion(&self) -> CompletionState {
        CompletionState::from_bits((self.flags & COMPLETION_MASK) >> COMPLETION_SHIFT)
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags & FLAG_ABSTRACT != 0
    }

    #[must_use]
    pub fn is_override(&self) -> bool {
        self.flags & FLAG_OVERRIDE != 0
    }

    #[must_use]
    pub fn is_overloadable(&self) -> bool {
        self.flags & FLAG_OVERLOADABLE != 0
    }

    #[must_use]
    pub fn is_private(&self) -> bool {
        self.flags & FLAG_PRIVATE != 0
    }

    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.flags & FLAG_PROTECTED != 0
    }

    #[must_use]
    pub fn is_self_method(&self) -> bool {
        self.flags & FLAG_SELF_METHOD != 0
    }

    #[must_use]
    pub fn is_dsl_synthesized(&self) -> bool {
        self.flags & FLAG_DSL_SYNTHESIZED != 0
    }

    #[must_use]
    pub fn arguments_or_mixins(&self) -> &[SymbolRef] {
        &self.arguments_or_mixins
    }

    #[must_use]
    pub fn result_or_parent_or_loader(&self) -> SymbolRef {
        self.result_or_parent_or_loader
    }

    #[must_use]
    pub fn members(&self) -> &IndexMap<NameRef, SymbolRef> {
        &self.members
    }

    fn set_kind(&mut self, kind: SymbolKind) {
        let bit = kind.bit();
        debug_assert!(
            self.flags & KIND_MASK == 0 || self.flags & KIND_MASK == bit,
            "symbol kind is monotonic: cannot change an already-set kind"
        );
        self.flags = (self.flags & !KIND_MASK) | bit;
    }

    fn set_flag(&mut self, flag: u32, value: bool) {
        if value {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    pub fn set_abstract(&mut self, value: bool) {
        self.set_flag(FLAG_ABSTRACT, value);
    }

    pub fn set_override(&mut self, value: bool) {
        self.set_flag(FLAG_OVERRIDE, value);
    }

    pub fn set_overloadable(&mut self, value: bool) {
        self.set_flag(FLAG_OVERLOADABLE, value);
    }

    pub fn set_private(&mut self, value: bool) {
        self.set_flag(FLAG_PRIVATE, value);
    }

    pub fn set_protected(&mut self, value: bool) {
        self.set_flag(FLAG_PROTECTED, value);
    }

    pub fn set_self_method(&mut self, value: bool) {
        self.set_flag(FLAG_SELF_METHOD, value);
    }

    pub fn set_dsl_synthesized(&mut self, value: bool) {
        self.set_flag(FLAG_DSL_SYNTHESIZED, value);
    }

    fn set_completion(&mut self, state: CompletionState) {
        debug_assert!(
            state >= self.completion(),
            "completion state setters refuse downgrades"
        );
        self.flags = (self.flags & !COMPLETION_MASK) | (state.to_bits() << COMPLETION_SHIFT);
    }
}

/// Raised by operations on [`SymbolTable`] that the desugarer or bootstrap
/// code is expected to recover from (as opposed to `debug_assert!`-guarded
/// invariant violations, which are internal bugs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolTableError {
    /// `enterSymbol` was called with `(owner, name)` already bound to a
    /// symbol of a different kind.
    KindConflict {
        owner: SymbolRef,
        name: NameRef,
        existing: SymbolKind,
        requested: SymbolKind,
    },
}

impl std::fmt::Display for SymbolTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KindConflict { owner, name, existing, requested } => write!(
                f,
                "symbol ({owner:?}, {name:?}) already exists with kind {existing:?}, cannot re-enter as {requested:?}"
            ),
        }
    }
}

impl std::error::Error for SymbolTableError {}

/// The append-only Symbol arena (§3.2/§4.2).
pub struct SymbolTable {
    entries: Vec<SymbolInfo>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, sym: SymbolRef) -> &SymbolInfo {
        &self.entries[sym.0 as usize - 1]
    }

    #[must_use]
    pub fn get_mut(&mut self, sym: SymbolRef) -> &mut SymbolInfo {
        &mut self.entries[sym.0 as usize - 1]
    }

    fn alloc(&mut self, owner: SymbolRef, name: NameRef) -> SymbolRef {
        self.entries.push(SymbolInfo::new(owner, name));
        SymbolRef::from_index(self.entries.len() as u32)
    }

    /// Allocates a root-owned symbol with no further bookkeeping — used only
    /// to synthesize the handful of symbols that exist before any owner does
    /// (`noSymbol`, `top`, `bottom`, `root`).
    pub(crate) fn alloc_bootstrap(&mut self, owner: SymbolRef, name: NameRef) -> SymbolRef {
        self.alloc(owner, name)
    }

    /// Looks up `name` in `root`'s members; if present returns it, else
    /// allocates a fresh class symbol and inserts it. Used only for
    /// synthesizing built-in/bootstrap classes (§4.2); user classes go
    /// through [`Self::enter_symbol`].
    pub fn get_top_level_class_symbol(&mut self, root: SymbolRef, name: NameRef) -> SymbolRef {
        if let Some(existing) = self.entries[root.0 as usize - 1].members.get(&name) {
            return *existing;
        }
        let sym = self.alloc(root, name);
        self.get_mut(sym).set_kind(SymbolKind::Class);
        self.entries[root.0 as usize - 1].members.insert(name, sym);
        sym
    }

    /// Allocates and registers `name` under `owner.members`. Idempotent on
    /// `(owner, name)` for the same `kind`; re-entering with a different kind
    /// is [`SymbolTableError::KindConflict`] (§4.2).
    pub fn enter_symbol(&mut self, owner: SymbolRef, name: NameRef, kind: SymbolKind) -> Result<SymbolRef, SymbolTableError> {
        if let Some(existing) = self.entries[owner.0 as usize - 1].members.get(&name).copied() {
            let existing_kind = self.get(existing).kind();
            return match existing_kind {
                Some(k) if k == kind => Ok(existing),
                Some(k) => Err(SymbolTableError::KindConflict { owner, name, existing: k, requested: kind }),
                None => {
                    self.get_mut(existing).set_kind(kind);
                    Ok(existing)
                }
            };
        }
        let sym = self.alloc(owner, name);
        self.get_mut(sym).set_kind(kind);
        self.entries[owner.0 as usize - 1].members.insert(name, sym);
        Ok(sym)
    }

    /// Non-hot-path query: linear scan of `owner`'s members for `name`. Kept
    /// separate from the insertion path per §3.2's "linear for small N" note
    /// — most scopes have few enough members that an `IndexMap` lookup (which
    /// this already uses) and a dedicated linear scan perform identically;
    /// this exists for API parity with lookups that want a `None` without
    /// mutating anything.
    #[must_use]
    pub fn find_member(&self, owner: SymbolRef, name: NameRef) -> Option<SymbolRef> {
        self.get(owner).members.get(&name).copied()
    }

    pub fn set_completed(&mut self, sym: SymbolRef) {
        self.get_mut(sym).set_completion(CompletionState::Completed);
    }

    pub fn set_loading(&mut self, sym: SymbolRef, from_jar: bool, loader: SymbolRef) {
        let info = self.get_mut(sym);
        info.result_or_parent_or_loader = loader;
        info.set_completion(if from_jar { CompletionState::LoadingFromJar } else { CompletionState::LoadingFromFile });
    }

    /// Ancestor/mixin list of a completed class symbol. Panics (debug) if
    /// `sym` isn't `Completed` — driving completion from an incomplete state
    /// is the resolver's job, out of scope here (§1).
    #[must_use]
    pub fn mixins(&self, sym: SymbolRef) -> &[SymbolRef] {
        debug_assert_eq!(self.get(sym).completion(), CompletionState::Completed, "mixins() read before completion");
        &self.get(sym).arguments_or_mixins
    }

    #[must_use]
    pub fn parent(&self, sym: SymbolRef) -> SymbolRef {
        debug_assert_eq!(self.get(sym).completion(), CompletionState::Completed, "parent() read before completion");
        self.get(sym).result_or_parent_or_loader
    }

    /// Joins `sym`'s owner chain with the separator appropriate to each hop:
    /// `::` between classes/modules, `#` before a method name. Supplements
    /// the core table (not named in the data model) for debug dumps and
    /// future hover text, grounded in the original's `Symbols::fullName`.
    #[must_use]
    pub fn full_name(&self, names: &crate::intern::NameTable, sym: SymbolRef) -> String {
        if !sym.exists() {
            return "<root>".to_owned();
        }
        let info = self.get(sym);
        let owner_name = self.full_name(names, info.owner);
        let sep = match info.kind() {
            Some(SymbolKind::Method) => "#",
            _ => "::",
        };
        let own = names.display_name(info.name);
        if owner_name == "<root>" {
            own
        } else {
            format!("{owner_name}{sep}{own}")
        }
    }

    /// A short debug label: `kind(fullName)`, e.g. `class(Foo::Bar)`.
    #[must_use]
    pub fn to_debug_string(&self, names: &crate::intern::NameTable, sym: SymbolRef) -> String {
        let kind = match self.get(sym).kind() {
            Some(SymbolKind::Class) => "class",
            Some(SymbolKind::Array) => "array",
            Some(SymbolKind::Field) => "field",
            Some(SymbolKind::Method) => "method",
            None => "symbol",
        };
        format!("{kind}({})", self.full_name(names, sym))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::NameTable;

    fn root_setup() -> (SymbolTable, NameTable, SymbolRef) {
        let mut symbols = SymbolTable::new();
        let mut names = NameTable::new();
        let root_name = names.enter_utf8(b"<root>");
        let root = symbols.alloc_bootstrap(SymbolRef::NO_SYMBOL, root_name);
        symbols.get_mut(root).set_kind(SymbolKind::Class);
        (symbols, names, root)
    }

    #[test]
    fn top_level_class_symbol_is_idempotent() {
        let (mut symbols, mut names, root) = root_setup();
        let foo = names.enter_utf8(b"Foo");
        let a = symbols.get_top_level_class_symbol(root, foo);
        let b = symbols.get_top_level_class_symbol(root, foo);
        assert_eq!(a, b);
        assert_eq!(symbols.get(a).kind(), Some(SymbolKind::Class));
    }

    #[test]
    fn enter_symbol_is_idempotent_for_same_kind() {
        let (mut symbols, mut names, root) = root_setup();
        let m = names.enter_utf8(b"bar");
        let a = symbols.enter_symbol(root, m, SymbolKind::Method).unwrap();
        let b = symbols.enter_symbol(root, m, SymbolKind::Method).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn enter_symbol_rejects_kind_conflict() {
        let (mut symbols, mut names, root) = root_setup();
        let n = names.enter_utf8(b"Baz");
        symbols.enter_symbol(root, n, SymbolKind::Class).unwrap();
        let err = symbols.enter_symbol(root, n, SymbolKind::Method).unwrap_err();
        assert!(matches!(err, SymbolTableError::KindConflict { .. }));
    }

    #[test]
    fn exactly_one_kind_bit_is_ever_set() {
        let (mut symbols, mut names, root) = root_setup();
        let n = names.enter_utf8(b"Quux");
        let sym = symbols.enter_symbol(root, n, SymbolKind::Field).unwrap();
        let flags = symbols.get(sym).flags;
        assert_eq!((flags & KIND_MASK).count_ones(), 1);
    }

    #[test]
    fn full_name_joins_with_scope_separators() {
        let (mut symbols, mut names, root) = root_setup();
        let outer = names.enter_utf8(b"Outer");
        let outer_sym = symbols.get_top_level_class_symbol(root, outer);
        let method = names.enter_utf8(b"run");
        let method_sym = symbols.enter_symbol(outer_sym, method, SymbolKind::Method).unwrap();
        assert_eq!(symbols.full_name(&names, outer_sym), "Outer");
        assert_eq!(symbols.full_name(&names, method_sym), "Outer#run");
    }

    #[test]
    fn members_last_write_wins_on_duplicate_name() {
        let (mut symbols, mut names, root) = root_setup();
        let n = names.enter_utf8(b"Dup");
        let first = symbols.get_top_level_class_symbol(root, n);
        // re-entering with the existing symbol's own (owner, name) must not
        // fork a second entry.
        let second = symbols.get_top_level_class_symbol(root, n);
        assert_eq!(first, second);
        assert_eq!(symbols.get(root).members().len(), 1);
    }
}
