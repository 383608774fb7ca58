//! `GlobalState`: C7 from the design — the multi-tenant owner of the Name
//! table, Symbol table, and file table, wired together with the reserved
//! bootstrap IDs §6.3 requires (§3.1/§3.2/§9's "manual arenas become owned
//! `Vec` + index handles").

use crate::intern::{NameRef, NameTable, UniqueNameKind, WellKnownName};
use crate::loc::{File, FileRef};
use crate::symbols::{SymbolKind, SymbolRef, SymbolTable};

/// Plain constructor-argument struct for `GlobalState`, matching the
/// teacher's builder-style resource-limit configs: no config-file or
/// env-var crate, just `#[must_use]`-returning setters over documented
/// defaults (§11.3).
#[derive(Debug, Clone, Copy)]
pub struct GlobalStateConfig {
    initial_name_capacity: u32,
    initial_file_capacity: u32,
}

impl Default for GlobalStateConfig {
    fn default() -> Self {
        Self { initial_name_capacity: 512, initial_file_capacity: 16 }
    }
}

impl GlobalStateConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_initial_name_capacity(mut self, capacity: u32) -> Self {
        self.initial_name_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_initial_file_capacity(mut self, capacity: u32) -> Self {
        self.initial_file_capacity = capacity;
        self
    }
}

/// The fixed set of built-in classes/modules bootstrapped at startup, in the
/// exact order §6.3 specifies. `rbfront` reuses this order as the basis for
/// the reserved `SymbolRef` prefix; see `DESIGN.md` for the placeholder-range
/// decision (§9 Open Questions).
const BOOTSTRAP_CLASS_NAMES: &[&str] = &[
    "NilClass",
    "TrueClass",
    "FalseClass",
    "Integer",
    "Float",
    "String",
    "Symbol",
    "Array",
    "Hash",
    "Regexp",
    "Proc",
    "Range",
    "Object",
    "BasicObject",
    "Kernel",
    "Module",
    "Class",
    "Exception",
    "StandardError",
    "Magic",
    "T",
];

/// Number of placeholder `SymbolRef`s reserved after `<attached>` for future
/// singleton/attached-class growth (§13 Open Question decision: 2 named
/// slots + 6 unused).
const PLACEHOLDER_GROWTH_SLOTS: usize = 6;

pub struct GlobalState {
    names: NameTable,
    symbols: SymbolTable,
    files: Vec<File>,

    pub root: SymbolRef,
    pub top: SymbolRef,
    pub bottom: SymbolRef,
    pub nil_class: SymbolRef,
    pub todo: SymbolRef,

    pub singleton_placeholder: SymbolRef,
    pub attached_placeholder: SymbolRef,

    bootstrap_classes: ahash::AHashMap<&'static str, SymbolRef>,
}

impl GlobalState {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GlobalStateConfig::default())
    }

    #[must_use]
    pub fn with_config(config: GlobalStateConfig) -> Self {
        let mut names = NameTable::with_capacity(config.initial_name_capacity);
        let mut symbols = SymbolTable::new();
        let files = Vec::with_capacity(config.initial_file_capacity as usize);

        // Reserve every `WellKnownName` NameRef in its documented order
        // before any user code is interned, so the ABI prefix is stable.
        for wk in <WellKnownName as strum::IntoEnumIterator>::iter() {
            let assigned = names.enter_utf8(wk.as_str().as_bytes());
            debug_assert_eq!(assigned, wk.name_ref(), "WellKnownName order drifted from its reserved NameRef");
        }

        let none_name = names.enter_utf8(b"<none>");
        let top_name = names.enter_utf8(b"<top>");
        let bottom_name = names.enter_utf8(b"<bottom>");
        let root_name = names.enter_utf8(b"<root>");
        let nil_name = names.enter_utf8(b"nil");
        let todo_name = names.enter_utf8(b"<todo>");

        // `noSymbol` is SymbolRef(0), never allocated; `<none>`'s NameRef
        // plays the analogous "index 0 reserved" role in the Name arena.
        let _ = none_name;

        let root = symbols.alloc_bootstrap(SymbolRef::NO_SYMBOL, root_name);
        symbols.get_mut(root).set_kind(SymbolKind::Class);
        let top = symbols.alloc_bootstrap(root, top_name);
        symbols.get_mut(top).set_kind(SymbolKind::Class);
        let bottom = symbols.alloc_bootstrap(root, bottom_name);
        symbols.get_mut(bottom).set_kind(SymbolKind::Class);
        let nil_class = symbols.get_top_level_class_symbol(root, nil_name);
        let todo = symbols.alloc_bootstrap(root, todo_name);
        symbols.get_mut(todo).set_kind(SymbolKind::Field);

        let mut bootstrap_classes = ahash::AHashMap::with_capacity(BOOTSTRAP_CLASS_NAMES.len());
        for &class_name in BOOTSTRAP_CLASS_NAMES {
            let name_ref = names.enter_utf8(class_name.as_bytes());
            let sym = symbols.get_top_level_class_symbol(root, name_ref);
            bootstrap_classes.insert(class_name, sym);
        }

        let singleton_name = WellKnownName::SingletonClass.name_ref();
        let attached_name = WellKnownName::AttachedClass.name_ref();
        let singleton_placeholder = symbols.get_top_level_class_symbol(root, singleton_name);
        let attached_placeholder = symbols.get_top_level_class_symbol(root, attached_name);
        for i in 0..PLACEHOLDER_GROWTH_SLOTS {
            let sep = names.enter_utf8(b"$");
            let growth_name = names.enter_unique(sep, i as u16, UniqueNameKind::Singleton, singleton_name);
            symbols.get_top_level_class_symbol(root, growth_name);
        }

        Self {
            names,
            symbols,
            files,
            root,
            top,
            bottom,
            nil_class,
            todo,
            singleton_placeholder,
            attached_placeholder,
            bootstrap_classes,
        }
    }

    #[must_use]
    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn names_mut(&mut self) -> &mut NameTable {
        &mut self.names
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Looks up one of the well-known bootstrap classes by its bare name
    /// (e.g. `"Integer"`, `"StandardError"`).
    #[must_use]
    pub fn bootstrap_class(&self, name: &str) -> Option<SymbolRef> {
        self.bootstrap_classes.get(name).copied()
    }

    /// Loads a source file, returning its `FileRef`. Index 0 is never
    /// assigned (`FileRef::NONE`); the first loaded file gets index 1.
    pub fn load_file(&mut self, path: String, source: String) -> FileRef {
        self.files.push(File::new(path, source));
        FileRef::from_index(self.files.len() as u32)
    }

    #[must_use]
    pub fn file(&self, r: FileRef) -> &File {
        &self.files[r.index() - 1]
    }

    pub fn next_unique_desugar_name(&mut self, original: NameRef, num: u16) -> NameRef {
        let sep = self.names.enter_utf8(b"$");
        self.names.enter_unique(sep, num, UniqueNameKind::Desugar, original)
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_reserves_well_known_classes() {
        let gs = GlobalState::new();
        let int_class = gs.bootstrap_class("Integer").unwrap();
        let name = gs.symbols().get(int_class).name();
        assert_eq!(gs.names().utf8_str(name), Some("Integer"));
    }

    #[test]
    fn well_known_names_keep_their_reserved_refs() {
        let gs = GlobalState::new();
        assert_eq!(gs.names().utf8_str(WellKnownName::Initialize.name_ref()), Some("initialize"));
    }

    #[test]
    fn file_refs_start_at_one() {
        let mut gs = GlobalState::new();
        let f = gs.load_file("a.rb".to_owned(), "1".to_owned());
        assert_eq!(f.index(), 1);
        assert_eq!(gs.file(f).path(), "a.rb");
    }

    #[test]
    fn desugar_temps_are_idempotent_per_call_site() {
        let mut gs = GlobalState::new();
        let orig = gs.names_mut().enter_utf8(b"rescueTemp");
        let a = gs.next_unique_desugar_name(orig, 1);
        let b = gs.next_unique_desugar_name(orig, 1);
        assert_eq!(a, b);
    }
}
