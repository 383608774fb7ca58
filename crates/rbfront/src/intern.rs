//! Name interning: C1 (string arena) + C2 (name table) from the design.
//!
//! Two kinds of [`Name`] share one open-addressed table: `Utf8` names borrow
//! bytes out of a page-allocated string arena, and `Unique` names are a
//! `(separator, num, original)` tuple used to manufacture collision-free
//! temporaries. Both are looked up through the same probe sequence (§4.1),
//! mirroring the teacher's single `StringId` space for ASCII/static/dynamic
//! strings but implementing the probing by hand, since that probing *is* the
//! hard part this module exists to get right.

use std::hash::{Hash, Hasher};

use ahash::AHasher;
use strum::{EnumIter, FromRepr, IntoStaticStr};

/// Index into the name arena. `NameRef(0)` is the reserved "non-existent"
/// sentinel and also marks an empty hash bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct NameRef(u32);

impl NameRef {
    pub(crate) const NONE: Self = Self(0);

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

/// Discriminates why a UNIQUE name was minted. Downstream passes use this to
/// tell a desugar-temp apart from a CFG-temp even when both wrap the same
/// original name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum UniqueNameKind {
    /// Minted by the surface parser (e.g. anonymous block/splat params).
    Parser,
    /// Minted by the desugar translator (§4.5; e.g. `<rescueTemp$17>`).
    Desugar,
    /// Minted during CFG construction (out of scope here, reserved for the
    /// downstream pass per §1).
    Cfg,
    /// Minted for a singleton-class name (`<Module>::<singleton>`).
    Singleton,
}

/// One entry in the name arena.
#[derive(Debug, Clone)]
enum NameData {
    Utf8 {
        page: u32,
        offset: u32,
        len: u32,
    },
    Unique {
        separator: NameRef,
        num: u16,
        kind: UniqueNameKind,
        original: NameRef,
    },
}

/// Well-known identifiers reserved at fixed, documented `NameRef` indices
/// (§6.3). The order mirrors the original frontend's bootstrap name list,
/// since downstream compiled artifacts reference these by numeric id and the
/// exact order is part of the ABI, not an implementation detail.
///
/// A well-known name's `NameRef` is `discriminant + 1` (index 0 stays the
/// non-existent sentinel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, EnumIter, IntoStaticStr)]
#[repr(u32)]
pub enum WellKnownName {
    #[strum(serialize = "initialize")]
    Initialize,
    #[strum(serialize = "&&")]
    AndAnd,
    #[strum(serialize = "||")]
    OrOr,
    #[strum(serialize = "to_s")]
    ToS,
    #[strum(serialize = "concat")]
    Concat,
    #[strum(serialize = "call")]
    Call,
    #[strum(serialize = "!")]
    Bang,
    #[strum(serialize = "[]")]
    SquareBrackets,
    #[strum(serialize = "[]=")]
    SquareBracketsEq,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "**")]
    StarStar,
    #[strum(serialize = "<<")]
    Shovel,
    #[strum(serialize = "<whileTemp>")]
    WhileTemp,
    #[strum(serialize = "<ifTemp>")]
    IfTemp,
    #[strum(serialize = "<blockRet>")]
    BlockRetTemp,
    #[strum(serialize = "<statTemp>")]
    StatTemp,
    #[strum(serialize = "<assignTemp>")]
    AssignTemp,
    #[strum(serialize = "<destructureArg>")]
    DestructureArg,
    #[strum(serialize = "<fwdArgs>")]
    FwdArgs,
    #[strum(serialize = "<fwdKwargs>")]
    FwdKwargs,
    #[strum(serialize = "<fwdBlock>")]
    FwdBlock,
    #[strum(serialize = "<dynamicConstAssign>")]
    DynamicConstAssign,
    #[strum(serialize = "<magic>")]
    Magic,
    #[strum(serialize = "include")]
    Include,
    #[strum(serialize = "__FILE__")]
    CurrentFile,
    #[strum(serialize = "merge")]
    Merge,
    #[strum(serialize = "to_ary")]
    ToAry,
    #[strum(serialize = "to_hash")]
    ToHash,
    #[strum(serialize = "new")]
    New,
    #[strum(serialize = "lambda")]
    Lambda,
    #[strum(serialize = "super")]
    Super,
    #[strum(serialize = "intern")]
    Intern,
    #[strum(serialize = "each")]
    Each,
    #[strum(serialize = "<singleton>")]
    SingletonClass,
    #[strum(serialize = "<attached>")]
    AttachedClass,
    #[strum(serialize = "===")]
    TripleEq,
}

impl WellKnownName {
    /// The fixed `NameRef` this well-known name occupies.
    #[must_use]
    pub fn name_ref(self) -> NameRef {
        NameRef::from_index(self as u32 + 1)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

const PAGE_SIZE: usize = 64 * 1024;
const INITIAL_NAME_CAPACITY: u32 = 512;

fn hash_utf8(bytes: &[u8]) -> u32 {
    let mut hasher = AHasher::default();
    0u8.hash(&mut hasher); // name-kind discriminant, mixed into the hash per §4.1
    bytes.hash(&mut hasher);
    hasher.finish() as u32
}

fn hash_unique(separator: NameRef, num: u16, kind: UniqueNameKind, original: NameRef) -> u32 {
    let mut hasher = AHasher::default();
    1u8.hash(&mut hasher); // name-kind discriminant
    separator.0.hash(&mut hasher);
    num.hash(&mut hasher);
    kind.hash(&mut hasher);
    original.0.hash(&mut hasher);
    hasher.finish() as u32
}

/// The append-only Name arena plus its open-addressed lookup index.
///
/// Owned by `GlobalState`; never shrinks or remaps an existing `NameRef`
/// (§3.1 invariants). Growth reallocates the bucket array and string pages but
/// leaves every previously returned `NameRef` valid (§8, "Growth preserves
/// contents").
pub struct NameTable {
    entries: Vec<NameData>,
    pages: Vec<Box<[u8]>>,
    page_used: usize,
    /// `(hash, id)` per bucket; `id == 0` marks an empty bucket. Sized as a
    /// power of two, kept at roughly 2x `cap` for a 0.5 load factor target.
    buckets: Vec<(u32, u32)>,
    cap: u32,
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NameTable {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_NAME_CAPACITY)
    }

    /// Same as [`Self::new`] but with a caller-chosen initial capacity
    /// (rounded up by the caller to a sensible power of two); exposed so
    /// `GlobalStateConfig` can size the table for a known-large compilation
    /// up front instead of paying for a few rounds of growth.
    #[must_use]
    pub fn with_capacity(initial_capacity: u32) -> Self {
        let initial_capacity = initial_capacity.max(16);
        Self {
            entries: Vec::with_capacity(initial_capacity as usize),
            pages: Vec::new(),
            page_used: 0,
            buckets: vec![(0, 0); (initial_capacity * 2) as usize],
            cap: initial_capacity,
        }
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn mask(&self) -> u32 {
        self.buckets.len() as u32 - 1
    }

    /// Probes for `hash`, calling `matches(id)` on every non-empty bucket
    /// whose stored hash agrees, to disambiguate real hash collisions from an
    /// actual match. Returns the bucket the caller should use (empty, or
    /// matching). A power-of-two table that doubles before it fills can never
    /// exhaust the probe sequence; if it does, the table's invariants are
    /// broken.
    fn probe(&self, hash: u32, mut matches: impl FnMut(u32) -> bool) -> u32 {
        let mask = self.mask();
        let mut bucket_id = hash & mask;
        let mut probe_count: u32 = 1;
        loop {
            let (stored_hash, id) = self.buckets[bucket_id as usize];
            if id == 0 || (stored_hash == hash && matches(id)) {
                return bucket_id;
            }
            assert!(probe_count != self.buckets.len() as u32, "name table probe exceeded table size");
            bucket_id = bucket_id.wrapping_add(probe_count) & mask;
            probe_count += 1;
        }
    }

    fn bucket_holds_match(&self, bucket_id: u32) -> bool {
        self.buckets[bucket_id as usize].1 != 0
    }

    fn grow(&mut self) {
        self.cap *= 2;
        self.buckets = vec![(0u32, 0u32); (self.cap * 2) as usize];
        for idx in 0..self.entries.len() {
            let id = idx as u32 + 1;
            let hash = match &self.entries[idx] {
                NameData::Utf8 { page, offset, len } => {
                    hash_utf8(&self.pages[*page as usize][*offset as usize..(*offset + *len) as usize])
                }
                NameData::Unique { separator, num, kind, original } => hash_unique(*separator, *num, *kind, *original),
            };
            let mask = self.mask();
            let mut bucket_id = hash & mask;
            let mut probe_count = 1;
            while self.buckets[bucket_id as usize].1 != 0 {
                bucket_id = bucket_id.wrapping_add(probe_count) & mask;
                probe_count += 1;
            }
            self.buckets[bucket_id as usize] = (hash, id);
        }
    }

    fn alloc_utf8(&mut self, bytes: &[u8]) -> NameData {
        assert!(bytes.len() <= PAGE_SIZE, "identifier longer than one arena page");
        if self.pages.is_empty() || self.page_used + bytes.len() > PAGE_SIZE {
            self.pages.push(vec![0u8; PAGE_SIZE].into_boxed_slice());
            self.page_used = 0;
        }
        let page = self.pages.len() as u32 - 1;
        let offset = self.page_used as u32;
        let slice = &mut self.pages[page as usize][self.page_used..self.page_used + bytes.len()];
        slice.copy_from_slice(bytes);
        self.page_used += bytes.len();
        NameData::Utf8 { page, offset, len: bytes.len() as u32 }
    }

    /// Interns a UTF-8 identifier, returning its stable `NameRef`. Idempotent:
    /// repeated calls with equal bytes return the same ref (§8, Name
    /// idempotence).
    pub fn enter_utf8(&mut self, bytes: &[u8]) -> NameRef {
        let hash = hash_utf8(bytes);
        let bucket = self.probe(hash, |id| self.utf8_bytes_at(id) == Some(bytes));
        if self.bucket_holds_match(bucket) {
            return NameRef::from_index(self.buckets[bucket as usize].1);
        }
        if self.entries.len() as u32 == self.cap {
            self.grow();
            let bucket = self.probe(hash, |_| false);
            return self.insert_utf8(bucket, hash, bytes);
        }
        self.insert_utf8(bucket, hash, bytes)
    }

    fn insert_utf8(&mut self, bucket: u32, hash: u32, bytes: &[u8]) -> NameRef {
        let data = self.alloc_utf8(bytes);
        self.entries.push(data);
        let id = self.entries.len() as u32;
        self.buckets[bucket as usize] = (hash, id);
        NameRef::from_index(id)
    }

    /// Interns (or looks up) a UNIQUE name `(separator, num, kind, original)`.
    /// Used by the desugarer (`UniqueNameKind::Desugar`) to mint collision-free
    /// temporaries, and by the parser adapter (`UniqueNameKind::Parser`).
    pub fn enter_unique(&mut self, separator: NameRef, num: u16, kind: UniqueNameKind, original: NameRef) -> NameRef {
        let hash = hash_unique(separator, num, kind, original);
        let matches_tuple = |id: u32| match &self.entries[id as usize - 1] {
            NameData::Unique { separator: s, num: n, kind: k, original: o } => {
                *s == separator && *n == num && *k == kind && *o == original
            }
            NameData::Utf8 { .. } => false,
        };
        let bucket = self.probe(hash, matches_tuple);
        if self.bucket_holds_match(bucket) {
            return NameRef::from_index(self.buckets[bucket as usize].1);
        }
        if self.entries.len() as u32 == self.cap {
            self.grow();
            let bucket = self.probe(hash, |_| false);
            return self.insert_unique(bucket, hash, separator, num, kind, original);
        }
        self.insert_unique(bucket, hash, separator, num, kind, original)
    }

    fn insert_unique(
        &mut self,
        bucket: u32,
        hash: u32,
        separator: NameRef,
        num: u16,
        kind: UniqueNameKind,
        original: NameRef,
    ) -> NameRef {
        self.entries.push(NameData::Unique { separator, num, kind, original });
        let id = self.entries.len() as u32;
        self.buckets[bucket as usize] = (hash, id);
        NameRef::from_index(id)
    }

    fn utf8_bytes_at(&self, id: u32) -> Option<&[u8]> {
        match self.entries.get(id as usize - 1)? {
            NameData::Utf8 { page, offset, len } => {
                Some(&self.pages[*page as usize][*offset as usize..(*offset + *len) as usize])
            }
            NameData::Unique { .. } => None,
        }
    }

    /// Returns the UTF-8 bytes for `r`, or `None` if `r` names a UNIQUE name
    /// (use [`Self::display_name`] to render those too).
    #[must_use]
    pub fn utf8_str(&self, r: NameRef) -> Option<&str> {
        self.utf8_bytes_at(r.0)
            .map(|b| std::str::from_utf8(b).expect("interned identifier bytes must be valid UTF-8"))
    }

    /// Renders any name (UTF-8 or UNIQUE) to an owned `String` for
    /// diagnostics and debug dumps. UNIQUE names render as `original$num`
    /// (e.g. `rescueTemp$17`), matching the example in §3.1.
    #[must_use]
    pub fn display_name(&self, r: NameRef) -> String {
        if !r.exists() {
            return "<none>".to_owned();
        }
        match &self.entries[r.0 as usize - 1] {
            NameData::Utf8 { .. } => self.utf8_str(r).unwrap().to_owned(),
            NameData::Unique { original, num, .. } => format!("{}${num}", self.display_name(*original)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_interning_is_idempotent() {
        let mut t = NameTable::new();
        let a = t.enter_utf8(b"foo");
        let b = t.enter_utf8(b"foo");
        assert_eq!(a, b);
        assert_eq!(t.utf8_str(a), Some("foo"));
    }

    #[test]
    fn distinct_bytes_get_distinct_refs() {
        let mut t = NameTable::new();
        let a = t.enter_utf8(b"foo");
        let b = t.enter_utf8(b"bar");
        assert_ne!(a, b);
    }

    #[test]
    fn unique_names_are_idempotent_and_distinguishable() {
        let mut t = NameTable::new();
        let sep = t.enter_utf8(b"$");
        let orig = t.enter_utf8(b"rescueTemp");
        let a = t.enter_unique(sep, 17, UniqueNameKind::Desugar, orig);
        let b = t.enter_unique(sep, 17, UniqueNameKind::Desugar, orig);
        assert_eq!(a, b);
        assert_eq!(t.display_name(a), "rescueTemp$17");

        let c = t.enter_unique(sep, 18, UniqueNameKind::Desugar, orig);
        assert_ne!(a, c);
    }

    #[test]
    fn growth_preserves_previously_returned_refs() {
        let mut t = NameTable::new();
        let mut refs = Vec::new();
        for i in 0..2000u32 {
            refs.push((i, t.enter_utf8(format!("name_{i}").as_bytes())));
        }
        for (i, r) in refs {
            assert_eq!(t.utf8_str(r), Some(format!("name_{i}").as_str()));
        }
    }

    #[test]
    fn well_known_name_ref_is_stable_and_ordered() {
        assert_eq!(WellKnownName::Initialize.name_ref(), NameRef::from_index(1));
        assert_eq!(WellKnownName::AndAnd.name_ref(), NameRef::from_index(2));
        assert_eq!(WellKnownName::Initialize.as_str(), "initialize");
    }

    #[test]
    fn name_zero_is_reserved_sentinel() {
        assert!(!NameRef::NONE.exists());
    }
}
