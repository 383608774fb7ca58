//! Source files and byte-offset locations.
//!
//! Mirrors the teacher's `StringId`/arena-index idiom: [`FileRef`] is a small
//! `Copy` newtype indexing into a `GlobalState`-owned table of [`File`]s, and
//! [`Loc`] is a `(FileRef, begin, end)` byte-offset triple. Offset-to-line/column
//! translation is the single conversion point (§4.3); all other position
//! arithmetic in the crate stays on raw byte offsets.

use std::fmt;

/// Index into the file table. Index 0 is reserved for "no file".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct FileRef(u32);

impl FileRef {
    pub(crate) const NONE: Self = Self(0);

    #[inline]
    pub(crate) fn from_index(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[must_use]
    pub fn exists(self) -> bool {
        self.0 != 0
    }
}

/// A loaded source file: its path and immutable source text.
///
/// Once loaded, a file's bytes never change for the lifetime of the
/// compilation (§5, "Resource discipline"); `Loc`s slice into `source` by byte
/// offset and stay valid for as long as the owning `GlobalState` does.
#[derive(Debug, Clone)]
pub struct File {
    path: String,
    source: String,
    /// Byte offsets of every `\n` in `source`, built once at load time so
    /// repeated `offset_to_pos` calls (e.g. for every diagnostic) don't rescan
    /// the whole file.
    newlines: Vec<u32>,
}

impl File {
    pub(crate) fn new(path: String, source: String) -> Self {
        let newlines = source
            .bytes()
            .enumerate()
            .filter_map(|(i, b)| (b == b'\n').then_some(i as u32))
            .collect();
        Self { path, source, newlines }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Translates a byte offset into a 1-based line and 0-based column.
    ///
    /// Per §4.3: counts `'\n'` bytes strictly before `off` to get the line,
    /// and measures the distance back to the previous newline (or to the
    /// start of the file) to get the column. `off` must be `<= source.len()`.
    #[must_use]
    pub fn offset_to_pos(&self, off: u32) -> (u32, u32) {
        debug_assert!((off as usize) <= self.source.len(), "offset past end of source");
        match self.newlines.binary_search(&off) {
            Ok(idx) | Err(idx) => {
                let line = 1 + idx as u32;
                let prev_newline = if idx == 0 { None } else { Some(self.newlines[idx - 1]) };
                let col = match prev_newline {
                    Some(nl) => off - nl - 1,
                    None => off,
                };
                (line, col)
            }
        }
    }
}

/// A byte-offset range within one file. `Loc::none()` is the canonical
/// "no location" value; a `begin == end` loc is a valid zero-length caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Loc {
    pub file: FileRef,
    pub begin: u32,
    pub end: u32,
}

impl Loc {
    #[must_use]
    pub fn new(file: FileRef, begin: u32, end: u32) -> Self {
        debug_assert!(begin <= end, "Loc begin must not exceed end");
        Self { file, begin, end }
    }

    #[must_use]
    pub fn none() -> Self {
        Self {
            file: FileRef::NONE,
            begin: u32::MAX,
            end: u32::MAX,
        }
    }

    #[must_use]
    pub fn is_none(self) -> bool {
        self.begin == u32::MAX && self.end == u32::MAX
    }

    /// A zero-length caret at `pos`.
    #[must_use]
    pub fn caret(file: FileRef, pos: u32) -> Self {
        Self::new(file, pos, pos)
    }

    /// The smallest loc spanning both `self` and `other`. Panics (debug) if
    /// either side is `none()` or they point into different files — callers
    /// only join locs known to share a file (e.g. joining a rescue's body and
    /// ensure clause locs).
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        debug_assert_eq!(self.file, other.file, "joining locs from different files");
        Self::new(self.file, self.begin.min(other.begin), self.end.max(other.end))
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "<no loc>")
        } else {
            write!(f, "{}:{}-{}", self.file.index(), self.begin, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> File {
        File::new("sample.rb".to_owned(), "ab\ncd\nef".to_owned())
    }

    #[test]
    fn offset_to_pos_first_line() {
        let f = sample_file();
        assert_eq!(f.offset_to_pos(0), (1, 0));
        assert_eq!(f.offset_to_pos(1), (1, 1));
    }

    #[test]
    fn offset_to_pos_after_newline() {
        let f = sample_file();
        // "ab\ncd\nef"
        //  0123456 7
        assert_eq!(f.offset_to_pos(3), (2, 0));
        assert_eq!(f.offset_to_pos(4), (2, 1));
        assert_eq!(f.offset_to_pos(6), (3, 0));
    }

    #[test]
    fn loc_none_round_trips() {
        let none = Loc::none();
        assert!(none.is_none());
        assert!(!Loc::caret(FileRef::from_index(1), 0).is_none());
    }

    #[test]
    fn loc_join_widens_range() {
        let file = FileRef::from_index(1);
        let a = Loc::new(file, 10, 20);
        let b = Loc::new(file, 5, 15);
        let joined = a.join(b);
        assert_eq!(joined, Loc::new(file, 5, 20));
    }

    #[test]
    fn loc_join_with_none_returns_other_side() {
        let file = FileRef::from_index(1);
        let a = Loc::new(file, 10, 20);
        assert_eq!(a.join(Loc::none()), a);
        assert_eq!(Loc::none().join(a), a);
    }
}
