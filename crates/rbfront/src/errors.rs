//! Error taxonomy and diagnostic transport: §7 plus the ambient error-handling
//! surface from SPEC_FULL.md §11.1.
//!
//! Follows the teacher's non-choice: no `thiserror`, no `anyhow`. Each
//! diagnostic kind is a plain enum variant with a manual `Display`, exactly
//! like `parse.rs::ParseError` does for syntax errors. Internal invariant
//! violations are not part of this enum at all — they panic via
//! [`internal_error`], since §7 says plainly that they're fatal bugs in the
//! frontend, not something a caller recovers from.

use std::fmt;

use crate::loc::Loc;

/// The §7 diagnostic taxonomy the desugar translator emits. Every variant
/// carries the `Loc` of the offending source so an external reporter can
/// resolve it to `file:line:col` (§6.4) — formatting and transport are not
/// this crate's concern.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Parser produced a node variant the translator has not been taught.
    UnsupportedNode { node_kind: String },
    /// `class << non-self`.
    InvalidSingletonDef,
    /// `C = ...` inside a method body.
    NoConstantReassignment,
    /// The same literal key appeared twice in one hash literal.
    DuplicatedHashKeys { key: String, first_loc: Loc },
    /// An integer literal didn't fit a 64-bit integer.
    IntegerOutOfRange { text: String },
    /// A float literal didn't fit a 64-bit double.
    FloatOutOfRange { text: String },
    /// A destructuring parameter nested a second `*rest`.
    UnsupportedRestArgsDestructure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedNode { node_kind } => write!(f, "unsupported parse node: {node_kind}"),
            Self::InvalidSingletonDef => write!(f, "`class << expr` is only valid with `self` as the receiver"),
            Self::NoConstantReassignment => write!(f, "dynamic constant assignment inside a method body"),
            Self::DuplicatedHashKeys { key, first_loc } => {
                write!(f, "duplicated hash key `{key}`, first seen at {first_loc}")
            }
            Self::IntegerOutOfRange { text } => write!(f, "integer literal `{text}` out of range"),
            Self::FloatOutOfRange { text } => write!(f, "float literal `{text}` out of range"),
            Self::UnsupportedRestArgsDestructure => write!(f, "nested rest argument in destructuring parameter"),
        }
    }
}

impl std::error::Error for ErrorKind {}

/// One reported diagnostic: a location, a kind, the rendered message, and
/// any secondary explanatory lines (§6.4).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub loc: Loc,
    pub kind: ErrorKind,
    pub message: String,
    pub secondary_lines: Vec<String>,
}

/// The desugarer reports through a sink it does not own (§6.4); the sink may
/// defer, batch, or discard. This is the same shape as the teacher's
/// `VmTracer` hook trait — a zero-cost seam the desugarer is generic over —
/// applied to diagnostics instead of VM events.
pub trait DiagnosticSink {
    fn report(&mut self, loc: Loc, kind: ErrorKind, message: String, secondary_lines: Vec<String>);
}

/// Discards every diagnostic. The default for callers that don't care
/// (mirrors `NoopTracer`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn report(&mut self, _loc: Loc, _kind: ErrorKind, _message: String, _secondary_lines: Vec<String>) {}
}

/// Collects every diagnostic into a `Vec`, in report order. Used by tests and
/// by drivers that want to print everything at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, loc: Loc, kind: ErrorKind, message: String, secondary_lines: Vec<String>) {
        self.diagnostics.push(Diagnostic { loc, kind, message, secondary_lines });
    }
}

/// Panics with a message identifying an internal invariant violation (a bug
/// in this frontend, never a user source error). Mirrors `Error::check` /
/// `Error::raise` from the original implementation's `common/Error.h`: these
/// are not `Result`s because there is no recovery a caller could perform.
#[track_caller]
pub fn internal_error(message: impl Into<String>) -> ! {
    panic!("rbfront internal error: {}", message.into());
}
