//! The translator's input type (§6.1).
//!
//! `spec.md` describes the parse tree only by contract ("a tagged tree whose
//! node kinds are enumerated by the external parser... each parse node
//! provides a byte-offset range, a tag, and kind-specific children"). Rather
//! than bind to one specific third-party Ruby-parser crate's node type (which
//! would make this crate's compilability hostage to an API this exercise has
//! no way to verify), `rbfront` defines its own plain parse-tree enum here —
//! the same two-stage shape the original frontend uses (an external parser's
//! tree feeds a translator that owns its *own* node enum), just with the
//! external half modeled as this crate's input contract instead of a
//! dependency.

use crate::ast::IdentKind;

/// A node's byte-offset span, before it has been attached to a `FileRef`
/// (the desugarer knows which file it's processing and stamps that on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ByteRange {
    pub begin: u32,
    pub end: u32,
}

impl ByteRange {
    #[must_use]
    pub fn new(begin: u32, end: u32) -> Self {
        Self { begin, end }
    }
}

/// The external parser's tree, fed in whole (§6.1) — usually deserialized
/// from JSON by a driver, since parsing Ruby source is out of scope here.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ParseNode {
    pub range: ByteRange,
    pub kind: ParseKind,
}

impl ParseNode {
    #[must_use]
    pub fn new(range: ByteRange, kind: ParseKind) -> Self {
        Self { range, kind }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum StringPart {
    Lit(String),
    Interp(Box<ParseNode>),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Arg {
    Plain(ParseNode),
    Splat(ParseNode),
    /// Anonymous `*` forwarding a positional splat parameter by that name.
    AnonSplat,
    /// Anonymous `&` forwarding a block parameter by that name.
    AnonBlockPass,
    /// `...` forwarding all positional, keyword, and block arguments.
    ForwardAll,
    Kwarg { name: String, value: ParseNode },
    KwSplat(ParseNode),
    /// `&expr` block pass; `&:sym` is represented as `Block(Some(Symbol))`
    /// here rather than as a special arg — the parser reports it as a block
    /// pass whose expression happens to be a symbol literal, which is what
    /// lets `is_symbol_literal` distinguish it from `&some_proc`.
    BlockPass(ParseNode),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum BlockParam {
    Required(String),
    Optional(String, ParseNode),
    /// `*rest`; `None` for the anonymous `*`.
    Rest(Option<String>),
    Keyword { name: String, default: Option<ParseNode> },
    /// `&blk`; `None` for the anonymous `&`.
    Block(Option<String>),
    Destructure(Vec<BlockParam>),
    Shadow(String),
    /// `_1`..`_9` implicit numbered params; the desugarer determines `1..=N`
    /// by scanning the body (§4.5.5), so the parser need only say "numbered
    /// params are in play."
    Numbered,
    /// The implicit `it` parameter.
    It,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockNode {
    pub params: Vec<BlockParam>,
    pub body: Box<ParseNode>,
    pub range: ByteRange,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum HashEntry {
    Pair { key: ParseNode, value: ParseNode },
    Splat(ParseNode),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum MlhsItem {
    Plain(ParseNode),
    /// `*b` in `a, *b, c = ...`; `None` for a bare anonymous `*`.
    Splat(Option<ParseNode>),
    Nested(Vec<MlhsItem>),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum RescueVarTarget {
    Local(String),
    Instance(String),
    Class(String),
    Global(String),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RescueClauseParse {
    pub exceptions: Vec<ParseNode>,
    pub var: Option<RescueVarTarget>,
    pub body: ParseNode,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WhenClause {
    pub patterns: Vec<Arg>,
    pub body: ParseNode,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum PatternNode {
    Bind(String),
    Literal(Box<ParseNode>),
    Array { elements: Vec<PatternNode>, rest_index: Option<usize> },
    Hash(Vec<(String, Option<PatternNode>)>),
    Pin(String),
    Alt(Box<PatternNode>, Box<PatternNode>),
    TypeBind { type_expr: Box<ParseNode>, binding: Option<String> },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InClause {
    pub pattern: PatternNode,
    pub guard: Option<Box<ParseNode>>,
    pub body: ParseNode,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ParseKind {
    IntLit(String),
    FloatLit(String),
    StringLit(Vec<StringPart>),
    SymbolLit(String),
    SymbolInterp(Vec<StringPart>),
    Regexp { parts: Vec<StringPart>, flags: String },
    NilLit,
    TrueLit,
    FalseLit,
    SelfNode,
    Retry,
    ZSuperArgs,

    Ident { kind: IdentKind, name: String },
    ConstRef { scope: Option<Box<ParseNode>>, name: String, top_level: bool },

    Assign { lhs: Box<ParseNode>, rhs: Box<ParseNode> },
    MultiAssign { items: Vec<MlhsItem>, rhs: Box<ParseNode> },
    OpAssign { lhs: Box<ParseNode>, op: String, rhs: Box<ParseNode> },

    Send {
        recv: Option<Box<ParseNode>>,
        name: String,
        args: Vec<Arg>,
        block: Option<BlockNode>,
        safe_nav: bool,
    },

    HashLit(Vec<HashEntry>),
    ArrayLit(Vec<Arg>),

    If { cond: Box<ParseNode>, then_: Box<ParseNode>, else_: Option<Box<ParseNode>> },
    While { cond: Box<ParseNode>, body: Box<ParseNode>, until: bool },
    Break(Option<Box<ParseNode>>),
    Next(Option<Box<ParseNode>>),
    Return(Option<Box<ParseNode>>),

    CaseWhen { subject: Option<Box<ParseNode>>, whens: Vec<WhenClause>, else_: Option<Box<ParseNode>> },
    CaseIn { subject: Box<ParseNode>, clauses: Vec<InClause>, else_: Option<Box<ParseNode>> },

    BeginRescue {
        body: Box<ParseNode>,
        rescues: Vec<RescueClauseParse>,
        else_: Option<Box<ParseNode>>,
        ensure_: Option<Box<ParseNode>>,
    },

    ClassDef { name: Box<ParseNode>, superclass: Option<Box<ParseNode>>, body: Vec<ParseNode> },
    ModuleDef { name: Box<ParseNode>, body: Vec<ParseNode> },
    SingletonClassDef { receiver: Box<ParseNode>, body: Vec<ParseNode> },
    MethodDef { name: String, params: Vec<BlockParam>, body: Box<ParseNode>, is_self_method: bool },

    Defined(Box<ParseNode>),
    CurrentFile,
    CurrentLine,
    CurrentEncoding,

    /// A bare statement sequence (method/`begin` body, top-level program).
    Block(Vec<ParseNode>),

    /// A node kind the desugarer has not been taught (§6.1); carries the
    /// parser's own tag name for the `UnsupportedNode` diagnostic.
    Unknown(String),
}

impl ParseNode {
    /// Visits every direct child node, in evaluation order. Used by the
    /// numbered-block-param scan (§4.5.5), which needs to walk a body before
    /// it has been translated to know how many `_1`..`_9` params to
    /// synthesize.
    pub fn for_each_child<'a>(&'a self, f: &mut impl FnMut(&'a ParseNode)) {
        fn arg<'a>(a: &'a Arg, f: &mut impl FnMut(&'a ParseNode)) {
            match a {
                Arg::Plain(n) | Arg::Splat(n) | Arg::KwSplat(n) | Arg::BlockPass(n) => f(n),
                Arg::Kwarg { value, .. } => f(value),
                Arg::AnonSplat | Arg::AnonBlockPass | Arg::ForwardAll => {}
            }
        }
        match &self.kind {
            ParseKind::IntLit(_)
            | ParseKind::FloatLit(_)
            | ParseKind::SymbolLit(_)
            | ParseKind::NilLit
            | ParseKind::TrueLit
            | ParseKind::FalseLit
            | ParseKind::SelfNode
            | ParseKind::Retry
            | ParseKind::ZSuperArgs
            | ParseKind::Ident { .. }
            | ParseKind::CurrentFile
            | ParseKind::CurrentLine
            | ParseKind::CurrentEncoding
            | ParseKind::Unknown(_) => {}
            ParseKind::StringLit(parts) | ParseKind::SymbolInterp(parts) | ParseKind::Regexp { parts, .. } => {
                for p in parts {
                    if let StringPart::Interp(n) = p {
                        f(n);
                    }
                }
            }
            ParseKind::ConstRef { scope, .. } => {
                if let Some(s) = scope {
                    f(s);
                }
            }
            ParseKind::Assign { lhs, rhs } => {
                f(lhs);
                f(rhs);
            }
            ParseKind::MultiAssign { items, rhs } => {
                fn mlhs<'a>(item: &'a MlhsItem, f: &mut impl FnMut(&'a ParseNode)) {
                    match item {
                        MlhsItem::Plain(n) => f(n),
                        MlhsItem::Splat(Some(n)) => f(n),
                        MlhsItem::Splat(None) => {}
                        MlhsItem::Nested(items) => {
                            for i in items {
                                mlhs(i, f);
                            }
                        }
                    }
                }
                for item in items {
                    mlhs(item, f);
                }
                f(rhs);
            }
            ParseKind::OpAssign { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            ParseKind::Send { recv, args, block, .. } => {
                if let Some(r) = recv {
                    f(r);
                }
                for a in args {
                    arg(a, f);
                }
                if let Some(b) = block {
                    f(&b.body);
                }
            }
            ParseKind::HashLit(entries) => {
                for e in entries {
                    match e {
                        HashEntry::Pair { key, value } => {
                            f(key);
                            f(value);
                        }
                        HashEntry::Splat(n) => f(n),
                    }
                }
            }
            ParseKind::ArrayLit(args) => {
                for a in args {
                    arg(a, f);
                }
            }
            ParseKind::If { cond, then_, else_ } => {
                f(cond);
                f(then_);
                if let Some(e) = else_ {
                    f(e);
                }
            }
            ParseKind::While { cond, body, .. } => {
                f(cond);
                f(body);
            }
            ParseKind::Break(e) | ParseKind::Next(e) | ParseKind::Return(e) => {
                if let Some(e) = e {
                    f(e);
                }
            }
            ParseKind::CaseWhen { subject, whens, else_ } => {
                if let Some(s) = subject {
                    f(s);
                }
                for w in whens {
                    for p in &w.patterns {
                        arg(p, f);
                    }
                    f(&w.body);
                }
                if let Some(e) = else_ {
                    f(e);
                }
            }
            ParseKind::CaseIn { subject, clauses, else_ } => {
                f(subject);
                for c in clauses {
                    if let Some(g) = &c.guard {
                        f(g);
                    }
                    f(&c.body);
                }
                if let Some(e) = else_ {
                    f(e);
                }
            }
            ParseKind::BeginRescue { body, rescues, else_, ensure_ } => {
                f(body);
                for r in rescues {
                    for exc in &r.exceptions {
                        f(exc);
                    }
                    f(&r.body);
                }
                if let Some(e) = else_ {
                    f(e);
                }
                if let Some(e) = ensure_ {
                    f(e);
                }
            }
            ParseKind::ClassDef { name, superclass, body } => {
                f(name);
                if let Some(s) = superclass {
                    f(s);
                }
                for n in body {
                    f(n);
                }
            }
            ParseKind::ModuleDef { name, body } => {
                f(name);
                for n in body {
                    f(n);
                }
            }
            ParseKind::SingletonClassDef { receiver, body } => {
                f(receiver);
                for n in body {
                    f(n);
                }
            }
            ParseKind::MethodDef { body, .. } => f(body),
            ParseKind::Defined(inner) => f(inner),
            ParseKind::Block(stmts) => {
                for s in stmts {
                    f(s);
                }
            }
        }
    }
}
