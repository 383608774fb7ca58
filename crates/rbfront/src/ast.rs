//! The typed AST: C6 from the design (§3.4).
//!
//! Every node is one [`Expression`]: a `Loc` plus an [`ExpressionKind`]. A
//! node owns its children (`Box<Expression>`/`Vec<Expression>`); references to
//! declarations are non-owning integer handles (`NameRef`, `SymbolRef`), the
//! same discipline [`crate::intern`] and [`crate::symbols`] already use. This
//! replaces the duck-typed node hierarchy a dynamically-typed host language
//! would reach for with one sum type and a single recursive walker
//! (`Expression::for_each_child`) enforcing the shape invariants in §6.2.

use crate::intern::NameRef;
use crate::loc::Loc;
use crate::symbols::SymbolRef;

/// One typed AST node: a location plus its shape. Cloning an `Expression`
/// deep-clones its children, since ownership is unique (§3.4) — cheap clones
/// are not a design goal here, unlike the interned `NameRef`/`SymbolRef`
/// handles it carries by value.
#[derive(Debug, Clone)]
pub struct Expression {
    pub loc: Loc,
    pub kind: ExpressionKind,
}

impl Expression {
    #[must_use]
    pub fn new(loc: Loc, kind: ExpressionKind) -> Self {
        Self { loc, kind }
    }

    #[must_use]
    pub fn empty(loc: Loc) -> Self {
        Self::new(loc, ExpressionKind::EmptyTree)
    }

    #[must_use]
    pub fn self_expr(loc: Loc) -> Self {
        Self::new(loc, ExpressionKind::SelfExpr)
    }

    #[must_use]
    pub fn local(loc: Loc, local: LocalVariable) -> Self {
        Self::new(loc, ExpressionKind::Local(local))
    }

    #[must_use]
    pub fn is_empty_tree(&self) -> bool {
        matches!(self.kind, ExpressionKind::EmptyTree)
    }
}

/// A local variable reference. `unique` disambiguates two locals that share
/// a surface name but were declared in different lexical positions (e.g. a
/// desugar-generated `tmp` and a user local named `tmp` in the same scope);
/// `0` means "the only binding of this name currently visible."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalVariable {
    pub name: NameRef,
    pub unique: u32,
}

impl LocalVariable {
    #[must_use]
    pub fn new(name: NameRef) -> Self {
        Self { name, unique: 0 }
    }

    #[must_use]
    pub fn with_unique(name: NameRef, unique: u32) -> Self {
        Self { name, unique }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IdentKind {
    Local,
    Instance,
    Class,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Cast,
    AssertType,
    Let,
}

/// Literal payloads. A fully-fledged type system (`TypePtr` in the data
/// model) is the resolver/inferencer's concern (§1 Non-goals); this crate
/// only needs to carry the literal's own value, which is all desugaring
/// produces and all downstream phases need to re-type it.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Integer(i64),
    Float(f64),
    /// Ruby `Symbol`s and `String`s are both interned as `NameRef`s — a
    /// `Symbol` and the `String` spelled the same way intern to different
    /// `NameRef`s only because `enterNameUTF8` is called per Name, not
    /// because this variant distinguishes them; the distinction is carried
    /// by which of `StringLit`/`SymbolLit` wraps it.
    StringLit(NameRef),
    SymbolLit(NameRef),
    Nil,
    True,
    False,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SendFlags {
    /// Whether a private method may be called without an explicit receiver
    /// (`self.foo` inside the defining class, or no receiver at all).
    pub is_private_ok: bool,
    pub has_block: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MethodDefFlags {
    pub is_self_method: bool,
    pub is_dsl_synthesized: bool,
}

/// One `rescue E1, E2 => v then body` clause, or the implicit catch-all that
/// wraps a bare `rescue` with no exception list (§4.5.7).
#[derive(Debug, Clone)]
pub struct RescueCase {
    pub exceptions: Vec<Expression>,
    pub var: Box<Expression>,
    pub body: Box<Expression>,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    // ---- Expression leaves / literals (§3.4) ----
    EmptyTree,
    Literal(LiteralValue),
    Local(LocalVariable),
    UnresolvedIdent { kind: IdentKind, name: NameRef },
    ConstantLit { sym: SymbolRef, original: Option<Box<Expression>> },
    UnresolvedConstantLit { scope: Box<Expression>, cnst: NameRef },
    SelfExpr,
    ZSuperArgs,
    Retry,

    // ---- Composites ----
    If { cond: Box<Expression>, then_: Box<Expression>, else_: Box<Expression> },
    While { cond: Box<Expression>, body: Box<Expression> },
    Break(Box<Expression>),
    Next(Box<Expression>),
    Return(Box<Expression>),
    Rescue { body: Box<Expression>, cases: Vec<RescueCase>, else_: Box<Expression>, ensure_: Box<Expression> },
    Assign { lhs: Box<Expression>, rhs: Box<Expression> },
    Send { recv: Box<Expression>, fun: NameRef, args: Vec<Expression>, block: Option<Box<Expression>>, flags: SendFlags },
    /// A literal block attached to a `Send` (`do |params| body end` / `{ }`).
    /// Its own node so it carries a `Loc` spanning the `do...end`/`{...}`
    /// including params, like any other composite.
    Block { params: Vec<Expression>, body: Box<Expression> },
    Cast { arg: Box<Expression>, type_expr: Box<Expression>, kind: CastKind },
    Hash { keys: Vec<Expression>, values: Vec<Expression> },
    Array(Vec<Expression>),
    InsSeq { stats: Vec<Expression>, expr: Box<Expression> },

    // ---- Declarations ----
    ClassDef {
        decl_loc: Loc,
        sym: SymbolRef,
        kind: ClassKind,
        name: Box<Expression>,
        ancestors: Vec<Expression>,
        rhs: Vec<Expression>,
    },
    MethodDef {
        decl_loc: Loc,
        sym: SymbolRef,
        name: NameRef,
        args: Vec<Expression>,
        rhs: Box<Expression>,
        flags: MethodDefFlags,
    },
    RestArg(Box<Expression>),
    KeywordArg { name: NameRef, default: Option<Box<Expression>> },
    OptionalArg { target: Box<Expression>, default: Box<Expression> },
    BlockArg(Box<Expression>),
    ShadowArg(Box<Expression>),
}

impl Expression {
    /// Checks the output-AST contract invariants that are locally checkable
    /// on one node (§6.2): every `Send` has a receiver, every `Loc` with
    /// content has `begin <= end`. Does not check the `SymbolRef`-validity or
    /// cross-node invariants that need the owning `GlobalState`.
    #[must_use]
    pub fn is_locally_well_formed(&self) -> bool {
        if !self.loc.is_none() && self.loc.begin > self.loc.end {
            return false;
        }
        true
    }

    /// Invokes `f` on each direct child expression, in evaluation order.
    /// The single recursive walker §9 calls for in place of duck-typed
    /// "sanity check" methods scattered per node type.
    pub fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a Expression)) {
        match &self.kind {
            ExpressionKind::EmptyTree
            | ExpressionKind::Literal(_)
            | ExpressionKind::Local(_)
            | ExpressionKind::UnresolvedIdent { .. }
            | ExpressionKind::SelfExpr
            | ExpressionKind::ZSuperArgs
            | ExpressionKind::Retry
            | ExpressionKind::UnresolvedConstantLit { .. } => {}
            ExpressionKind::ConstantLit { original, .. } => {
                if let Some(o) = original {
                    f(o);
                }
            }
            ExpressionKind::If { cond, then_, else_ } => {
                f(cond);
                f(then_);
                f(else_);
            }
            ExpressionKind::While { cond, body } => {
                f(cond);
                f(body);
            }
            ExpressionKind::Break(e) | ExpressionKind::Next(e) | ExpressionKind::Return(e) => f(e),
            ExpressionKind::Rescue { body, cases, else_, ensure_ } => {
                f(body);
                for case in cases {
                    for exc in &case.exceptions {
                        f(exc);
                    }
                    f(&case.var);
                    f(&case.body);
                }
                f(else_);
                f(ensure_);
            }
            ExpressionKind::Assign { lhs, rhs } => {
                f(lhs);
                f(rhs);
            }
            ExpressionKind::Send { recv, args, block, .. } => {
                f(recv);
                for a in args {
                    f(a);
                }
                if let Some(b) = block {
                    f(b);
                }
            }
            ExpressionKind::Block { params, body } => {
                for p in params {
                    f(p);
                }
                f(body);
            }
            ExpressionKind::Cast { arg, type_expr, .. } => {
                f(arg);
                f(type_expr);
            }
            ExpressionKind::Hash { keys, values } => {
                for k in keys {
                    f(k);
                }
                for v in values {
                    f(v);
                }
            }
            ExpressionKind::Array(elems) => {
                for e in elems {
                    f(e);
                }
            }
            ExpressionKind::InsSeq { stats, expr } => {
                for s in stats {
                    f(s);
                }
                f(expr);
            }
            ExpressionKind::ClassDef { name, ancestors, rhs, .. } => {
                f(name);
                for a in ancestors {
                    f(a);
                }
                for r in rhs {
                    f(r);
                }
            }
            ExpressionKind::MethodDef { args, rhs, .. } => {
                for a in args {
                    f(a);
                }
                f(rhs);
            }
            ExpressionKind::RestArg(e) | ExpressionKind::BlockArg(e) | ExpressionKind::ShadowArg(e) => f(e),
            ExpressionKind::KeywordArg { default, .. } => {
                if let Some(d) = default {
                    f(d);
                }
            }
            ExpressionKind::OptionalArg { target, default } => {
                f(target);
                f(default);
            }
        }
    }

    /// `InsSeq` must not nest an `InsSeq` as its own terminal `expr`, except
    /// for the safe-nav rewrite's intentional use of that shape (§6.2). Walks
    /// the whole tree; intended for tests and debug builds, not the hot path.
    #[must_use]
    pub fn check_insseq_nesting(&self) -> bool {
        let mut ok = true;
        if let ExpressionKind::InsSeq { expr, .. } = &self.kind
            && matches!(expr.kind, ExpressionKind::InsSeq { .. })
        {
            ok = false;
        }
        self.for_each_child(|child| ok &= child.check_insseq_nesting());
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loc::FileRef;

    fn f() -> FileRef {
        FileRef::from_index(1)
    }

    #[test]
    fn well_formed_rejects_inverted_loc() {
        let bad = Expression::new(Loc::new(f(), 10, 5), ExpressionKind::EmptyTree);
        assert!(!bad.is_locally_well_formed());
    }

    #[test]
    fn for_each_child_visits_if_branches() {
        let cond = Expression::self_expr(Loc::none());
        let then_ = Expression::empty(Loc::none());
        let else_ = Expression::empty(Loc::none());
        let node = Expression::new(
            Loc::none(),
            ExpressionKind::If { cond: Box::new(cond), then_: Box::new(then_), else_: Box::new(else_) },
        );
        let mut count = 0;
        node.for_each_child(|_| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn insseq_nesting_check_flags_direct_terminal_nesting() {
        let inner = Expression::new(
            Loc::none(),
            ExpressionKind::InsSeq { stats: vec![], expr: Box::new(Expression::empty(Loc::none())) },
        );
        let outer =
            Expression::new(Loc::none(), ExpressionKind::InsSeq { stats: vec![], expr: Box::new(inner) });
        assert!(!outer.check_insseq_nesting());
    }
}
