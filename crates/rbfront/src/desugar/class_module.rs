//! Class/module definitions and constant assignment (§4.5.9).
//!
//! A `ClassDef`/`MethodDef` node carries a `SymbolRef`, so lowering one also
//! registers it in the symbol table under [`Desugarer::current_owner`] (§4.2)
//! — the one piece of desugaring that mutates more than the AST it returns.
//! Nested bodies translate with `current_owner` swapped to the new symbol
//! and restored afterward, mirroring a plain save/restore scope stack.

use super::*;
use crate::ast::MethodDefFlags;
use crate::errors::ErrorKind;
use crate::symbols::SymbolKind;

pub(super) fn lower_const_assign<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, lhs: &ParseNode, rhs_e: Expression) -> Expression {
    let in_method = d.gs.symbols().get(d.current_owner).kind() == Some(SymbolKind::Method);
    if in_method {
        d.report(loc, ErrorKind::NoConstantReassignment, "dynamic constant assignment inside a method body");
        let n = d.intern("<dynamicConstAssign>");
        let lhs_e = d.local_expr(loc, LocalVariable::new(n));
        return d.assign(loc, lhs_e, rhs_e);
    }
    let lhs_e = d.translate(lhs);
    d.assign(loc, lhs_e, rhs_e)
}

fn simple_const_name(name: &ParseNode) -> &str {
    match &name.kind {
        ParseKind::ConstRef { name, .. } => name,
        _ => crate::errors::internal_error("class/module name must be a constant reference"),
    }
}

fn with_owner<S: DiagnosticSink, T>(d: &mut Desugarer<S>, owner: SymbolRef, f: impl FnOnce(&mut Desugarer<S>) -> T) -> T {
    let saved = d.current_owner;
    d.current_owner = owner;
    let result = f(d);
    d.current_owner = saved;
    result
}

fn translate_body<S: DiagnosticSink>(d: &mut Desugarer<S>, sym: SymbolRef, body: &[ParseNode]) -> Vec<Expression> {
    with_owner(d, sym, |d| body.iter().map(|n| d.translate(n)).collect())
}

pub(super) fn lower_class_def<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    name: &ParseNode,
    superclass: Option<&ParseNode>,
    body: &[ParseNode],
) -> Expression {
    let cname = simple_const_name(name);
    let n = d.intern(cname);
    let sym = d.gs.symbols_mut().get_top_level_class_symbol(d.current_owner, n);
    let name_e = Expression::new(d.loc(name.range), ExpressionKind::ConstantLit { sym, original: None });

    let ancestor = match superclass {
        Some(s) => d.translate(s),
        None => Expression::new(loc, ExpressionKind::ConstantLit { sym: d.gs.todo, original: None }),
    };

    let rhs = translate_body(d, sym, body);

    Expression::new(
        loc,
        ExpressionKind::ClassDef { decl_loc: loc, sym, kind: ClassKind::Class, name: Box::new(name_e), ancestors: vec![ancestor], rhs },
    )
}

pub(super) fn lower_module_def<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, name: &ParseNode, body: &[ParseNode]) -> Expression {
    let cname = simple_const_name(name);
    let n = d.intern(cname);
    let sym = d.gs.symbols_mut().get_top_level_class_symbol(d.current_owner, n);
    let name_e = Expression::new(d.loc(name.range), ExpressionKind::ConstantLit { sym, original: None });

    let rhs = translate_body(d, sym, body);

    Expression::new(
        loc,
        ExpressionKind::ClassDef { decl_loc: loc, sym, kind: ClassKind::Module, name: Box::new(name_e), ancestors: Vec::new(), rhs },
    )
}

pub(super) fn lower_singleton_class_def<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, receiver: &ParseNode, body: &[ParseNode]) -> Expression {
    if !matches!(receiver.kind, ParseKind::SelfNode) {
        d.report(loc, ErrorKind::InvalidSingletonDef, "`class << expr` is only valid with `self` as the receiver");
        return Expression::empty(loc);
    }

    let n = d.intern("<singleton>");
    let sym = d.gs.symbols_mut().get_top_level_class_symbol(d.current_owner, n);
    let name_e = Expression::new(loc, ExpressionKind::ConstantLit { sym, original: None });

    let rhs = translate_body(d, sym, body);

    Expression::new(loc, ExpressionKind::ClassDef { decl_loc: loc, sym, kind: ClassKind::Class, name: Box::new(name_e), ancestors: Vec::new(), rhs })
}

pub(super) fn lower_method_def<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    name: &str,
    params: &[BlockParam],
    body: &ParseNode,
    is_self_method: bool,
) -> Expression {
    let fun_name = d.intern(name);
    let sym = match d.gs.symbols_mut().enter_symbol(d.current_owner, fun_name, SymbolKind::Method) {
        Ok(s) => s,
        Err(_) => d
            .gs
            .symbols()
            .find_member(d.current_owner, fun_name)
            .unwrap_or_else(|| crate::errors::internal_error("enter_symbol conflict must still have a member entry")),
    };
    d.gs.symbols_mut().get_mut(sym).set_self_method(is_self_method);

    let args = params.iter().map(|p| lower_method_param(d, loc, p)).collect();
    let rhs = with_owner(d, sym, |d| d.translate(body));

    Expression::new(
        loc,
        ExpressionKind::MethodDef {
            decl_loc: loc,
            sym,
            name: fun_name,
            args,
            rhs: Box::new(rhs),
            flags: MethodDefFlags { is_self_method, is_dsl_synthesized: false },
        },
    )
}

fn lower_method_param<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, param: &BlockParam) -> Expression {
    match param {
        BlockParam::Required(name) => {
            let n = d.intern(name);
            d.local_expr(loc, LocalVariable::new(n))
        }
        BlockParam::Optional(name, default) => {
            let n = d.intern(name);
            let target = Box::new(d.local_expr(loc, LocalVariable::new(n)));
            let default_e = Box::new(d.translate(default));
            Expression::new(loc, ExpressionKind::OptionalArg { target, default: default_e })
        }
        BlockParam::Rest(name) => {
            let n = d.intern(name.as_deref().unwrap_or("*"));
            let local = Box::new(d.local_expr(loc, LocalVariable::new(n)));
            Expression::new(loc, ExpressionKind::RestArg(local))
        }
        BlockParam::Keyword { name, default } => {
            let n = d.intern(name);
            let default_e = default.as_ref().map(|e| Box::new(d.translate(e)));
            Expression::new(loc, ExpressionKind::KeywordArg { name: n, default: default_e })
        }
        BlockParam::Block(name) => {
            let n = d.intern(name.as_deref().unwrap_or("&"));
            let local = Box::new(d.local_expr(loc, LocalVariable::new(n)));
            Expression::new(loc, ExpressionKind::BlockArg(local))
        }
        BlockParam::Shadow(name) => {
            let n = d.intern(name);
            let local = Box::new(d.local_expr(loc, LocalVariable::new(n)));
            Expression::new(loc, ExpressionKind::ShadowArg(local))
        }
        BlockParam::Destructure(_) | BlockParam::Numbered | BlockParam::It => {
            crate::errors::internal_error("method signatures cannot carry block-only param shapes")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CollectingSink, NoopSink};
    use crate::global_state::GlobalState;
    use crate::loc::FileRef;

    fn file() -> FileRef {
        FileRef::from_index(1)
    }

    fn range() -> ByteRange {
        ByteRange::new(0, 1)
    }

    fn const_ref(name: &str) -> ParseNode {
        ParseNode::new(range(), ParseKind::ConstRef { scope: None, name: name.to_owned(), top_level: false })
    }

    #[test]
    fn class_def_registers_symbol_and_uses_todo_for_missing_superclass() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let e = lower_class_def(&mut d, Loc::new(file(), 0, 1), &const_ref("Foo"), None, &[]);
        match e.kind {
            ExpressionKind::ClassDef { kind, ancestors, sym, .. } => {
                assert!(matches!(kind, ClassKind::Class));
                assert_eq!(ancestors.len(), 1);
                assert!(sym.exists());
            }
            other => panic!("expected ClassDef, got {other:?}"),
        }
    }

    #[test]
    fn module_def_has_no_ancestors() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let e = lower_module_def(&mut d, Loc::new(file(), 0, 1), &const_ref("M"), &[]);
        match e.kind {
            ExpressionKind::ClassDef { kind, ancestors, .. } => {
                assert!(matches!(kind, ClassKind::Module));
                assert!(ancestors.is_empty());
            }
            other => panic!("expected ClassDef, got {other:?}"),
        }
    }

    #[test]
    fn singleton_class_on_non_self_reports_diagnostic() {
        let mut gs = GlobalState::new();
        let mut sink = CollectingSink::new();
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let receiver = ParseNode::new(range(), ParseKind::Ident { kind: IdentKind::Local, name: "x".to_owned() });
        let e = lower_singleton_class_def(&mut d, Loc::new(file(), 0, 1), &receiver, &[]);
        assert!(e.is_empty_tree());
        assert_eq!(sink.diagnostics().len(), 1);
        assert!(matches!(sink.diagnostics()[0].kind, ErrorKind::InvalidSingletonDef));
    }

    #[test]
    fn const_assign_inside_method_body_is_redirected_to_synthetic_local() {
        let mut gs = GlobalState::new();
        let mut sink = CollectingSink::new();
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let fun_name = d.intern("foo");
        let sym = d.gs.symbols_mut().enter_symbol(d.current_owner, fun_name, SymbolKind::Method).unwrap();
        let e = with_owner(&mut d, sym, |d| {
            let rhs = d.translate(&ParseNode::new(range(), ParseKind::NilLit));
            lower_const_assign(d, Loc::new(file(), 0, 1), &const_ref("X"), rhs)
        });
        match e.kind {
            ExpressionKind::Assign { lhs, .. } => assert!(matches!(lhs.kind, ExpressionKind::Local(_))),
            other => panic!("expected Assign, got {other:?}"),
        }
        assert_eq!(sink.diagnostics().len(), 1);
        assert!(matches!(sink.diagnostics()[0].kind, ErrorKind::NoConstantReassignment));
    }
}
