//! `begin`/`rescue`/`ensure` lowering (§4.5.7).
//!
//! Each clause becomes one [`RescueCase`]. A `rescue` with no `=> var` binds
//! a fresh `<rescueTemp$N>` so the case always has something to point at. A
//! non-local var target (`@x`, `$x`) can't be the thing a `RescueCase`
//! itself binds — only locals can — so it's bound to a temp and the real
//! target is assigned from that temp as the first statement of the handler
//! body instead.

use super::*;
use crate::ast::RescueCase;

pub(super) fn lower_begin_rescue<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    body: &ParseNode,
    rescues: &[RescueClauseParse],
    else_: Option<&ParseNode>,
    ensure_: Option<&ParseNode>,
) -> Expression {
    let body_e = d.translate(body);

    let cases = rescues.iter().map(|r| lower_case(d, loc, r)).collect();

    let else_e = match else_ {
        Some(e) => d.translate(e),
        None => Expression::empty(loc),
    };
    let ensure_e = match ensure_ {
        Some(e) => d.translate(e),
        None => Expression::empty(loc),
    };

    Expression::new(
        loc,
        ExpressionKind::Rescue { body: Box::new(body_e), cases, else_: Box::new(else_e), ensure_: Box::new(ensure_e) },
    )
}

fn lower_case<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, clause: &RescueClauseParse) -> RescueCase {
    let exceptions = clause.exceptions.iter().map(|n| d.translate(n)).collect();

    match &clause.var {
        None => {
            let tmp = d.fresh_local("rescueTemp");
            let var = d.local_expr(loc, tmp);
            let body = d.translate(&clause.body);
            RescueCase { exceptions, var: Box::new(var), body: Box::new(body) }
        }
        Some(RescueVarTarget::Local(name)) => {
            let n = d.intern(name);
            let var = d.local_expr(loc, LocalVariable::new(n));
            let body = d.translate(&clause.body);
            RescueCase { exceptions, var: Box::new(var), body: Box::new(body) }
        }
        Some(target) => {
            let tmp = d.fresh_local("rescueTemp");
            let var = d.local_expr(loc, tmp);
            let real_target = non_local_target(d, loc, target);
            let prepend = d.assign(loc, real_target, d.local_expr(loc, tmp));
            let body_e = d.translate(&clause.body);
            let body = Expression::new(loc, ExpressionKind::InsSeq { stats: vec![prepend], expr: Box::new(body_e) });
            RescueCase { exceptions, var: Box::new(var), body: Box::new(body) }
        }
    }
}

fn non_local_target<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, target: &RescueVarTarget) -> Expression {
    let (kind, name) = match target {
        RescueVarTarget::Instance(name) => (IdentKind::Instance, name),
        RescueVarTarget::Class(name) => (IdentKind::Class, name),
        RescueVarTarget::Global(name) => (IdentKind::Global, name),
        RescueVarTarget::Local(_) => crate::errors::internal_error("local rescue targets never reach non_local_target"),
    };
    let n = d.intern(name);
    Expression::new(loc, ExpressionKind::UnresolvedIdent { kind, name: n })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NoopSink;
    use crate::global_state::GlobalState;
    use crate::loc::FileRef;

    fn file() -> FileRef {
        FileRef::from_index(1)
    }

    fn range() -> ByteRange {
        ByteRange::new(0, 1)
    }

    fn local_node(name: &str) -> ParseNode {
        ParseNode::new(range(), ParseKind::Ident { kind: IdentKind::Local, name: name.to_owned() })
    }

    #[test]
    fn missing_var_binds_fresh_temp() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let rescues = vec![RescueClauseParse { exceptions: vec![], var: None, body: local_node("b") }];
        let e = lower_begin_rescue(&mut d, Loc::new(file(), 0, 1), &local_node("body"), &rescues, None, None);
        match e.kind {
            ExpressionKind::Rescue { cases, else_, ensure_, .. } => {
                assert_eq!(cases.len(), 1);
                assert!(matches!(cases[0].var.kind, ExpressionKind::Local(_)));
                assert!(else_.is_empty_tree());
                assert!(ensure_.is_empty_tree());
            }
            other => panic!("expected Rescue, got {other:?}"),
        }
    }

    #[test]
    fn ivar_target_prepends_assignment_in_handler_body() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let rescues = vec![RescueClauseParse { exceptions: vec![], var: Some(RescueVarTarget::Instance("e".to_owned())), body: local_node("b") }];
        let e = lower_begin_rescue(&mut d, Loc::new(file(), 0, 1), &local_node("body"), &rescues, None, None);
        match e.kind {
            ExpressionKind::Rescue { cases, .. } => match &cases[0].body.kind {
                ExpressionKind::InsSeq { stats, .. } => {
                    assert_eq!(stats.len(), 1);
                    assert!(matches!(stats[0].kind, ExpressionKind::Assign { .. }));
                }
                other => panic!("expected InsSeq body, got {other:?}"),
            },
            other => panic!("expected Rescue, got {other:?}"),
        }
    }
}
