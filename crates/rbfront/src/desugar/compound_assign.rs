//! Compound assignment lowering (§4.5.4): `x op= rhs`, `recv.m op= rhs`,
//! `recv[i] op= rhs`, `&&=`/`||=`, and dynamic constant assignment.
//!
//! A simple target (local/ivar/cvar/gvar) can just be read twice — reading a
//! bare identifier has no side effect, so there's no need to cache it in a
//! temp the way a receiver or index expression does. A `Send`-shaped target
//! (an attribute getter/setter pair, or `[]`/`[]=`) evaluates its receiver
//! and index arguments exactly once into temps before building the
//! getter/setter pair around them, mirroring the single-eval rule
//! `send.rs`'s safe-navigation rewrite already relies on.

use super::*;
use crate::ast::{CastKind, SendFlags};
use crate::errors::ErrorKind;
use crate::symbols::SymbolKind;

pub(super) fn lower_op_assign<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, lhs: &ParseNode, op: &str, rhs: &ParseNode) -> Expression {
    if matches!(lhs.kind, ParseKind::ConstRef { .. }) {
        return lower_const_op_assign(d, loc, lhs, op, rhs);
    }

    if let ParseKind::Send { recv: Some(recv), name, args, block: None, safe_nav } = &lhs.kind {
        return lower_send_target(d, loc, recv, name, args, *safe_nav, op, rhs);
    }

    lower_simple_target(d, loc, lhs, op, rhs)
}

/// `X op= rhs` outside a method body is a real constant compound-assignment:
/// read the constant, combine, and write it back exactly like a plain
/// `X = rhs` would. Ruby rejects any constant assignment written inside a
/// `def`, compound or not (`SyntaxError: dynamic constant assignment`), so
/// inside a method body both the read and the write are redirected onto the
/// synthetic `<dynamicConstAssign>` local instead, mirroring
/// `class_module::lower_const_assign`.
fn lower_const_op_assign<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, lhs: &ParseNode, op: &str, rhs: &ParseNode) -> Expression {
    let in_method = d.gs.symbols().get(d.current_owner).kind() == Some(SymbolKind::Method);
    if in_method {
        d.report(loc, ErrorKind::NoConstantReassignment, "dynamic constant assignment inside a method body");
        let n = d.intern("<dynamicConstAssign>");
        let read = d.local_expr(loc, LocalVariable::new(n));
        let rhs_e = d.translate(rhs);
        let combined = binary_send(d, loc, read, op, rhs_e);
        let write_target = d.local_expr(loc, LocalVariable::new(n));
        return d.assign(loc, write_target, combined);
    }

    match op {
        "||" => {
            let cond = d.translate(lhs);
            let kept = d.translate(lhs);
            let rhs_value = rewrite_let_rhs(d, rhs);
            let assign_e = class_module::lower_const_assign(d, loc, lhs, rhs_value);
            Expression::new(loc, ExpressionKind::If { cond: Box::new(cond), then_: Box::new(kept), else_: Box::new(assign_e) })
        }
        "&&" => {
            let cond = d.translate(lhs);
            let rhs_value = d.translate(rhs);
            let assign_e = class_module::lower_const_assign(d, loc, lhs, rhs_value);
            let kept = d.translate(lhs);
            Expression::new(loc, ExpressionKind::If { cond: Box::new(cond), then_: Box::new(assign_e), else_: Box::new(kept) })
        }
        _ => {
            let read = d.translate(lhs);
            let rhs_e = d.translate(rhs);
            let combined = binary_send(d, loc, read, op, rhs_e);
            class_module::lower_const_assign(d, loc, lhs, combined)
        }
    }
}

fn lower_simple_target<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, lhs: &ParseNode, op: &str, rhs: &ParseNode) -> Expression {
    match op {
        "||" => {
            let cond = d.translate(lhs);
            let kept = d.translate(lhs);
            let rhs_value = rewrite_let_rhs(d, rhs);
            let write_target = d.translate(lhs);
            let assign_e = d.assign(loc, write_target, rhs_value);
            Expression::new(loc, ExpressionKind::If { cond: Box::new(cond), then_: Box::new(kept), else_: Box::new(assign_e) })
        }
        "&&" => {
            let cond = d.translate(lhs);
            let rhs_value = d.translate(rhs);
            let write_target = d.translate(lhs);
            let assign_e = d.assign(loc, write_target, rhs_value);
            let kept = d.translate(lhs);
            Expression::new(loc, ExpressionKind::If { cond: Box::new(cond), then_: Box::new(assign_e), else_: Box::new(kept) })
        }
        _ => {
            let read = d.translate(lhs);
            let rhs_e = d.translate(rhs);
            let combined = binary_send(d, loc, read, op, rhs_e);
            let write_target = d.translate(lhs);
            d.assign(loc, write_target, combined)
        }
    }
}

fn lower_send_target<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    recv: &ParseNode,
    name: &str,
    args: &[Arg],
    safe_nav: bool,
    op: &str,
    rhs: &ParseNode,
) -> Expression {
    let recv_e = d.translate(recv);
    let tmp_recv = d.fresh_local("tmp");
    let tmp_recv_assign = d.assign(loc, d.local_expr(loc, tmp_recv), recv_e);

    let is_index = name == "[]";
    let mut inner_stats = Vec::new();
    let mut idx_locals = Vec::new();
    if is_index {
        for a in args {
            if let Arg::Plain(n) = a {
                let e = d.translate(n);
                let t = d.fresh_local("tmp");
                inner_stats.push(d.assign(loc, d.local_expr(loc, t), e));
                idx_locals.push(t);
            }
        }
    }

    let core = match op {
        "||" => {
            let getter = getter_expr(d, loc, tmp_recv, name, is_index, &idx_locals);
            let kept = getter_expr(d, loc, tmp_recv, name, is_index, &idx_locals);
            let rhs_value = rewrite_let_rhs(d, rhs);
            let set = setter_expr(d, loc, tmp_recv, name, is_index, &idx_locals, rhs_value);
            Expression::new(loc, ExpressionKind::If { cond: Box::new(getter), then_: Box::new(kept), else_: Box::new(set) })
        }
        "&&" => {
            let getter = getter_expr(d, loc, tmp_recv, name, is_index, &idx_locals);
            let rhs_value = d.translate(rhs);
            let set = setter_expr(d, loc, tmp_recv, name, is_index, &idx_locals, rhs_value);
            let kept = getter_expr(d, loc, tmp_recv, name, is_index, &idx_locals);
            Expression::new(loc, ExpressionKind::If { cond: Box::new(getter), then_: Box::new(set), else_: Box::new(kept) })
        }
        _ => {
            let getter = getter_expr(d, loc, tmp_recv, name, is_index, &idx_locals);
            let rhs_e = d.translate(rhs);
            let combined = binary_send(d, loc, getter, op, rhs_e);
            setter_expr(d, loc, tmp_recv, name, is_index, &idx_locals, combined)
        }
    };

    let rest_expr = if inner_stats.is_empty() {
        core
    } else {
        Expression::new(loc, ExpressionKind::InsSeq { stats: inner_stats, expr: Box::new(core) })
    };

    if safe_nav {
        let cond = send::build_triple_eq(d, loc, send::nil_class_const(d, loc), d.local_expr(loc, tmp_recv));
        let nil_branch = d.magic_send(loc, "<nil-for-safe-nav>", vec![d.local_expr(loc, tmp_recv)]);
        let if_e = Expression::new(loc, ExpressionKind::If { cond: Box::new(cond), then_: Box::new(nil_branch), else_: Box::new(rest_expr) });
        Expression::new(loc, ExpressionKind::InsSeq { stats: vec![tmp_recv_assign], expr: Box::new(if_e) })
    } else {
        Expression::new(loc, ExpressionKind::InsSeq { stats: vec![tmp_recv_assign], expr: Box::new(rest_expr) })
    }
}

fn getter_expr<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    tmp_recv: LocalVariable,
    name: &str,
    is_index: bool,
    idx_locals: &[LocalVariable],
) -> Expression {
    if is_index {
        let args_e: Vec<Expression> = idx_locals.iter().map(|&t| d.local_expr(loc, t)).collect();
        let recv_e = d.local_expr(loc, tmp_recv);
        d.send_index(loc, recv_e, args_e)
    } else {
        let fun = d.intern(name);
        let recv_e = d.local_expr(loc, tmp_recv);
        Expression::new(loc, ExpressionKind::Send { recv: Box::new(recv_e), fun, args: Vec::new(), block: None, flags: SendFlags::default() })
    }
}

fn setter_expr<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    tmp_recv: LocalVariable,
    name: &str,
    is_index: bool,
    idx_locals: &[LocalVariable],
    value: Expression,
) -> Expression {
    if is_index {
        let mut args_e: Vec<Expression> = idx_locals.iter().map(|&t| d.local_expr(loc, t)).collect();
        args_e.push(value);
        let fun = d.intern("[]=");
        let recv_e = d.local_expr(loc, tmp_recv);
        Expression::new(loc, ExpressionKind::Send { recv: Box::new(recv_e), fun, args: args_e, block: None, flags: SendFlags::default() })
    } else {
        let fun = d.intern(&format!("{name}="));
        let recv_e = d.local_expr(loc, tmp_recv);
        Expression::new(loc, ExpressionKind::Send { recv: Box::new(recv_e), fun, args: vec![value], block: None, flags: SendFlags::default() })
    }
}

fn binary_send<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, recv_e: Expression, op: &str, rhs_e: Expression) -> Expression {
    let fun = d.intern(op);
    Expression::new(loc, ExpressionKind::Send { recv: Box::new(recv_e), fun, args: vec![rhs_e], block: None, flags: SendFlags::default() })
}

/// `x ||= T.let(v, Type)` keeps its type annotation: the assign branch's
/// value is the `Cast` itself, not just `v`, so a `||=`-initialized ivar is
/// still type-annotated at its one assignment site.
fn rewrite_let_rhs<S: DiagnosticSink>(d: &mut Desugarer<S>, rhs: &ParseNode) -> Expression {
    let is_t_let = if let ParseKind::Send { recv: Some(recv), name: method, args, block: None, safe_nav: false } = &rhs.kind {
        method == "let" && args.len() == 2 && matches!(&recv.kind, ParseKind::ConstRef { scope: None, name, .. } if name == "T")
    } else {
        false
    };
    if is_t_let
        && let ParseKind::Send { args, .. } = &rhs.kind
        && let [Arg::Plain(value), Arg::Plain(type_expr)] = args.as_slice()
    {
        let let_loc = d.loc(rhs.range);
        let arg_e = d.translate(value);
        let type_e = d.translate(type_expr);
        return Expression::new(let_loc, ExpressionKind::Cast { arg: Box::new(arg_e), type_expr: Box::new(type_e), kind: CastKind::Let });
    }
    d.translate(rhs)
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

    fn local_node(name: &str) -> ParseNode {
        ParseNode::new(range(), ParseKind::Ident { kind: IdentKind::Local, name: name.to_owned() })
    }

    #[test]
    fn plain_op_assign_rewrites_to_binary_send_and_assign() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let e = lower_op_assign(&mut d, Loc::new(file(), 0, 1), &local_node("x"), "+", &local_node("y"));
        match e.kind {
            ExpressionKind::Assign { rhs, .. } => {
                assert!(matches!(rhs.kind, ExpressionKind::Send { .. }));
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn or_assign_builds_if_with_assign_in_else() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let e = lower_op_assign(&mut d, Loc::new(file(), 0, 1), &local_node("x"), "||", &local_node("y"));
        match e.kind {
            ExpressionKind::If { else_, .. } => assert!(matches!(else_.kind, ExpressionKind::Assign { .. })),
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn index_target_caches_receiver_and_index_in_temps() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let lhs = ParseNode::new(
            range(),
            ParseKind::Send {
                recv: Some(Box::new(local_node("h"))),
                name: "[]".to_owned(),
                args: vec![Arg::Plain(local_node("k"))],
                block: None,
                safe_nav: false,
            },
        );
        let e = lower_op_assign(&mut d, Loc::new(file(), 0, 1), &lhs, "+", &local_node("y"));
        match e.kind {
            ExpressionKind::InsSeq { stats, expr } => {
                assert_eq!(stats.len(), 1);
                match expr.kind {
                    ExpressionKind::InsSeq { stats: inner, expr: setter } => {
                        assert_eq!(inner.len(), 1);
                        assert!(matches!(setter.kind, ExpressionKind::Send { .. }));
                    }
                    other => panic!("expected inner InsSeq, got {other:?}"),
                }
            }
            other => panic!("expected InsSeq, got {other:?}"),
        }
    }

    #[test]
    fn top_level_const_op_assign_is_a_real_read_modify_write() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let lhs = ParseNode::new(range(), ParseKind::ConstRef { scope: None, name: "X".to_owned(), top_level: false });
        let e = lower_op_assign(&mut d, Loc::new(file(), 0, 1), &lhs, "+", &local_node("y"));
        match e.kind {
            ExpressionKind::Assign { lhs, rhs } => {
                assert!(matches!(lhs.kind, ExpressionKind::UnresolvedConstantLit { .. }));
                assert!(matches!(rhs.kind, ExpressionKind::Send { .. }));
            }
            other => panic!("expected Assign, got {other:?}"),
        }
    }

    #[test]
    fn const_op_assign_inside_a_method_body_is_redirected_to_synthetic_local() {
        let mut gs = GlobalState::new();
        let mut sink = CollectingSink::new();
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let fun_name = d.intern("foo");
        let sym = d.gs.symbols_mut().enter_symbol(d.current_owner, fun_name, SymbolKind::Method).unwrap();
        d.current_owner = sym;
        let lhs = ParseNode::new(range(), ParseKind::ConstRef { scope: None, name: "X".to_owned(), top_level: false });
        let e = lower_op_assign(&mut d, Loc::new(file(), 0, 1), &lhs, "+", &local_node("y"));
        match e.kind {
            ExpressionKind::Assign { lhs, .. } => assert!(matches!(lhs.kind, ExpressionKind::Local(_))),
            other => panic!("expected Assign, got {other:?}"),
        }
        assert_eq!(sink.diagnostics().len(), 1);
        assert!(matches!(sink.diagnostics()[0].kind, ErrorKind::NoConstantReassignment));
    }
}
