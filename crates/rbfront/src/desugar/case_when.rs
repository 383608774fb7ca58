//! `case`/`when`/`in` lowering (§4.5.6).
//!
//! Classic `case`/`when` becomes an `if`/`elsif` ladder comparing each
//! pattern against the (once-evaluated) subject via `===`; a subject-less
//! `case` just uses each pattern as a boolean directly. Pattern-matching
//! `case`/`in` lowers each clause to `if <structural match> then {bindings;
//! body} else <next clause> end`; bound names get a placeholder assignment
//! since the actual destructured values are an external matcher's job here —
//! this translator only guarantees the bindings exist with the right name
//! and scope.

use super::*;
use crate::ast::SendFlags;

pub(super) fn lower_case_when<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    subject: Option<&ParseNode>,
    whens: &[WhenClause],
    else_: Option<&ParseNode>,
) -> Expression {
    let else_e = match else_ {
        Some(e) => d.translate(e),
        None => Expression::new(loc, ExpressionKind::Literal(LiteralValue::Nil)),
    };

    let subj_tmp = subject.map(|s| {
        let e = d.translate(s);
        let tmp = d.fresh_local("tmp");
        (tmp, d.assign(loc, d.local_expr(loc, tmp), e))
    });

    let mut acc = else_e;
    for w in whens.iter().rev() {
        let conds: Vec<Expression> = w.patterns.iter().map(|p| pattern_cond(d, loc, p, subj_tmp.as_ref().map(|(t, _)| *t))).collect();
        let cond_e = build_or(d, loc, conds);
        let body_e = d.translate(&w.body);
        acc = Expression::new(loc, ExpressionKind::If { cond: Box::new(cond_e), then_: Box::new(body_e), else_: Box::new(acc) });
    }

    match subj_tmp {
        Some((_, assign)) => Expression::new(loc, ExpressionKind::InsSeq { stats: vec![assign], expr: Box::new(acc) }),
        None => acc,
    }
}

fn pattern_cond<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, pat: &Arg, subj_tmp: Option<LocalVariable>) -> Expression {
    match pat {
        Arg::Plain(node) => {
            let pat_e = d.translate(node);
            match subj_tmp {
                Some(tmp) => send::build_triple_eq(d, loc, pat_e, d.local_expr(loc, tmp)),
                None => pat_e,
            }
        }
        Arg::Splat(node) => {
            let arr_e = d.translate(node);
            let subj_e = match subj_tmp {
                Some(tmp) => d.local_expr(loc, tmp),
                None => Expression::new(loc, ExpressionKind::Literal(LiteralValue::Nil)),
            };
            d.magic_send(loc, "<check-match-array>", vec![subj_e, arr_e])
        }
        _ => crate::errors::internal_error("case/when pattern must be Plain or Splat"),
    }
}

/// `a || b || c`, single-evaluated: each operand is tried in turn and the
/// first truthy one wins, without re-running any operand's side effects.
fn build_or<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, conds: Vec<Expression>) -> Expression {
    chain(d, loc, conds, true)
}

/// `a && b && c`, single-evaluated: stops at the first falsy operand.
fn build_and<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, conds: Vec<Expression>) -> Expression {
    chain(d, loc, conds, false)
}

fn chain<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, conds: Vec<Expression>, is_or: bool) -> Expression {
    let mut iter = conds.into_iter();
    let mut acc = match iter.next() {
        Some(first) => first,
        None => Expression::new(loc, ExpressionKind::Literal(LiteralValue::True)),
    };
    for next in iter {
        let tmp = d.fresh_local("tmp");
        let assign_tmp = d.assign(loc, d.local_expr(loc, tmp), acc);
        let cond = d.local_expr(loc, tmp);
        let kept = d.local_expr(loc, tmp);
        let if_e = if is_or {
            Expression::new(loc, ExpressionKind::If { cond: Box::new(cond), then_: Box::new(kept), else_: Box::new(next) })
        } else {
            Expression::new(loc, ExpressionKind::If { cond: Box::new(cond), then_: Box::new(next), else_: Box::new(kept) })
        };
        acc = Expression::new(loc, ExpressionKind::InsSeq { stats: vec![assign_tmp], expr: Box::new(if_e) });
    }
    acc
}

pub(super) fn lower_case_in<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    subject: &ParseNode,
    clauses: &[InClause],
    else_: Option<&ParseNode>,
) -> Expression {
    let subj_e = d.translate(subject);
    let tmp = d.fresh_local("tmp");
    let tmp_assign = d.assign(loc, d.local_expr(loc, tmp), subj_e);

    let mut acc = match else_ {
        Some(e) => d.translate(e),
        None => d.magic_send(loc, "<raise-unmatched-pattern>", vec![d.local_expr(loc, tmp)]),
    };

    for c in clauses.iter().rev() {
        let mut bindings = Vec::new();
        collect_pattern_bindings(d, loc, &c.pattern, &mut bindings);
        let match_cond = build_pattern_match_cond(d, loc, &c.pattern, d.local_expr(loc, tmp));
        let body_e = d.translate(&c.body);
        let with_bindings = if bindings.is_empty() {
            body_e
        } else {
            Expression::new(loc, ExpressionKind::InsSeq { stats: bindings, expr: Box::new(body_e) })
        };
        let guarded_then = match &c.guard {
            Some(g) => {
                let guard_e = d.translate(g);
                Expression::new(loc, ExpressionKind::If { cond: Box::new(guard_e), then_: Box::new(with_bindings), else_: Box::new(acc.clone()) })
            }
            None => with_bindings,
        };
        acc = Expression::new(loc, ExpressionKind::If { cond: Box::new(match_cond), then_: Box::new(guarded_then), else_: Box::new(acc) });
    }

    Expression::new(loc, ExpressionKind::InsSeq { stats: vec![tmp_assign], expr: Box::new(acc) })
}

fn raise_unimplemented<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc) -> Expression {
    let fun = d.intern("raise_unimplemented");
    Expression::new(
        loc,
        ExpressionKind::Send {
            recv: Box::new(Expression::self_expr(loc)),
            fun,
            args: Vec::new(),
            block: None,
            flags: SendFlags { is_private_ok: true, has_block: false },
        },
    )
}

fn collect_pattern_bindings<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, pattern: &PatternNode, out: &mut Vec<Expression>) {
    match pattern {
        PatternNode::Bind(name) => {
            let n = d.intern(name);
            let lhs = d.local_expr(loc, LocalVariable::new(n));
            let rhs = raise_unimplemented(d, loc);
            out.push(d.assign(loc, lhs, rhs));
        }
        PatternNode::Literal(_) | PatternNode::Pin(_) => {}
        PatternNode::Array { elements, .. } => {
            for e in elements {
                collect_pattern_bindings(d, loc, e, out);
            }
        }
        PatternNode::Hash(entries) => {
            for (key, opt_pattern) in entries {
                match opt_pattern {
                    Some(p) => collect_pattern_bindings(d, loc, p, out),
                    None => {
                        let n = d.intern(key);
                        let lhs = d.local_expr(loc, LocalVariable::new(n));
                        let rhs = raise_unimplemented(d, loc);
                        out.push(d.assign(loc, lhs, rhs));
                    }
                }
            }
        }
        PatternNode::Alt(a, b) => {
            collect_pattern_bindings(d, loc, a, out);
            collect_pattern_bindings(d, loc, b, out);
        }
        PatternNode::TypeBind { binding, .. } => {
            if let Some(name) = binding {
                let n = d.intern(name);
                let lhs = d.local_expr(loc, LocalVariable::new(n));
                let rhs = raise_unimplemented(d, loc);
                out.push(d.assign(loc, lhs, rhs));
            }
        }
    }
}

fn build_pattern_match_cond<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, pattern: &PatternNode, subj: Expression) -> Expression {
    match pattern {
        PatternNode::Bind(_) => Expression::new(loc, ExpressionKind::Literal(LiteralValue::True)),
        PatternNode::Literal(node) => {
            let pat_e = d.translate(node);
            send::build_triple_eq(d, loc, pat_e, subj)
        }
        PatternNode::Pin(name) => {
            let n = d.intern(name);
            let local_e = d.local_expr(loc, LocalVariable::new(n));
            send::build_triple_eq(d, loc, local_e, subj)
        }
        PatternNode::TypeBind { type_expr, .. } => {
            let type_e = d.translate(type_expr);
            send::build_triple_eq(d, loc, type_e, subj)
        }
        PatternNode::Array { elements, rest_index } => {
            let len_lit = d.int_lit(loc, elements.len() as i64);
            let rest_lit = match rest_index {
                Some(i) => d.int_lit(loc, *i as i64),
                None => Expression::new(loc, ExpressionKind::Literal(LiteralValue::Nil)),
            };
            let shape_check = d.magic_send(loc, "<pattern-match-array>", vec![subj.clone(), len_lit, rest_lit]);
            let mut conds = vec![shape_check];
            for (i, elem) in elements.iter().enumerate() {
                if Some(i) == *rest_index {
                    continue;
                }
                let idx = d.int_lit(loc, i as i64);
                let slot = d.send_index(loc, subj.clone(), vec![idx]);
                conds.push(build_pattern_match_cond(d, loc, elem, slot));
            }
            build_and(d, loc, conds)
        }
        PatternNode::Hash(entries) => {
            let shape_check = d.magic_send(loc, "<pattern-match-hash>", vec![subj.clone()]);
            let mut conds = vec![shape_check];
            for (key, opt_pattern) in entries {
                if let Some(p) = opt_pattern {
                    let key_sym = d.intern(key);
                    let key_lit = Expression::new(loc, ExpressionKind::Literal(LiteralValue::SymbolLit(key_sym)));
                    let slot = d.send_index(loc, subj.clone(), vec![key_lit]);
                    conds.push(build_pattern_match_cond(d, loc, p, slot));
                }
            }
            build_and(d, loc, conds)
        }
        PatternNode::Alt(a, b) => {
            let ca = build_pattern_match_cond(d, loc, a, subj.clone());
            let cb = build_pattern_match_cond(d, loc, b, subj);
            build_or(d, loc, vec![ca, cb])
        }
    }
}
