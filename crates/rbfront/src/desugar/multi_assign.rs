//! Multiple assignment lowering (§4.5.3): `a, *b, c = rhs`.
//!
//! The right-hand side is captured once (`tmpRhs`), then expanded through
//! `Magic.<expand-splat>(tmpRhs, beforeCount, afterCount)` into a flat,
//! indexable sequence where the splat's own slot (if any) already holds the
//! captured middle slice — every target, before the splat, the splat itself,
//! or after it, is then just `expanded[i]` for the right `i`. Parenthesized
//! nested targets (`a, (b, c), d = rhs`) recurse the same expansion against
//! their own slot.

use super::*;

pub(super) fn lower_multi_assign<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, items: &[MlhsItem], rhs: &ParseNode) -> Expression {
    let rhs_e = d.translate(rhs);
    let tmp_rhs = d.fresh_local("tmpRhs");
    let mut stats = vec![d.assign(loc, d.local_expr(loc, tmp_rhs), rhs_e)];
    let source = d.local_expr(loc, tmp_rhs);
    build_targets(d, loc, items, source, &mut stats);
    let result = d.local_expr(loc, tmp_rhs);
    Expression::new(loc, ExpressionKind::InsSeq { stats, expr: Box::new(result) })
}

fn build_targets<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, items: &[MlhsItem], source: Expression, stats: &mut Vec<Expression>) {
    let splat_index = items.iter().position(|i| matches!(i, MlhsItem::Splat(_)));
    let before = splat_index.unwrap_or(items.len());
    let after = items.len() - before - usize::from(splat_index.is_some());

    let before_lit = d.int_lit(loc, before as i64);
    let after_lit = d.int_lit(loc, after as i64);
    let expanded = d.magic_send(loc, "<expand-splat>", vec![source, before_lit, after_lit]);
    let tmp = d.fresh_local("mlhs");
    stats.push(d.assign(loc, d.local_expr(loc, tmp), expanded));

    for (i, item) in items.iter().enumerate() {
        let idx = d.int_lit(loc, i as i64);
        let slot = d.send_index(loc, d.local_expr(loc, tmp), vec![idx]);
        match item {
            MlhsItem::Plain(node) => {
                let lhs = d.translate(node);
                stats.push(d.assign(loc, lhs, slot));
            }
            MlhsItem::Splat(Some(node)) => {
                let lhs = d.translate(node);
                stats.push(d.assign(loc, lhs, slot));
            }
            MlhsItem::Splat(None) => {}
            MlhsItem::Nested(nested) => build_targets(d, loc, nested, slot, stats),
        }
    }
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
    fn splat_in_middle_counts_before_and_after() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let items = vec![
            MlhsItem::Plain(local_node("a")),
            MlhsItem::Splat(Some(local_node("b"))),
            MlhsItem::Plain(local_node("c")),
        ];
        let rhs = local_node("xs");
        let e = lower_multi_assign(&mut d, Loc::new(file(), 0, 1), &items, &rhs);
        match e.kind {
            ExpressionKind::InsSeq { stats, .. } => {
                // tmpRhs assign, expand-splat assign, then one assign per target (3).
                assert_eq!(stats.len(), 5);
            }
            other => panic!("expected InsSeq, got {other:?}"),
        }
    }

    #[test]
    fn anonymous_splat_emits_no_assignment() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let items = vec![MlhsItem::Plain(local_node("a")), MlhsItem::Splat(None)];
        let rhs = local_node("xs");
        let e = lower_multi_assign(&mut d, Loc::new(file(), 0, 1), &items, &rhs);
        match e.kind {
            ExpressionKind::InsSeq { stats, .. } => assert_eq!(stats.len(), 3),
            other => panic!("expected InsSeq, got {other:?}"),
        }
    }
}
