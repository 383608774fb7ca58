//! Block parameter lowering (§4.5.5).
//!
//! A literal block (`do |params| body end` / `{ |params| body }`) becomes its
//! own [`ExpressionKind::Block`] node. Most param shapes translate directly;
//! destructuring params (`|(a, b)|`) and the two implicit-param sugars
//! (numbered `_1`.._9`, `it`) need a rewrite before the body can be
//! translated as-is.

use super::*;
use crate::errors::ErrorKind;
use crate::intern::WellKnownName;

pub(super) fn lower_block<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, block: &BlockNode) -> Expression {
    let has_numbered = block.params.iter().any(|p| matches!(p, BlockParam::Numbered));
    let has_it = block.params.iter().any(|p| matches!(p, BlockParam::It));

    if has_numbered {
        return lower_numbered_block(d, loc, block);
    }
    if has_it {
        return lower_it_block(d, loc, block);
    }

    let mut params = Vec::new();
    let mut prelude = Vec::new();
    for p in &block.params {
        lower_param(d, loc, p, &mut params, &mut prelude);
    }
    let body_e = d.translate(&block.body);
    let body = if prelude.is_empty() {
        body_e
    } else {
        Expression::new(loc, ExpressionKind::InsSeq { stats: prelude, expr: Box::new(body_e) })
    };
    Expression::new(loc, ExpressionKind::Block { params, body: Box::new(body) })
}

fn lower_param<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    param: &BlockParam,
    params: &mut Vec<Expression>,
    prelude: &mut Vec<Expression>,
) {
    match param {
        BlockParam::Required(name) => {
            let n = d.intern(name);
            params.push(d.local_expr(loc, LocalVariable::new(n)));
        }
        BlockParam::Optional(name, default) => {
            let n = d.intern(name);
            let target = Box::new(d.local_expr(loc, LocalVariable::new(n)));
            let default_e = Box::new(d.translate(default));
            params.push(Expression::new(loc, ExpressionKind::OptionalArg { target, default: default_e }));
        }
        BlockParam::Rest(name) => {
            let n = d.intern(name.as_deref().unwrap_or("*"));
            let local = Box::new(d.local_expr(loc, LocalVariable::new(n)));
            params.push(Expression::new(loc, ExpressionKind::RestArg(local)));
        }
        BlockParam::Keyword { name, default } => {
            let n = d.intern(name);
            let default_e = default.as_ref().map(|e| Box::new(d.translate(e)));
            params.push(Expression::new(loc, ExpressionKind::KeywordArg { name: n, default: default_e }));
        }
        BlockParam::Block(name) => {
            let n = d.intern(name.as_deref().unwrap_or("&"));
            let local = Box::new(d.local_expr(loc, LocalVariable::new(n)));
            params.push(Expression::new(loc, ExpressionKind::BlockArg(local)));
        }
        BlockParam::Shadow(name) => {
            let n = d.intern(name);
            let local = Box::new(d.local_expr(loc, LocalVariable::new(n)));
            params.push(Expression::new(loc, ExpressionKind::ShadowArg(local)));
        }
        BlockParam::Destructure(items) => {
            let destructure_name = WellKnownName::DestructureArg.name_ref();
            let slot = LocalVariable::new(destructure_name);
            params.push(d.local_expr(loc, slot));
            let target = d.local_expr(loc, slot);
            lower_destructure(d, loc, &target, items, prelude, 0);
        }
        BlockParam::Numbered | BlockParam::It => {
            crate::errors::internal_error("Numbered/It params must be handled by the caller before per-param lowering")
        }
    }
}

/// Unpacks `target[i]` into each destructured name, prepending the
/// assignments to the block body. Only the top level (`depth == 0`) may
/// itself contain a `*rest`; a `*rest` nested inside a nested destructure is
/// `UnsupportedRestArgsDestructure` (§7).
fn lower_destructure<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    target: &Expression,
    items: &[BlockParam],
    prelude: &mut Vec<Expression>,
    depth: u32,
) {
    for (i, item) in items.iter().enumerate() {
        let idx = d.int_lit(loc, i as i64);
        let slot = d.send_index(loc, clone_local(target), vec![idx]);
        match item {
            BlockParam::Required(name) => {
                let n = d.intern(name);
                let lhs = d.local_expr(loc, LocalVariable::new(n));
                prelude.push(d.assign(loc, lhs, slot));
            }
            BlockParam::Rest(name) => {
                if depth != 0 {
                    d.report(loc, ErrorKind::UnsupportedRestArgsDestructure, "nested rest argument in destructuring parameter");
                    continue;
                }
                let n = d.intern(name.as_deref().unwrap_or("*"));
                let lhs = d.local_expr(loc, LocalVariable::new(n));
                prelude.push(d.assign(loc, lhs, slot));
            }
            BlockParam::Destructure(nested) => {
                lower_destructure(d, loc, &slot, nested, prelude, depth + 1);
            }
            _ => d.report(loc, ErrorKind::UnsupportedRestArgsDestructure, "unsupported destructuring parameter shape"),
        }
    }
}

fn clone_local(expr: &Expression) -> Expression {
    expr.clone()
}

/// `_1`.._9` implicit params: scans the (untranslated) body for the highest
/// index actually referenced and synthesizes that many required params, each
/// one's `Loc` pinned to its first usage site in the body (not the block's
/// overall span), so an IDE highlighting a synthesized param lands on the
/// actual reference rather than the whole `do...end`.
fn lower_numbered_block<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, block: &BlockNode) -> Expression {
    let mut first_use: [Option<ByteRange>; 9] = [None; 9];
    scan_numbered(&block.body, &mut first_use);
    let max = first_use.iter().rposition(Option::is_some).map_or(0, |idx| idx as u32 + 1).max(1);
    let params = (1..=max)
        .map(|i| {
            let n = d.intern(&format!("_{i}"));
            let param_loc = first_use[(i - 1) as usize].map_or(loc, |range| d.loc(range));
            d.local_expr(param_loc, LocalVariable::new(n))
        })
        .collect();
    let body = d.translate(&block.body);
    Expression::new(loc, ExpressionKind::Block { params, body: Box::new(body) })
}

fn scan_numbered(node: &ParseNode, first_use: &mut [Option<ByteRange>; 9]) {
    if let ParseKind::Ident { kind: IdentKind::Local, name } = &node.kind
        && let Some(digit) = name.strip_prefix('_')
        && digit.len() == 1
        && let Some(n) = digit.chars().next().and_then(|c| c.to_digit(10))
        && (1..=9).contains(&n)
    {
        let slot = &mut first_use[(n - 1) as usize];
        if slot.is_none() {
            *slot = Some(node.range);
        }
    }
    node.for_each_child(&mut |child| scan_numbered(child, first_use));
}

/// The implicit `it` param: always exactly one param named `it`, pinned to
/// its first usage site in the body (falling back to the block's own `loc`
/// if `it` is never actually referenced).
fn lower_it_block<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, block: &BlockNode) -> Expression {
    let n = d.intern("it");
    let param_loc = scan_it_first_use(&block.body).map_or(loc, |range| d.loc(range));
    let params = vec![d.local_expr(param_loc, LocalVariable::new(n))];
    let body = d.translate(&block.body);
    Expression::new(loc, ExpressionKind::Block { params, body: Box::new(body) })
}

fn scan_it_first_use(node: &ParseNode) -> Option<ByteRange> {
    if let ParseKind::Ident { kind: IdentKind::Local, name } = &node.kind
        && name == "it"
    {
        return Some(node.range);
    }
    let mut found = None;
    node.for_each_child(&mut |child| {
        if found.is_none() {
            found = scan_it_first_use(child);
        }
    });
    found
}
