//! `Send` construction and its surrounding sugar (§4.5.1): splat/keyword/
//! block-pass argument shapes, safe navigation, `&:sym` block literals, and
//! `...` argument forwarding. Every other submodule that needs to build a
//! plain `X === Y` check (case/when) reuses [`build_triple_eq`] from here.

use super::*;
use crate::ast::SendFlags;
use crate::intern::WellKnownName;

enum ArgPiece {
    Plain(Expression),
    Splat(Expression),
}

fn plain_of(piece: ArgPiece) -> Expression {
    match piece {
        ArgPiece::Plain(e) | ArgPiece::Splat(e) => e,
    }
}

fn nil_lit(loc: Loc) -> Expression {
    Expression::new(loc, ExpressionKind::Literal(LiteralValue::Nil))
}

pub(super) fn build_triple_eq<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, lhs: Expression, rhs: Expression) -> Expression {
    let fun = WellKnownName::TripleEq.name_ref();
    Expression::new(
        loc,
        ExpressionKind::Send { recv: Box::new(lhs), fun, args: vec![rhs], block: None, flags: SendFlags::default() },
    )
}

pub(super) fn nil_class_const<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc) -> Expression {
    let sym = d
        .gs
        .bootstrap_class("NilClass")
        .unwrap_or_else(|| crate::errors::internal_error("NilClass missing from bootstrap"));
    Expression::new(loc, ExpressionKind::ConstantLit { sym, original: None })
}

pub(super) fn lower_send<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    recv: Option<&ParseNode>,
    name: &str,
    args: &[Arg],
    block: Option<&BlockNode>,
    safe_nav: bool,
) -> Expression {
    if safe_nav {
        let recv_node = recv.unwrap_or_else(|| crate::errors::internal_error("safe navigation always has an explicit receiver"));
        let recv_e = d.translate(recv_node);
        let tmp = d.fresh_local("tmp");
        let tmp_assign = d.assign(loc, d.local_expr(loc, tmp), recv_e);
        let cond = build_triple_eq(d, loc, nil_class_const(d, loc), d.local_expr(loc, tmp));
        let then_branch = d.magic_send(loc, "<nil-for-safe-nav>", vec![d.local_expr(loc, tmp)]);
        let else_branch = build_call(d, loc, d.local_expr(loc, tmp), false, name, args, block);
        let if_e = Expression::new(
            loc,
            ExpressionKind::If { cond: Box::new(cond), then_: Box::new(then_branch), else_: Box::new(else_branch) },
        );
        return Expression::new(loc, ExpressionKind::InsSeq { stats: vec![tmp_assign], expr: Box::new(if_e) });
    }
    let recv_e = match recv {
        Some(r) => d.translate(r),
        None => Expression::self_expr(loc),
    };
    build_call(d, loc, recv_e, recv.is_none(), name, args, block)
}

fn build_call<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    recv_e: Expression,
    implicit_self: bool,
    name: &str,
    args: &[Arg],
    block: Option<&BlockNode>,
) -> Expression {
    let expanded = expand_forward_all(args, loc);
    let (after_block, synth_block) = extract_symbol_block_pass(d, loc, expanded);
    let chosen_block: Option<Box<Expression>> = match block {
        Some(b) => Some(Box::new(blocks::lower_block(d, loc, b))),
        None => synth_block.map(Box::new),
    };

    let (after_kw, kw_hash) = extract_kwargs(d, loc, after_block);

    let mut pieces = Vec::new();
    let mut block_pass_expr: Option<Expression> = None;
    for a in after_kw {
        match a {
            Arg::Plain(n) => pieces.push(ArgPiece::Plain(d.translate(&n))),
            Arg::Splat(n) => pieces.push(ArgPiece::Splat(d.translate(&n))),
            Arg::AnonSplat => {
                let star = d.intern("*");
                pieces.push(ArgPiece::Splat(d.local_expr(loc, LocalVariable::new(star))));
            }
            Arg::BlockPass(n) => block_pass_expr = Some(d.translate(&n)),
            Arg::AnonBlockPass | Arg::ForwardAll | Arg::Kwarg { .. } | Arg::KwSplat(_) => {
                crate::errors::internal_error("arg kind should have been expanded or extracted already")
            }
        }
    }

    let fun = d.intern(name);
    finish_call(d, loc, recv_e, implicit_self, fun, pieces, kw_hash, block_pass_expr, chosen_block)
}

#[allow(clippy::too_many_arguments)]
fn finish_call<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    recv_e: Expression,
    implicit_self: bool,
    fun: NameRef,
    pieces: Vec<ArgPiece>,
    kw_hash: Option<Expression>,
    block_pass_expr: Option<Expression>,
    chosen_block: Option<Box<Expression>>,
) -> Expression {
    let has_splat = pieces.iter().any(|p| matches!(p, ArgPiece::Splat(_)));
    let has_block = chosen_block.is_some();

    if !has_splat && block_pass_expr.is_none() {
        let mut positional: Vec<Expression> = pieces.into_iter().map(plain_of).collect();
        if let Some(h) = kw_hash {
            positional.push(h);
        }
        return Expression::new(
            loc,
            ExpressionKind::Send {
                recv: Box::new(recv_e),
                fun,
                args: positional,
                block: chosen_block,
                flags: SendFlags { is_private_ok: implicit_self, has_block },
            },
        );
    }

    let sym_lit = Expression::new(loc, ExpressionKind::Literal(LiteralValue::SymbolLit(fun)));

    match (has_splat, block_pass_expr) {
        (true, Some(bp)) => {
            let array_arg = build_array_from_pieces(d, loc, pieces);
            let kwargs_or_nil = kw_hash.unwrap_or_else(|| nil_lit(loc));
            d.magic_send(loc, "<call-with-splat-and-block-pass>", vec![recv_e, sym_lit, array_arg, kwargs_or_nil, bp])
        }
        (true, None) => {
            let array_arg = build_array_from_pieces(d, loc, pieces);
            let kwargs_or_nil = kw_hash.unwrap_or_else(|| nil_lit(loc));
            d.magic_send(loc, "<call-with-splat>", vec![recv_e, sym_lit, array_arg, kwargs_or_nil])
        }
        (false, Some(bp)) => {
            let mut margs = vec![recv_e, sym_lit, bp];
            margs.extend(pieces.into_iter().map(plain_of));
            if let Some(h) = kw_hash {
                margs.push(h);
            }
            d.magic_send(loc, "<call-with-block-pass>", margs)
        }
        (false, None) => crate::errors::internal_error("finish_call reached the no-splat/no-block-pass branch twice"),
    }
}

/// `...` expands to `*<fwdArgs>, **<fwdKwargs>, &<fwdBlock>` (§4.5.1),
/// referencing the three well-known forwarding locals a method declared
/// `def foo(...)` binds them to.
fn expand_forward_all(args: &[Arg], loc: Loc) -> Vec<Arg> {
    let mut out = Vec::with_capacity(args.len());
    let range = ByteRange::new(loc.begin, loc.end);
    let ident = |name: &str| ParseNode::new(range, ParseKind::Ident { kind: IdentKind::Local, name: name.to_owned() });
    for a in args {
        if matches!(a, Arg::ForwardAll) {
            out.push(Arg::Splat(ident(WellKnownName::FwdArgs.as_str())));
            out.push(Arg::KwSplat(ident(WellKnownName::FwdKwargs.as_str())));
            out.push(Arg::BlockPass(ident(WellKnownName::FwdBlock.as_str())));
        } else {
            out.push(a.clone());
        }
    }
    out
}

/// `&:sym` is rewritten eagerly into a literal block so it participates in
/// normal block typing (§4.5.1): `|*tmp| tmp[0].sym(*tmp[1, MAX])`.
fn extract_symbol_block_pass<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, args: Vec<Arg>) -> (Vec<Arg>, Option<Expression>) {
    let mut remaining = Vec::with_capacity(args.len());
    let mut synthesized = None;
    for a in args {
        match a {
            Arg::BlockPass(node) if synthesized.is_none() && matches!(node.kind, ParseKind::SymbolLit(_)) => {
                if let ParseKind::SymbolLit(sym_name) = node.kind {
                    synthesized = Some(synthesize_symbol_block(d, loc, &sym_name));
                }
            }
            other => remaining.push(other),
        }
    }
    (remaining, synthesized)
}

fn synthesize_symbol_block<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, method_name: &str) -> Expression {
    let tmp = d.fresh_local("tmp");
    let zero = d.int_lit(loc, 0);
    let tmp0 = d.send_index(loc, d.local_expr(loc, tmp), vec![zero]);
    let one = d.int_lit(loc, 1);
    let max = d.int_lit(loc, i64::MAX);
    let tmp_slice = d.send_index(loc, d.local_expr(loc, tmp), vec![one, max]);
    let fun = d.intern(method_name);
    let body = finish_call(d, loc, tmp0, false, fun, vec![ArgPiece::Splat(tmp_slice)], None, None, None);
    let param = Expression::new(loc, ExpressionKind::RestArg(Box::new(d.local_expr(loc, tmp))));
    Expression::new(loc, ExpressionKind::Block { params: vec![param], body: Box::new(body) })
}

/// Keyword arguments bundle into a single trailing `Hash` arg, built through
/// the same splat-aware hash pipeline (§4.5.2) whether or not a `**splat` is
/// present — one code path, since the hash pipeline already degrades
/// gracefully to a plain literal when there's nothing to merge.
fn extract_kwargs<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, args: Vec<Arg>) -> (Vec<Arg>, Option<Expression>) {
    let mut remaining = Vec::with_capacity(args.len());
    let mut entries = Vec::new();
    let range = ByteRange::new(loc.begin, loc.end);
    for a in args {
        match a {
            Arg::Kwarg { name, value } => {
                let key = ParseNode::new(range, ParseKind::SymbolLit(name));
                entries.push(HashEntry::Pair { key, value });
            }
            Arg::KwSplat(node) => entries.push(HashEntry::Splat(node)),
            other => remaining.push(other),
        }
    }
    if entries.is_empty() {
        (remaining, None)
    } else {
        (remaining, Some(hash::lower_hash_literal(d, loc, &entries)))
    }
}

fn build_array_from_pieces<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, pieces: Vec<ArgPiece>) -> Expression {
    let mut acc: Option<Expression> = None;
    let mut pending: Vec<Expression> = Vec::new();
    for piece in pieces {
        match piece {
            ArgPiece::Plain(e) => pending.push(e),
            ArgPiece::Splat(e) => {
                let flushed = match acc.take() {
                    None => Expression::new(loc, ExpressionKind::Array(std::mem::take(&mut pending))),
                    Some(prev) if !pending.is_empty() => {
                        let mut margs = vec![prev];
                        margs.extend(std::mem::take(&mut pending));
                        d.magic_send(loc, "<append-array>", margs)
                    }
                    Some(prev) => prev,
                };
                acc = Some(d.magic_send(loc, "<concat-array>", vec![flushed, e]));
            }
        }
    }
    match acc {
        Some(prev) if !pending.is_empty() => {
            let mut margs = vec![prev];
            margs.extend(pending);
            d.magic_send(loc, "<append-array>", margs)
        }
        Some(prev) => prev,
        None => Expression::new(loc, ExpressionKind::Array(pending)),
    }
}

/// An array literal containing a splat (`[a, *b, c]`) lowers through the same
/// pipeline a splatted call's argument array does.
pub(super) fn lower_array_with_splat<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, args: &[Arg]) -> Expression {
    let mut pieces = Vec::with_capacity(args.len());
    for a in args {
        match a {
            Arg::Plain(n) => pieces.push(ArgPiece::Plain(d.translate(n))),
            Arg::Splat(n) => pieces.push(ArgPiece::Splat(d.translate(n))),
            Arg::AnonSplat => {
                let star = d.intern("*");
                pieces.push(ArgPiece::Splat(d.local_expr(loc, LocalVariable::new(star))));
            }
            _ => {}
        }
    }
    build_array_from_pieces(d, loc, pieces)
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

    fn plain_ident(name: &str) -> ParseNode {
        ParseNode::new(range(), ParseKind::Ident { kind: IdentKind::Local, name: name.to_owned() })
    }

    #[test]
    fn plain_send_has_no_magic_wrapping() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let e = lower_send(&mut d, Loc::new(file(), 0, 1), Some(&plain_ident("x")), "foo", &[], None, false);
        match e.kind {
            ExpressionKind::Send { fun, args, .. } => {
                assert!(args.is_empty());
                assert_eq!(d.gs().names().utf8_str(fun), Some("foo"));
            }
            other => panic!("expected Send, got {other:?}"),
        }
    }

    #[test]
    fn splat_arg_lowers_through_call_with_splat() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let args = vec![Arg::Splat(plain_ident("xs"))];
        let e = lower_send(&mut d, Loc::new(file(), 0, 1), Some(&plain_ident("recv")), "foo", &args, None, false);
        match e.kind {
            ExpressionKind::Send { recv, fun, .. } => {
                assert_eq!(d.gs().names().utf8_str(fun), Some("<call-with-splat>"));
                assert!(matches!(recv.kind, ExpressionKind::ConstantLit { .. }));
            }
            other => panic!("expected Magic Send, got {other:?}"),
        }
    }

    #[test]
    fn symbol_block_pass_builds_literal_block() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let sym_node = ParseNode::new(range(), ParseKind::SymbolLit("to_s".to_owned()));
        let args = vec![Arg::BlockPass(sym_node)];
        let e = lower_send(&mut d, Loc::new(file(), 0, 1), Some(&plain_ident("xs")), "map", &args, None, false);
        match e.kind {
            ExpressionKind::Send { block: Some(b), .. } => {
                assert!(matches!(b.kind, ExpressionKind::Block { .. }));
            }
            other => panic!("expected Send with synthesized block, got {other:?}"),
        }
    }

    #[test]
    fn safe_nav_wraps_in_nil_check() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let e = lower_send(&mut d, Loc::new(file(), 0, 1), Some(&plain_ident("a")), "b", &[], None, true);
        match e.kind {
            ExpressionKind::InsSeq { stats, expr } => {
                assert_eq!(stats.len(), 1);
                assert!(matches!(expr.kind, ExpressionKind::If { .. }));
            }
            other => panic!("expected InsSeq wrapping an If, got {other:?}"),
        }
    }
}
