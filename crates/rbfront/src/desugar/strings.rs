//! Strings, symbols, and regexps with interpolation (§4.5.8).
//!
//! Adjacent literal chunks are merged before any `Magic.<string-interpolate>`
//! call is built, and a string with no real interpolation (or exactly one
//! bare `#{e}`) skips the wrapper entirely — there's nothing to concatenate.

use super::*;
use crate::ast::SendFlags;

fn string_literal<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, text: String) -> Expression {
    let n = d.intern(&text);
    Expression::new(loc, ExpressionKind::Literal(LiteralValue::StringLit(n)))
}

fn to_s_call<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, e: Expression) -> Expression {
    let fun = d.intern("to_s");
    Expression::new(loc, ExpressionKind::Send { recv: Box::new(e), fun, args: Vec::new(), block: None, flags: SendFlags::default() })
}

fn top_level_const<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, name: &str) -> Expression {
    let cnst = d.intern(name);
    Expression::new(loc, ExpressionKind::UnresolvedConstantLit { scope: Box::new(Expression::self_expr(loc)), cnst })
}

fn build_interpolated_string<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, parts: &[StringPart]) -> Expression {
    let mut pieces = Vec::new();
    let mut literal_buf = String::new();
    for part in parts {
        match part {
            StringPart::Lit(s) => literal_buf.push_str(s),
            StringPart::Interp(node) => {
                if !literal_buf.is_empty() {
                    pieces.push(string_literal(d, loc, std::mem::take(&mut literal_buf)));
                }
                let inner = d.translate(node);
                pieces.push(to_s_call(d, loc, inner));
            }
        }
    }
    if !literal_buf.is_empty() || pieces.is_empty() {
        pieces.push(string_literal(d, loc, literal_buf));
    }
    if pieces.len() == 1 {
        return pieces.pop().unwrap_or_else(|| crate::errors::internal_error("pieces checked non-empty above"));
    }
    d.magic_send(loc, "<string-interpolate>", pieces)
}

pub(super) fn lower_string<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, parts: &[StringPart]) -> Expression {
    build_interpolated_string(d, loc, parts)
}

/// `:"a#{e}b"`: the same interpolation pipeline, `.intern`ed at the end —
/// unless it turned out there was nothing to interpolate, in which case the
/// already-merged literal's `NameRef` is just relabeled `SymbolLit`.
pub(super) fn lower_symbol_interp<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, parts: &[StringPart]) -> Expression {
    let s = build_interpolated_string(d, loc, parts);
    if let ExpressionKind::Literal(LiteralValue::StringLit(n)) = s.kind {
        return Expression::new(loc, ExpressionKind::Literal(LiteralValue::SymbolLit(n)));
    }
    let fun = d.intern("intern");
    Expression::new(loc, ExpressionKind::Send { recv: Box::new(s), fun, args: Vec::new(), block: None, flags: SendFlags::default() })
}

pub(super) fn lower_regexp<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, parts: &[StringPart], flags: &str) -> Expression {
    let pattern = build_interpolated_string(d, loc, parts);
    let mut bits: i64 = 0;
    if flags.contains('i') {
        bits |= 1;
    }
    if flags.contains('x') {
        bits |= 2;
    }
    if flags.contains('m') {
        bits |= 4;
    }
    let flags_lit = d.int_lit(loc, bits);
    let recv = top_level_const(d, loc, "Regexp");
    let fun = d.intern("new");
    Expression::new(loc, ExpressionKind::Send { recv: Box::new(recv), fun, args: vec![pattern, flags_lit], block: None, flags: SendFlags::default() })
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

    fn interp_node() -> ParseNode {
        ParseNode::new(range(), ParseKind::Ident { kind: IdentKind::Local, name: "e".to_owned() })
    }

    #[test]
    fn literal_only_string_skips_the_wrapper() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let parts = vec![StringPart::Lit("hello".to_owned())];
        let e = lower_string(&mut d, Loc::new(file(), 0, 1), &parts);
        assert!(matches!(e.kind, ExpressionKind::Literal(LiteralValue::StringLit(_))));
    }

    #[test]
    fn interpolated_string_merges_literals_and_wraps_in_magic() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let parts = vec![StringPart::Lit("a".to_owned()), StringPart::Interp(Box::new(interp_node())), StringPart::Lit("b".to_owned())];
        let e = lower_string(&mut d, Loc::new(file(), 0, 1), &parts);
        match e.kind {
            ExpressionKind::Send { fun, args, .. } => {
                assert_eq!(d.gs().names().utf8_str(fun), Some("<string-interpolate>"));
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected Magic Send, got {other:?}"),
        }
    }

    #[test]
    fn symbol_interp_without_interpolation_becomes_plain_symbol_literal() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let parts = vec![StringPart::Lit("sym".to_owned())];
        let e = lower_symbol_interp(&mut d, Loc::new(file(), 0, 1), &parts);
        assert!(matches!(e.kind, ExpressionKind::Literal(LiteralValue::SymbolLit(_))));
    }

    #[test]
    fn regexp_ors_flag_bits() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let parts = vec![StringPart::Lit("pat".to_owned())];
        let e = lower_regexp(&mut d, Loc::new(file(), 0, 1), &parts, "ix");
        match e.kind {
            ExpressionKind::Send { args, .. } => match &args[1].kind {
                ExpressionKind::Literal(LiteralValue::Integer(n)) => assert_eq!(*n, 3),
                other => panic!("expected integer flags, got {other:?}"),
            },
            other => panic!("expected Send, got {other:?}"),
        }
    }
}
