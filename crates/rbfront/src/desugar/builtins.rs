//! Built-in pseudo-constants and `defined?` (§4.5.10).

use super::*;

fn string_lit<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, text: &str) -> Expression {
    let n = d.intern(text);
    Expression::new(loc, ExpressionKind::Literal(LiteralValue::StringLit(n)))
}

/// Flattens a `ConstRef` scope chain (`A::B::C`) into its segment names,
/// outermost first. Returns `None` for anything that isn't a pure constant
/// chain (e.g. a dynamic `recv::CONST`).
fn collect_const_chain(node: &ParseNode) -> Option<(Vec<String>, bool)> {
    match &node.kind {
        ParseKind::ConstRef { scope: None, name, top_level } => Some((vec![name.clone()], *top_level)),
        ParseKind::ConstRef { scope: Some(scope), name, .. } => {
            let (mut names, root_top_level) = collect_const_chain(scope)?;
            names.push(name.clone());
            Some((names, root_top_level))
        }
        _ => None,
    }
}

pub(super) fn lower_defined<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, inner: &ParseNode) -> Expression {
    if let Some((names, top_level)) = collect_const_chain(inner) {
        return if top_level {
            d.magic_send(loc, "<defined?>", Vec::new())
        } else {
            let args = names.iter().map(|n| string_lit(d, loc, n)).collect();
            d.magic_send(loc, "<defined?>", args)
        };
    }

    match &inner.kind {
        ParseKind::Ident { kind: IdentKind::Instance, name } => {
            let arg = string_lit(d, loc, name);
            d.magic_send(loc, "<defined-ivar>", vec![arg])
        }
        ParseKind::Ident { kind: IdentKind::Class, name } => {
            let arg = string_lit(d, loc, name);
            d.magic_send(loc, "<defined-cvar>", vec![arg])
        }
        _ => d.magic_send(loc, "<defined?>", Vec::new()),
    }
}

pub(super) fn lower_current_file<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc) -> Expression {
    let path = d.gs.file(d.file).path().to_owned();
    string_lit(d, loc, &path)
}

pub(super) fn lower_current_line<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc) -> Expression {
    let (line, _col) = d.gs.file(d.file).offset_to_pos(loc.begin);
    d.int_lit(loc, line as i64)
}

pub(super) fn lower_current_encoding<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc) -> Expression {
    d.magic_send(loc, "<get-encoding>", Vec::new())
}
