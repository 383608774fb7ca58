//! Hash literal lowering (§4.5.2).
//!
//! A splat-free hash literal just becomes a plain [`ExpressionKind::Hash`],
//! after a duplicate-key scan. A literal keyword or key is only checkable
//! when it's a bare symbol or a single-part string — computed keys opt out,
//! matching `DuplicateHashKeyCheck.cc`'s own "can we resolve this key to a
//! literal" gate. Splats break the contiguous run: the original value could
//! supply any key, so the scan resets rather than risk a false positive.

use std::collections::HashMap;

use super::*;
use crate::errors::ErrorKind;

pub(super) fn lower_hash_literal<S: DiagnosticSink>(d: &mut Desugarer<S>, loc: Loc, entries: &[HashEntry]) -> Expression {
    check_duplicate_keys(d, entries);

    if !entries.iter().any(|e| matches!(e, HashEntry::Splat(_))) {
        let mut keys = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for e in entries {
            if let HashEntry::Pair { key, value } = e {
                keys.push(d.translate(key));
                values.push(d.translate(value));
            }
        }
        return Expression::new(loc, ExpressionKind::Hash { keys, values });
    }

    let mut acc: Option<Expression> = None;
    let mut pending_keys = Vec::new();
    let mut pending_values = Vec::new();

    for e in entries {
        match e {
            HashEntry::Pair { key, value } => {
                pending_keys.push(d.translate(key));
                pending_values.push(d.translate(value));
            }
            HashEntry::Splat(node) => {
                acc = flush_pairs(d, loc, acc, &mut pending_keys, &mut pending_values);
                let splat_e = d.translate(node);
                acc = Some(match acc {
                    None => d.magic_send(loc, "<to-hash-dup>", vec![splat_e]),
                    Some(prev) => {
                        let wrapped = d.magic_send(loc, "<to-hash-nodup>", vec![splat_e]);
                        d.magic_send(loc, "<merge-hash>", vec![prev, wrapped])
                    }
                });
            }
        }
    }
    acc = flush_pairs(d, loc, acc, &mut pending_keys, &mut pending_values);
    acc.unwrap_or_else(|| Expression::new(loc, ExpressionKind::Hash { keys: Vec::new(), values: Vec::new() }))
}

/// Folds any pending literal pairs into `acc` as one merge step. Returns
/// `acc` unchanged (including `None`) when there's nothing pending, so a
/// caller can tell "nothing has been merged yet" from "something has."
fn flush_pairs<S: DiagnosticSink>(
    d: &mut Desugarer<S>,
    loc: Loc,
    acc: Option<Expression>,
    keys: &mut Vec<Expression>,
    values: &mut Vec<Expression>,
) -> Option<Expression> {
    if keys.is_empty() {
        return acc;
    }
    let chunk = Expression::new(loc, ExpressionKind::Hash { keys: std::mem::take(keys), values: std::mem::take(values) });
    Some(match acc {
        None => d.magic_send(loc, "<to-hash-dup>", vec![chunk]),
        Some(prev) => {
            let ExpressionKind::Hash { keys: k, values: v } = chunk.kind else {
                crate::errors::internal_error("flush_pairs always builds a Hash chunk")
            };
            let mut margs = vec![prev];
            for (key, value) in k.into_iter().zip(v) {
                margs.push(key);
                margs.push(value);
            }
            d.magic_send(loc, "<merge-hash-values>", margs)
        }
    })
}

fn check_duplicate_keys<S: DiagnosticSink>(d: &mut Desugarer<S>, entries: &[HashEntry]) {
    let mut seen_symbols: HashMap<String, Loc> = HashMap::new();
    let mut seen_strings: HashMap<String, Loc> = HashMap::new();
    for entry in entries {
        let HashEntry::Pair { key, .. } = entry else {
            seen_symbols.clear();
            seen_strings.clear();
            continue;
        };
        let key_loc = d.loc(key.range);
        match &key.kind {
            ParseKind::SymbolLit(s) => record_key(d, &mut seen_symbols, s.clone(), key_loc),
            ParseKind::StringLit(parts) => {
                if let [StringPart::Lit(s)] = parts.as_slice() {
                    record_key(d, &mut seen_strings, s.clone(), key_loc);
                }
            }
            _ => {}
        }
    }
}

fn record_key<S: DiagnosticSink>(d: &mut Desugarer<S>, seen: &mut HashMap<String, Loc>, text: String, loc: Loc) {
    if let Some(&first) = seen.get(&text) {
        d.report(loc, ErrorKind::DuplicatedHashKeys { key: text.clone(), first_loc: first }, format!("duplicated hash key `{text}`"));
    } else {
        seen.insert(text, loc);
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

    fn sym_key(s: &str) -> ParseNode {
        ParseNode::new(range(), ParseKind::SymbolLit(s.to_owned()))
    }

    fn int_val(v: i64) -> ParseNode {
        ParseNode::new(range(), ParseKind::IntLit(v.to_string()))
    }

    #[test]
    fn splat_free_hash_is_a_plain_literal() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let entries = vec![HashEntry::Pair { key: sym_key("a"), value: int_val(1) }];
        let e = lower_hash_literal(&mut d, Loc::new(file(), 0, 1), &entries);
        assert!(matches!(e.kind, ExpressionKind::Hash { .. }));
    }

    #[test]
    fn duplicate_symbol_keys_are_reported_once() {
        let mut gs = GlobalState::new();
        let mut sink = CollectingSink::new();
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let entries = vec![
            HashEntry::Pair { key: sym_key("a"), value: int_val(1) },
            HashEntry::Pair { key: sym_key("a"), value: int_val(2) },
        ];
        let _ = lower_hash_literal(&mut d, Loc::new(file(), 0, 1), &entries);
        assert_eq!(sink.diagnostics().len(), 1);
        assert!(matches!(sink.diagnostics()[0].kind, ErrorKind::DuplicatedHashKeys { .. }));
    }

    #[test]
    fn leading_pairs_then_splat_lowers_to_dup_then_merge_with_nodup() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let entries = vec![
            HashEntry::Pair { key: sym_key("a"), value: int_val(1) },
            HashEntry::Splat(ParseNode::new(range(), ParseKind::Ident { kind: IdentKind::Local, name: "rest".to_owned() })),
        ];
        let e = lower_hash_literal(&mut d, Loc::new(file(), 0, 1), &entries);
        match e.kind {
            ExpressionKind::Send { fun, args, .. } => {
                assert_eq!(d.gs().names().utf8_str(fun), Some("<merge-hash>"));
                let [first, second] = args.as_slice() else { panic!("expected exactly 2 args to <merge-hash>") };
                // first arg: the flushed leading pair, wrapped in <to-hash-dup>
                match &first.kind {
                    ExpressionKind::Send { fun, args, .. } => {
                        assert_eq!(d.gs().names().utf8_str(*fun), Some("<to-hash-dup>"));
                        assert!(matches!(args[0].kind, ExpressionKind::Hash { .. }));
                    }
                    other => panic!("expected <to-hash-dup> Send, got {other:?}"),
                }
                // second arg: the splat's own expression, wrapped in <to-hash-nodup>
                match &second.kind {
                    ExpressionKind::Send { fun, args, .. } => {
                        assert_eq!(d.gs().names().utf8_str(*fun), Some("<to-hash-nodup>"));
                        assert!(matches!(args[0].kind, ExpressionKind::Local(_)));
                    }
                    other => panic!("expected <to-hash-nodup> Send, got {other:?}"),
                }
            }
            other => panic!("expected Magic merge Send, got {other:?}"),
        }
    }

    #[test]
    fn leading_splat_alone_lowers_to_a_bare_to_hash_dup() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let entries = vec![HashEntry::Splat(ParseNode::new(range(), ParseKind::Ident { kind: IdentKind::Local, name: "rest".to_owned() }))];
        let e = lower_hash_literal(&mut d, Loc::new(file(), 0, 1), &entries);
        match e.kind {
            ExpressionKind::Send { fun, args, .. } => {
                assert_eq!(d.gs().names().utf8_str(fun), Some("<to-hash-dup>"));
                assert!(matches!(args[0].kind, ExpressionKind::Local(_)));
            }
            other => panic!("expected <to-hash-dup> Send, got {other:?}"),
        }
    }

    #[test]
    fn two_splats_back_to_back_both_merge_through_nodup() {
        let mut gs = GlobalState::new();
        let mut sink = NoopSink;
        let mut d = Desugarer::new(&mut gs, file(), &mut sink);
        let entries = vec![
            HashEntry::Splat(ParseNode::new(range(), ParseKind::Ident { kind: IdentKind::Local, name: "a".to_owned() })),
            HashEntry::Splat(ParseNode::new(range(), ParseKind::Ident { kind: IdentKind::Local, name: "b".to_owned() })),
        ];
        let e = lower_hash_literal(&mut d, Loc::new(file(), 0, 1), &entries);
        match e.kind {
            ExpressionKind::Send { fun, args, .. } => {
                assert_eq!(d.gs().names().utf8_str(fun), Some("<merge-hash>"));
                let [first, second] = args.as_slice() else { panic!("expected exactly 2 args to <merge-hash>") };
                assert!(matches!(&first.kind, ExpressionKind::Send { fun, .. } if d.gs().names().utf8_str(*fun) == Some("<to-hash-dup>")));
                assert!(matches!(&second.kind, ExpressionKind::Send { fun, .. } if d.gs().names().utf8_str(*fun) == Some("<to-hash-nodup>")));
            }
            other => panic!("expected Magic merge Send, got {other:?}"),
        }
    }
}
