//! The desugar translator: C8 from the design (§4.5).
//!
//! [`Desugarer`] converts one [`ParseNode`] into one typed [`Expression`].
//! Straight one-to-one translations (literals, plain locals, plain `if`)
//! live in this module's dispatcher; every non-trivial rewrite named in
//! §4.5.1-§4.5.10 gets its own submodule, one per surface feature, mirroring
//! how the teacher splits `expressions.rs` (node shapes) from `parse.rs`
//! (tree construction) by concern rather than bundling everything into one
//! file.

mod blocks;
mod builtins;
mod case_when;
mod class_module;
mod compound_assign;
mod hash;
mod multi_assign;
pub mod parse_tree;
mod rescue;
mod send;
mod strings;

pub use parse_tree::{
    Arg, BlockNode, BlockParam, ByteRange, HashEntry, InClause, MlhsItem, ParseKind, ParseNode, PatternNode,
    RescueClauseParse, RescueVarTarget, StringPart, WhenClause,
};

use crate::ast::{ClassKind, Expression, ExpressionKind, IdentKind, LiteralValue, LocalVariable};
use crate::errors::{DiagnosticSink, ErrorKind};
use crate::global_state::GlobalState;
use crate::intern::NameRef;
use crate::loc::{FileRef, Loc};
use crate::symbols::SymbolRef;

/// Owns the mutation of `GlobalState` (the single-writer indexer thread of
/// §5) for the duration of one file's translation, and the diagnostic sink
/// the translator reports through (§6.4).
pub struct Desugarer<'g, S: DiagnosticSink> {
    gs: &'g mut GlobalState,
    file: FileRef,
    sink: &'g mut S,
    temp_counter: u16,
    /// The symbol a nested `ClassDef`/`MethodDef` registers itself under
    /// (§4.2's `enterSymbol(owner, ...)`). Top-level code owns against
    /// `gs.root`; `class_module` saves/restores this around a body's
    /// recursive translation.
    current_owner: SymbolRef,
}

impl<'g, S: DiagnosticSink> Desugarer<'g, S> {
    pub fn new(gs: &'g mut GlobalState, file: FileRef, sink: &'g mut S) -> Self {
        let current_owner = gs.root;
        Self { gs, file, sink, temp_counter: 0, current_owner }
    }

    pub fn gs(&mut self) -> &mut GlobalState {
        self.gs
    }

    fn loc(&self, range: ByteRange) -> Loc {
        Loc::new(self.file, range.begin, range.end)
    }

    fn report(&mut self, loc: Loc, kind: ErrorKind, message: impl Into<String>) {
        self.sink.report(loc, kind, message.into(), Vec::new());
    }

    fn intern(&mut self, s: &str) -> NameRef {
        self.gs.names_mut().enter_utf8(s.as_bytes())
    }

    /// Mints `<tag$N>` as a fresh, never-before-seen local for this
    /// translation unit (§4.5's many `tmp`/`tmpRhs`/`tmpExp`/`acc` temps).
    fn fresh_local(&mut self, tag: &str) -> LocalVariable {
        let original = self.intern(tag);
        self.temp_counter += 1;
        let name = self.gs.next_unique_desugar_name(original, self.temp_counter);
        LocalVariable::new(name)
    }

    fn local_expr(&mut self, loc: Loc, local: LocalVariable) -> Expression {
        Expression::local(loc, local)
    }

    fn assign(&self, loc: Loc, lhs: Expression, rhs: Expression) -> Expression {
        Expression::new(loc, ExpressionKind::Assign { lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    fn magic_symbol(&mut self) -> SymbolRef {
        self.gs
            .bootstrap_class("Magic")
            .unwrap_or_else(|| crate::errors::internal_error("Magic module missing from bootstrap"))
    }

    fn magic_recv(&mut self, loc: Loc) -> Expression {
        let sym = self.magic_symbol();
        Expression::new(loc, ExpressionKind::ConstantLit { sym, original: None })
    }

    /// Builds `Magic.<helper>(args...)` (§4.5 uses this constantly: splat
    /// expansion, hash merges, safe-nav, pattern matching, string
    /// interpolation all lower through one `Magic` pseudo-receiver).
    fn magic_send(&mut self, loc: Loc, helper: &str, args: Vec<Expression>) -> Expression {
        let recv = self.magic_recv(loc);
        let fun = self.intern(helper);
        Expression::new(
            loc,
            ExpressionKind::Send {
                recv: Box::new(recv),
                fun,
                args,
                block: None,
                flags: crate::ast::SendFlags { is_private_ok: true, has_block: false },
            },
        )
    }

    fn int_lit(&mut self, loc: Loc, value: i64) -> Expression {
        Expression::new(loc, ExpressionKind::Literal(LiteralValue::Integer(value)))
    }

    fn send_index(&mut self, loc: Loc, recv: Expression, args: Vec<Expression>) -> Expression {
        let fun = self.intern("[]");
        Expression::new(
            loc,
            ExpressionKind::Send {
                recv: Box::new(recv),
                fun,
                args,
                block: None,
                flags: crate::ast::SendFlags::default(),
            },
        )
    }

    /// Translates a bare statement run (method/`begin` body, top-level
    /// program) into an `InsSeq`. An empty body is `Nil`; a single statement
    /// passes through without wrapping.
    pub fn translate_block(&mut self, loc: Loc, stmts: &[ParseNode]) -> Expression {
        match stmts {
            [] => Expression::new(loc, ExpressionKind::Literal(LiteralValue::Nil)),
            [only] => self.translate(only),
            _ => {
                let mut translated: Vec<Expression> = stmts.iter().map(|s| self.translate(s)).collect();
                let expr = Box::new(translated.pop().unwrap());
                Expression::new(loc, ExpressionKind::InsSeq { stats: translated, expr })
            }
        }
    }

    /// The main dispatcher (§4.5). One node in, one node out; composite
    /// rewrites delegate to their dedicated submodule.
    pub fn translate(&mut self, node: &ParseNode) -> Expression {
        let loc = self.loc(node.range);
        match &node.kind {
            ParseKind::IntLit(text) => match text.parse::<i64>() {
                Ok(v) => Expression::new(loc, ExpressionKind::Literal(LiteralValue::Integer(v))),
                Err(_) => {
                    self.report(loc, ErrorKind::IntegerOutOfRange { text: text.clone() }, format!("integer literal `{text}` out of range"));
                    Expression::empty(loc)
                }
            },
            ParseKind::FloatLit(text) => match text.parse::<f64>() {
                Ok(v) if v.is_finite() => Expression::new(loc, ExpressionKind::Literal(LiteralValue::Float(v))),
                _ => {
                    self.report(loc, ErrorKind::FloatOutOfRange { text: text.clone() }, format!("float literal `{text}` out of range"));
                    Expression::empty(loc)
                }
            },
            ParseKind::StringLit(parts) => strings::lower_string(self, loc, parts),
            ParseKind::SymbolLit(name) => {
                let n = self.intern(name);
                Expression::new(loc, ExpressionKind::Literal(LiteralValue::SymbolLit(n)))
            }
            ParseKind::SymbolInterp(parts) => strings::lower_symbol_interp(self, loc, parts),
            ParseKind::Regexp { parts, flags } => strings::lower_regexp(self, loc, parts, flags),
            ParseKind::NilLit => Expression::new(loc, ExpressionKind::Literal(LiteralValue::Nil)),
            ParseKind::TrueLit => Expression::new(loc, ExpressionKind::Literal(LiteralValue::True)),
            ParseKind::FalseLit => Expression::new(loc, ExpressionKind::Literal(LiteralValue::False)),
            ParseKind::SelfNode => Expression::self_expr(loc),
            ParseKind::Retry => Expression::new(loc, ExpressionKind::Retry),
            ParseKind::ZSuperArgs => Expression::new(loc, ExpressionKind::ZSuperArgs),

            ParseKind::Ident { kind, name } => {
                if *kind == IdentKind::Local {
                    let n = self.intern(name);
                    self.local_expr(loc, LocalVariable::new(n))
                } else {
                    let n = self.intern(name);
                    Expression::new(loc, ExpressionKind::UnresolvedIdent { kind: *kind, name: n })
                }
            }
            ParseKind::ConstRef { scope, name, top_level } => {
                let cnst = self.intern(name);
                let scope_expr = match scope {
                    Some(s) => self.translate(s),
                    None if *top_level => Expression::self_expr(loc),
                    None => Expression::empty(loc),
                };
                Expression::new(loc, ExpressionKind::UnresolvedConstantLit { scope: Box::new(scope_expr), cnst })
            }

            ParseKind::Assign { lhs, rhs } => {
                let is_const = matches!(lhs.kind, ParseKind::ConstRef { .. });
                let rhs_e = self.translate(rhs);
                if is_const {
                    class_module::lower_const_assign(self, loc, lhs, rhs_e)
                } else {
                    let lhs_e = self.translate(lhs);
                    self.assign(loc, lhs_e, rhs_e)
                }
            }
            ParseKind::MultiAssign { items, rhs } => multi_assign::lower_multi_assign(self, loc, items, rhs),
            ParseKind::OpAssign { lhs, op, rhs } => compound_assign::lower_op_assign(self, loc, lhs, op, rhs),

            ParseKind::Send { recv, name, args, block, safe_nav } => {
                send::lower_send(self, loc, recv.as_deref(), name, args, block.as_ref(), *safe_nav)
            }

            ParseKind::HashLit(entries) => hash::lower_hash_literal(self, loc, entries),
            ParseKind::ArrayLit(args) => {
                if args.iter().any(|a| matches!(a, Arg::Splat(_) | Arg::AnonSplat)) {
                    send::lower_array_with_splat(self, loc, args)
                } else {
                    let elems = args
                        .iter()
                        .map(|a| match a {
                            Arg::Plain(n) => self.translate(n),
                            _ => Expression::empty(loc),
                        })
                        .collect();
                    Expression::new(loc, ExpressionKind::Array(elems))
                }
            }

            ParseKind::If { cond, then_, else_ } => {
                let cond_e = self.translate(cond);
                let then_e = self.translate(then_);
                let else_e = match else_ {
                    Some(e) => self.translate(e),
                    None => Expression::new(loc, ExpressionKind::Literal(LiteralValue::Nil)),
                };
                Expression::new(loc, ExpressionKind::If { cond: Box::new(cond_e), then_: Box::new(then_e), else_: Box::new(else_e) })
            }
            ParseKind::While { cond, body, until } => {
                let mut cond_e = self.translate(cond);
                if *until {
                    cond_e = self.negate(loc, cond_e);
                }
                let body_e = self.translate(body);
                Expression::new(loc, ExpressionKind::While { cond: Box::new(cond_e), body: Box::new(body_e) })
            }
            ParseKind::Break(e) => {
                let inner = self.translate_opt(loc, e.as_deref());
                Expression::new(loc, ExpressionKind::Break(Box::new(inner)))
            }
            ParseKind::Next(e) => {
                let inner = self.translate_opt(loc, e.as_deref());
                Expression::new(loc, ExpressionKind::Next(Box::new(inner)))
            }
            ParseKind::Return(e) => {
                let inner = self.translate_opt(loc, e.as_deref());
                Expression::new(loc, ExpressionKind::Return(Box::new(inner)))
            }

            ParseKind::CaseWhen { subject, whens, else_ } => {
                case_when::lower_case_when(self, loc, subject.as_deref(), whens, else_.as_deref())
            }
            ParseKind::CaseIn { subject, clauses, else_ } => {
                case_when::lower_case_in(self, loc, subject, clauses, else_.as_deref())
            }

            ParseKind::BeginRescue { body, rescues, else_, ensure_ } => {
                rescue::lower_begin_rescue(self, loc, body, rescues, else_.as_deref(), ensure_.as_deref())
            }

            ParseKind::ClassDef { name, superclass, body } => {
                class_module::lower_class_def(self, loc, name, superclass.as_deref(), body)
            }
            ParseKind::ModuleDef { name, body } => class_module::lower_module_def(self, loc, name, body),
            ParseKind::SingletonClassDef { receiver, body } => {
                class_module::lower_singleton_class_def(self, loc, receiver, body)
            }
            ParseKind::MethodDef { name, params, body, is_self_method } => {
                class_module::lower_method_def(self, loc, name, params, body, *is_self_method)
            }

            ParseKind::Defined(inner) => builtins::lower_defined(self, loc, inner),
            ParseKind::CurrentFile => builtins::lower_current_file(self, loc),
            ParseKind::CurrentLine => builtins::lower_current_line(self, loc),
            ParseKind::CurrentEncoding => builtins::lower_current_encoding(self, loc),

            ParseKind::Block(stmts) => self.translate_block(loc, stmts),

            ParseKind::Unknown(tag) => {
                self.report(loc, ErrorKind::UnsupportedNode { node_kind: tag.clone() }, format!("unsupported node: {tag}"));
                Expression::empty(loc)
            }
        }
    }

    fn translate_opt(&mut self, loc: Loc, node: Option<&ParseNode>) -> Expression {
        match node {
            Some(n) => self.translate(n),
            None => Expression::new(loc, ExpressionKind::Literal(LiteralValue::Nil)),
        }
    }

    /// `!expr`, used for `until` and a couple of compound-assignment rewrites.
    fn negate(&mut self, loc: Loc, expr: Expression) -> Expression {
        let fun = self.intern("!");
        Expression::new(
            loc,
            ExpressionKind::Send {
                recv: Box::new(expr),
                fun,
                args: Vec::new(),
                block: None,
                flags: crate::ast::SendFlags::default(),
            },
        )
    }
}
