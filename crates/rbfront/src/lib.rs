#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked")]
#![expect(clippy::cast_possible_wrap, reason = "byte offsets stay well under i64::MAX")]
#![expect(clippy::too_many_arguments, reason = "AST builder signatures mirror the grammar shapes")]
#![expect(clippy::type_complexity, reason = "some node-shape tuples are intentionally rich")]

pub mod ast;
pub mod counters;
pub mod desugar;
pub mod errors;
pub mod global_state;
pub mod intern;
pub mod loc;
pub mod symbols;

pub use crate::{
    ast::{Expression, ExpressionKind},
    desugar::Desugarer,
    errors::{DiagnosticSink, ErrorKind},
    global_state::GlobalState,
};
