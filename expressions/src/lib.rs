//! Arithmetic expressions over integers with `+`, `-`, `x` and `÷`.
//!
//! Two independent ways in:
//! - `parser::parse` scans and evaluates source text directly;
//! - the combinators in `expr` (`val`, `sum`, `sub`, `mul`, `div`) build a
//!   `Node` tree which can be evaluated with `result` and printed fully
//!   parenthesized.

pub mod expr;
pub mod lexer;
pub mod parser;
pub mod token;

pub use expr::{div, mul, sub, sum, val, Node};
pub use parser::{parse, parse_tree, Parser};
