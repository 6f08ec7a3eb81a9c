//! Build constraint language: `//go:build` expressions and legacy
//! `// +build` lines.

mod expression;
mod parser;

pub use expression::ConstraintExpr;
pub use parser::{is_go_build, is_plus_build, ConstraintParser, SyntaxError};
