//! Expression evaluation boundary
//!
//! Placeholder contents and annotation payloads are opaque expressions to the
//! engine. They go through an [`Evaluator`], which resolves variables and
//! function calls against an [`ExpressionContext`]. [`PathEvaluator`] is a
//! small reference language; callers may plug in their own.

mod evaluator;
pub mod lexer;
mod value;

pub use evaluator::{DataContext, Evaluator, ExpressionContext, PathEvaluator};
pub use value::Value;
