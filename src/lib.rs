//! docstamp - Template stamping for word-processing documents
//!
//! This library resolves `${...}` placeholders and runs annotation-attached
//! processors over an in-memory document tree. Placeholders may be split
//! across any number of runs; replacements keep the formatting of the text
//! around them.
//!
//! # Example
//!
//! ```rust
//! use docstamp::{stamp, Document, Value};
//!
//! let mut doc = Document::new();
//! let body = doc.body();
//! let paragraph = doc.add_paragraph_with_runs(body, &["Hello ${na", "me}!"]);
//!
//! let data = Value::map([("name", "World")]);
//! stamp(&mut doc, &data).unwrap();
//! assert_eq!(doc.text(body), "Hello World!");
//! # let _ = paragraph;
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod expression;
pub mod placeholder;
pub mod processor;
pub mod scope;
pub mod text;

pub use config::{ConfigError, StampConfig};
pub use document::{Annotation, AnnotationId, Document, NodeId, NodeKind, PartKind, Run};
pub use engine::{Engine, StampReport};
pub use error::{EvaluationError, LookupError, StructuralError};
pub use expression::{Evaluator, ExpressionContext, PathEvaluator, Value};
pub use placeholder::{Delimiters, Placeholder, PlaceholderStyle};
pub use processor::{
    FailurePolicy, FailureResolver, Operation, Processor, ProcessorContext, RegistryError,
    ValueResolver,
};
pub use scope::{build_scopes, OrphanAnnotation, Scope, ScopeForest};

use thiserror::Error;

/// Errors that can occur while stamping a document
#[derive(Debug, Error)]
pub enum StampError {
    /// Malformed annotation nesting
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// An expression failed and the failure resolver chose to raise
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// A value no resolver could turn into text
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Stamp a document with default configuration and no processors
///
/// Every part is processed; `${...}` placeholders are replaced by the values
/// they evaluate to in `data`.
pub fn stamp(doc: &mut Document, data: &Value) -> Result<StampReport, StampError> {
    Engine::default().stamp(doc, data)
}

/// Stamp a document with a custom configuration
///
/// # Example
///
/// ```rust
/// use docstamp::{stamp_with_config, Document, FailurePolicy, StampConfig, Value};
///
/// let mut doc = Document::new();
/// let body = doc.body();
/// doc.add_paragraph_with_runs(body, &["Dear ${title} ${name}"]);
///
/// let config = StampConfig::new().with_failure_policy(FailurePolicy::Leave);
/// stamp_with_config(&mut doc, &Value::map([("name", "Ada")]), config).unwrap();
/// assert_eq!(doc.text(body), "Dear ${title} Ada");
/// ```
pub fn stamp_with_config(
    doc: &mut Document,
    data: &Value,
    config: StampConfig,
) -> Result<StampReport, StampError> {
    Engine::new(config)?.stamp(doc, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_simple() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.add_paragraph_with_runs(body, &["Hello ${name}!"]);
        let report = stamp(&mut doc, &Value::map([("name", "World")])).unwrap();
        assert_eq!(doc.text(body), "Hello World!");
        assert_eq!(report.placeholders_resolved, 1);
    }

    #[test]
    fn test_stamp_missing_variable_raises_by_default() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.add_paragraph_with_runs(body, &["${missing}"]);
        let err = stamp(&mut doc, &Value::Null).unwrap_err();
        assert!(matches!(err, StampError::Evaluation(_)));
        assert!(err.to_string().starts_with("evaluation error: unknown variable"));
    }

    #[test]
    fn test_stamp_with_invalid_config() {
        let mut doc = Document::new();
        let config = StampConfig::new().with_value_delimiters(Delimiters::new("", "}"));
        let err = stamp_with_config(&mut doc, &Value::Null, config).unwrap_err();
        assert!(matches!(err, StampError::Config(_)));
    }

    #[test]
    fn test_structural_error_propagates() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.add_paragraph(body);
        doc.add_annotation_start(p, AnnotationId(1));
        doc.add_annotation_end(p, AnnotationId(2));
        let err = stamp(&mut doc, &Value::Null).unwrap_err();
        assert!(matches!(
            err,
            StampError::Structural(StructuralError::EndBeforeStart { .. })
        ));
    }
}
