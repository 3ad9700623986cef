//! What to do when an expression fails to evaluate

use serde::Deserialize;

use crate::document::AnnotationId;
use crate::error::EvaluationError;
use crate::placeholder::Placeholder;

/// A failed evaluation, as seen by a [`FailureResolver`]
#[derive(Debug, Clone, Copy)]
pub struct Failure<'a> {
    pub placeholder: &'a Placeholder,
    /// The annotation whose payload failed, if any
    pub scope: Option<AnnotationId>,
    pub error: &'a EvaluationError,
}

/// Decision taken for one failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Abort processing with the evaluation error
    Raise,
    /// Leave the placeholder or annotation untouched
    Leave,
    /// Replace the placeholder with this text
    Substitute(String),
}

/// Decides the fate of failed evaluations
pub trait FailureResolver {
    fn resolve(&mut self, failure: &Failure<'_>) -> FailureOutcome;
}

/// Fixed failure handling, selectable from configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Throw,
    Leave,
    Substitute(String),
}

impl FailureResolver for FailurePolicy {
    fn resolve(&mut self, _failure: &Failure<'_>) -> FailureOutcome {
        match self {
            FailurePolicy::Throw => FailureOutcome::Raise,
            FailurePolicy::Leave => FailureOutcome::Leave,
            FailurePolicy::Substitute(text) => FailureOutcome::Substitute(text.clone()),
        }
    }
}
