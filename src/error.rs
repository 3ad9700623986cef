//! Error types for scope building, evaluation and value lookup

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::document::AnnotationId;
use crate::expression::lexer::Span;

/// Malformed annotation nesting in a document part
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// An end anchor appeared for an annotation that was never started
    #[error("annotation {id} ends before it starts")]
    EndBeforeStart { id: AnnotationId },

    /// An end anchor does not close the innermost open annotation
    #[error("ambiguous containment: annotation {id} ends while {} is still open", open_display(.open))]
    AmbiguousContainment {
        id: AnnotationId,
        open: Option<AnnotationId>,
    },
}

fn open_display(open: &Option<AnnotationId>) -> String {
    match open {
        Some(id) => format!("annotation {}", id),
        None => "no annotation".to_string(),
    }
}

impl StructuralError {
    pub fn end_before_start(id: AnnotationId) -> Self {
        Self::EndBeforeStart { id }
    }

    pub fn ambiguous(id: AnnotationId, open: Option<AnnotationId>) -> Self {
        Self::AmbiguousContainment { id, open }
    }

    /// The annotation whose end anchor triggered the error
    pub fn annotation(&self) -> AnnotationId {
        match self {
            Self::EndBeforeStart { id } | Self::AmbiguousContainment { id, .. } => *id,
        }
    }
}

/// Failure to evaluate a placeholder or annotation expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    /// The expression text could not be parsed
    #[error("syntax error in '{expression}' at {span:?}: {message}")]
    Syntax {
        expression: String,
        span: Span,
        message: String,
    },

    /// A root variable is not present in the data context
    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    /// Member access on a value that has no such member
    #[error("'{member}' is not a member of {kind} value")]
    UnknownMember { member: String, kind: &'static str },

    /// No operation with this name and arity is registered for the call site
    #[error("no function '{name}' taking {arity} argument(s)")]
    UnknownFunction { name: String, arity: usize },

    /// A processor operation rejected its arguments or failed
    #[error("{operation} failed: {message}")]
    Processor { operation: String, message: String },
}

impl EvaluationError {
    pub fn syntax(
        expression: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self::Syntax {
            expression: expression.into(),
            span,
            message: message.into(),
        }
    }

    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Self::UnknownVariable { name: name.into() }
    }

    pub fn unknown_function(name: impl Into<String>, arity: usize) -> Self {
        Self::UnknownFunction {
            name: name.into(),
            arity,
        }
    }

    pub fn processor(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Processor {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl EvaluationError {
    /// Format the error with the expression as source context using ariadne
    ///
    /// Only syntax errors carry a span; every other variant formats as its
    /// display text.
    pub fn format(&self, placeholder: &str) -> String {
        let Self::Syntax {
            expression,
            span,
            message,
        } = self
        else {
            return self.to_string();
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, placeholder, span.start)
            .with_message(message)
            .with_label(
                Label::new((placeholder, span.clone()))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((placeholder, Source::from(expression.as_str())), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// No value resolver accepted a resolved value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no value resolver for {kind} value of placeholder '{placeholder}'")]
pub struct LookupError {
    pub kind: &'static str,
    pub placeholder: String,
}
