//! Processor plugins and the resolvers around them
//!
//! A processor declares the operations it offers. The engine evaluates the
//! payload of an annotation (or the content of a `#{...}` placeholder) and
//! every function call in that expression is dispatched to the processor
//! registered for the (name, arity) pair. Processors only read the document
//! during evaluation; structural edits are buffered and applied in
//! [`Processor::commit`].

mod failure;
mod registry;
mod resolver;

pub use failure::{Failure, FailureOutcome, FailurePolicy, FailureResolver};
pub use registry::{Dispatch, ProcessorCall, ProcessorRegistry, RegistryError};
pub use resolver::{
    BoolResolver, NullResolver, NumberResolver, ResolverChain, StringResolver, ValueResolver,
};

use crate::document::{Document, NodeId};
use crate::error::EvaluationError;
use crate::expression::Value;
use crate::placeholder::Placeholder;
use crate::scope::Scope;
use crate::StampError;

/// Where an operation may be called from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationScope {
    /// Annotation payloads only
    Annotation,
    /// `#{...}` inline placeholders only
    Inline,
    Any,
}

/// The kind of site an expression is evaluated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    Annotation,
    Inline,
}

impl OperationScope {
    pub fn allows(self, site: CallSite) -> bool {
        matches!(
            (self, site),
            (OperationScope::Any, _)
                | (OperationScope::Annotation, CallSite::Annotation)
                | (OperationScope::Inline, CallSite::Inline)
        )
    }
}

/// An operation a processor offers to expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub arity: usize,
    pub scope: OperationScope,
}

impl Operation {
    /// An operation callable from both annotations and inline placeholders
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            scope: OperationScope::Any,
        }
    }

    pub fn annotation_only(mut self) -> Self {
        self.scope = OperationScope::Annotation;
        self
    }

    pub fn inline_only(mut self) -> Self {
        self.scope = OperationScope::Inline;
        self
    }
}

/// Arguments of a single processor invocation
#[derive(Debug, Clone, Copy)]
pub struct ProcessorContext<'a> {
    pub paragraph: NodeId,
    /// The run a run-scoped annotation encloses; `None` for paragraph and inline calls
    pub run: Option<NodeId>,
    /// The annotation being processed; `None` for inline calls
    pub scope: Option<&'a Scope>,
    pub placeholder: &'a Placeholder,
}

/// A pluggable document transformation
pub trait Processor {
    /// Operations exposed to expressions; read once at registration
    fn operations(&self) -> Vec<Operation>;

    /// Run `operation`, buffering any structural change for [`Processor::commit`]
    fn invoke(
        &mut self,
        operation: &str,
        args: &[Value],
        context: &ProcessorContext<'_>,
        doc: &Document,
    ) -> Result<Value, EvaluationError>;

    /// Apply buffered changes to the document
    fn commit(&mut self, _doc: &mut Document) -> Result<(), StampError> {
        Ok(())
    }

    /// Drop all per-invocation state
    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_scope_allows() {
        assert!(OperationScope::Any.allows(CallSite::Inline));
        assert!(OperationScope::Any.allows(CallSite::Annotation));
        assert!(OperationScope::Annotation.allows(CallSite::Annotation));
        assert!(!OperationScope::Annotation.allows(CallSite::Inline));
        assert!(!OperationScope::Inline.allows(CallSite::Annotation));
    }

    #[test]
    fn test_operation_builders() {
        let op = Operation::new("repeat", 1).annotation_only();
        assert_eq!(op.scope, OperationScope::Annotation);
        assert_eq!(Operation::new("x", 0).inline_only().scope, OperationScope::Inline);
    }
}
