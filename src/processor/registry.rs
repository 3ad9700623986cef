//! Static operation table for registered processors

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::document::Document;
use crate::error::EvaluationError;
use crate::expression::{ExpressionContext, Value};
use crate::StampError;

use super::{CallSite, OperationScope, Processor, ProcessorContext};

/// Errors that can occur while registering processors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two operations share a name and arity
    #[error("duplicate operation: {name} with {arity} argument(s)")]
    Duplicate { name: String, arity: usize },
}

/// Where a (name, arity) pair dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub processor: usize,
    pub scope: OperationScope,
}

/// Registered processors and their operation table
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: Vec<Box<dyn Processor>>,
    operations: HashMap<(String, usize), Dispatch>,
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("processors", &self.processors.len())
            .field("operations", &self.signatures())
            .finish()
    }
}

impl ProcessorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor and all of its operations
    ///
    /// Nothing is registered when any operation collides with an existing
    /// one or with another operation of the same processor.
    pub fn register(&mut self, processor: Box<dyn Processor>) -> Result<(), RegistryError> {
        let index = self.processors.len();
        let mut added: HashMap<(String, usize), Dispatch> = HashMap::new();

        for op in processor.operations() {
            let key = (op.name, op.arity);
            if self.operations.contains_key(&key) || added.contains_key(&key) {
                return Err(RegistryError::Duplicate {
                    name: key.0,
                    arity: key.1,
                });
            }
            added.insert(
                key,
                Dispatch {
                    processor: index,
                    scope: op.scope,
                },
            );
        }

        debug!(processor = index, operations = added.len(), "registered processor");
        self.operations.extend(added);
        self.processors.push(processor);
        Ok(())
    }

    pub fn lookup(&self, name: &str, arity: usize) -> Option<Dispatch> {
        self.operations.get(&(name.to_string(), arity)).copied()
    }

    /// Number of registered processors
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// All (name, arity) pairs, sorted
    pub fn signatures(&self) -> Vec<(String, usize)> {
        let mut keys: Vec<_> = self.operations.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Flush every processor's buffered changes into the document
    pub fn commit(&mut self, doc: &mut Document) -> Result<(), StampError> {
        for processor in &mut self.processors {
            processor.commit(doc)?;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        for processor in &mut self.processors {
            processor.reset();
        }
    }

    fn invoke(
        &mut self,
        dispatch: Dispatch,
        operation: &str,
        args: &[Value],
        context: &ProcessorContext<'_>,
        doc: &Document,
    ) -> Result<Value, EvaluationError> {
        match self.processors.get_mut(dispatch.processor) {
            Some(processor) => processor.invoke(operation, args, context, doc),
            None => Err(EvaluationError::unknown_function(operation, args.len())),
        }
    }
}

/// Expression context for one processor invocation
///
/// Variables come from the caller's data; function calls go through the
/// registry, restricted to operations allowed at the call site.
pub struct ProcessorCall<'a> {
    registry: &'a mut ProcessorRegistry,
    data: &'a Value,
    doc: &'a Document,
    context: ProcessorContext<'a>,
    site: CallSite,
    calls: usize,
}

impl<'a> ProcessorCall<'a> {
    pub fn new(
        registry: &'a mut ProcessorRegistry,
        data: &'a Value,
        doc: &'a Document,
        context: ProcessorContext<'a>,
        site: CallSite,
    ) -> Self {
        Self {
            registry,
            data,
            doc,
            context,
            site,
            calls: 0,
        }
    }

    /// Number of operations dispatched so far
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ExpressionContext for ProcessorCall<'_> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.data.get(name).cloned()
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, EvaluationError> {
        let arity = args.len();
        let dispatch = self
            .registry
            .lookup(name, arity)
            .filter(|d| d.scope.allows(self.site))
            .ok_or_else(|| EvaluationError::unknown_function(name, arity))?;

        debug!(operation = name, arity, site = ?self.site, "dispatching operation");
        self.calls += 1;
        self.registry
            .invoke(dispatch, name, &args, &self.context, self.doc)
    }
}
