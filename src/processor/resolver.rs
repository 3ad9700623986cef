//! Value resolvers: turning evaluated values into runs

use crate::document::Run;
use crate::error::LookupError;
use crate::expression::Value;
use crate::placeholder::Placeholder;

/// Maps a value to the run that replaces its placeholder
///
/// Returning `None` passes the value on to the next resolver in the chain.
pub trait ValueResolver {
    fn resolve(&self, value: &Value, placeholder: &Placeholder) -> Option<Run>;
}

impl<F> ValueResolver for F
where
    F: Fn(&Value, &Placeholder) -> Option<Run>,
{
    fn resolve(&self, value: &Value, placeholder: &Placeholder) -> Option<Run> {
        self(value, placeholder)
    }
}

/// Null values become a fixed replacement text
#[derive(Debug, Clone, Default)]
pub struct NullResolver {
    pub replacement: String,
}

impl ValueResolver for NullResolver {
    fn resolve(&self, value: &Value, _placeholder: &Placeholder) -> Option<Run> {
        value.is_null().then(|| Run::new(self.replacement.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringResolver;

impl ValueResolver for StringResolver {
    fn resolve(&self, value: &Value, _placeholder: &Placeholder) -> Option<Run> {
        value.as_str().map(Run::new)
    }
}

/// Integers and floats, in their display form
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberResolver;

impl ValueResolver for NumberResolver {
    fn resolve(&self, value: &Value, _placeholder: &Placeholder) -> Option<Run> {
        match value {
            Value::Integer(_) | Value::Float(_) => Some(Run::new(value.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoolResolver;

impl ValueResolver for BoolResolver {
    fn resolve(&self, value: &Value, _placeholder: &Placeholder) -> Option<Run> {
        value.as_bool().map(|b| Run::new(b.to_string()))
    }
}

/// Ordered resolver chain; the first resolver returning a run wins
///
/// Custom resolvers are consulted before the defaults, in the order they
/// were added.
pub struct ResolverChain {
    custom: Vec<Box<dyn ValueResolver>>,
    defaults: Vec<Box<dyn ValueResolver>>,
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::new("")
    }
}

impl std::fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverChain")
            .field("custom", &self.custom.len())
            .field("defaults", &self.defaults.len())
            .finish()
    }
}

impl ResolverChain {
    /// Default chain: null, string, number, bool
    pub fn new(null_replacement: impl Into<String>) -> Self {
        Self {
            custom: Vec::new(),
            defaults: vec![
                Box::new(NullResolver {
                    replacement: null_replacement.into(),
                }),
                Box::new(StringResolver),
                Box::new(NumberResolver),
                Box::new(BoolResolver),
            ],
        }
    }

    /// Add a resolver ahead of the defaults
    pub fn push(&mut self, resolver: Box<dyn ValueResolver>) {
        self.custom.push(resolver);
    }

    pub fn resolve(&self, value: &Value, placeholder: &Placeholder) -> Result<Run, LookupError> {
        self.custom
            .iter()
            .chain(self.defaults.iter())
            .find_map(|r| r.resolve(value, placeholder))
            .ok_or_else(|| LookupError {
                kind: value.kind(),
                placeholder: placeholder.expression().to_string(),
            })
    }
}
