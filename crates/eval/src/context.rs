//! Name-resolution context for evaluation.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};

use crate::assemble::wrap;
use crate::datetime;
use crate::types::{Dict, EvalError, Value};

/// Name under which composition exposes the context to itself.
pub const SELF_NAME: &str = "context";

/// Names visible to an expression, on top of the builtins.
#[derive(Debug, Clone, Default)]
pub struct Context {
    names: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context holding the wrapped entries of a native object.
    pub fn from_native(native: &Map<String, Json>) -> Self {
        let mut context = Context::new();
        context.extend_native(native);
        context
    }

    /// A fresh context with the date/time helpers injected, then `base`.
    pub fn seeded(base: &Map<String, Json>) -> Result<Self, EvalError> {
        let mut context = Context::new();
        for (name, value) in datetime::helpers()? {
            context.insert(name, value);
        }
        context.extend_native(base);
        Ok(context)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.names.insert(name.into(), value);
    }

    pub fn extend_native(&mut self, native: &Map<String, Json>) {
        for (name, value) in native {
            self.insert(name.as_str(), wrap(value.clone()));
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Snapshot as a dict value, leaving out the self reference.
    pub fn to_dict(&self) -> Result<Value, EvalError> {
        let mut dict = Dict::new();
        for (name, value) in self.iter().filter(|(name, _)| *name != SELF_NAME) {
            dict.insert(Value::from(name), value.clone())?;
        }
        Ok(Value::dict(dict))
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Context {
            names: iter.into_iter().collect(),
        }
    }
}
