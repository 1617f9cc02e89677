//! Insertion-ordered dictionary keyed by hashable runtime values.

use std::collections::HashMap;

use super::{EvalError, Value};
use crate::protocol::hash_key;

/// Hash bucket key derived from a hashable value. Two values with equal
/// keys are the same dictionary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    None,
    Bool(bool),
    /// Bit pattern of the float, with `-0.0` folded into `0.0`.
    Float(u64),
    Str(String),
    Tuple(Vec<HashKey>),
    /// Instance hashed through its class `__hash__`, scoped by class id.
    Instance(u64, Box<HashKey>),
    /// Anything else hashes by identity.
    Identity(u64),
}

impl HashKey {
    pub fn float(n: f64) -> Self {
        let n = if n == 0.0 { 0.0 } else { n };
        HashKey::Float(n.to_bits())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dict {
    entries: Vec<(Value, Value)>,
    index: HashMap<HashKey, usize>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. An existing key keeps its position.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), EvalError> {
        let hash = hash_key(&key)?;
        match self.index.get(&hash) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.index.insert(hash, self.entries.len());
                self.entries.push((key, value));
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &Value) -> Result<Option<&Value>, EvalError> {
        let hash = hash_key(key)?;
        Ok(self.index.get(&hash).map(|&slot| &self.entries[slot].1))
    }

    pub fn contains_key(&self, key: &Value) -> Result<bool, EvalError> {
        Ok(self.index.contains_key(&hash_key(key)?))
    }

    /// Look up a string key without building a runtime value.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.index
            .get(&HashKey::Str(key.to_owned()))
            .map(|&slot| &self.entries[slot].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_insert_overwrites_in_place() {
        let mut dict = Dict::new();
        dict.insert(Value::from("a"), Value::int(1)).unwrap();
        dict.insert(Value::from("b"), Value::int(2)).unwrap();
        dict.insert(Value::from("a"), Value::int(3)).unwrap();
        let keys: Vec<&str> = dict.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(dict.get_str("a").and_then(Value::as_float), Some(3.0));
    }

    #[test]
    fn numeric_keys_ignore_sign_of_zero() {
        let mut dict = Dict::new();
        dict.insert(Value::Float(0.0), Value::from("zero")).unwrap();
        assert!(dict.contains_key(&Value::Float(-0.0)).unwrap());
    }

    #[test]
    fn lists_are_unhashable() {
        let mut dict = Dict::new();
        let err = dict
            .insert(Value::list(vec![]), Value::None)
            .unwrap_err();
        assert_eq!(err.kind(), "TypeError");
    }
}
