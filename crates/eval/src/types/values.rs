//! The closed set of runtime value kinds.

use std::sync::Arc;

use serde_json::{Map, Value as Json};

use super::{BoundMethod, Class, Dict, Function, Instance};

/// A runtime value.
///
/// Native JSON arrays and objects are held as [`Value::WrappedList`] and
/// [`Value::WrappedDict`]; their elements become runtime values only when
/// accessed.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    NotImplemented,
    Bool(bool),
    Float(f64),
    Str(Arc<str>),
    Tuple(Arc<Vec<Value>>),
    List(Arc<Vec<Value>>),
    Dict(Arc<Dict>),
    WrappedDict(Arc<Map<String, Json>>),
    WrappedList(Arc<Vec<Json>>),
    Function(Arc<Function>),
    BoundMethod(Arc<BoundMethod>),
    Class(Arc<Class>),
    Instance(Arc<Instance>),
}

impl Value {
    pub fn str(s: impl Into<Arc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Arc::new(items))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Arc::new(items))
    }

    pub fn dict(dict: Dict) -> Value {
        Value::Dict(Arc::new(dict))
    }

    pub fn int(n: i64) -> Value {
        Value::Float(n as f64)
    }

    /// Name of the value's class, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::NotImplemented => "NotImplementedType",
            Value::Bool(_) => "bool",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) | Value::WrappedList(_) => "list",
            Value::Dict(_) | Value::WrappedDict(_) => "dict",
            Value::Function(_) => "function",
            Value::BoundMethod(_) => "instancemethod",
            Value::Class(_) => "type",
            Value::Instance(inst) => inst.class.name,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Integral value of a float or bool, if it has one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Float(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Arc<Instance>> {
        match self {
            Value::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Object identity, as tested by `is`.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) | (Value::NotImplemented, Value::NotImplemented) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) | (Value::List(a), Value::List(b)) => {
                Arc::ptr_eq(a, b)
            }
            (Value::Dict(a), Value::Dict(b)) => Arc::ptr_eq(a, b),
            (Value::WrappedDict(a), Value::WrappedDict(b)) => Arc::ptr_eq(a, b),
            (Value::WrappedList(a), Value::WrappedList(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.id == b.id,
            (Value::BoundMethod(a), Value::BoundMethod(b)) => Arc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => a.id == b.id,
            (Value::Instance(a), Value::Instance(b)) => a.id == b.id,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}
