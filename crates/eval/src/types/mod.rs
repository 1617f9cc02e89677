//! Runtime value model for the evaluator.
//!
//! Values are a closed set of kinds ([`Value`]). User-visible classes are
//! immutable descriptors ([`Class`]) holding a method table; instances
//! carry their own field storage.

pub mod args;
pub mod dict;
pub mod object;
pub mod values;

use quill_core::{EscapeError, ParseError, TokenizeError};
use thiserror::Error;

pub use args::{BoundArgs, Param, ParamSpec};
pub use dict::{Dict, HashKey};
pub use object::{
    next_id, BoundMethod, Class, ClassBuilder, Function, FunctionBody, Instance, Method,
    MethodKind,
};
pub use values::Value;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors raised while evaluating an expression. Display forms carry the
/// Python exception name as a prefix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("SyntaxError: {0}")]
    Tokenize(#[from] TokenizeError),
    #[error("SyntaxError: {0}")]
    Parse(#[from] ParseError),
    #[error("SyntaxError: {message}")]
    Syntax { message: String },
    #[error("NameError: name '{name}' is not defined")]
    Name { name: String },
    #[error("TypeError: {message}")]
    Type { message: String },
    #[error("AttributeError: '{type_name}' object has no attribute '{attribute}'")]
    Attribute { type_name: String, attribute: String },
    #[error("KeyError: {key}")]
    Key { key: String },
    #[error("IndexError: {message}")]
    Index { message: String },
    #[error("ValueError: {message}")]
    Value { message: String },
    #[error("ZeroDivisionError: {message}")]
    ZeroDivision { message: String },
}

impl EvalError {
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type {
            message: message.into(),
        }
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        EvalError::Value {
            message: message.into(),
        }
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        EvalError::ZeroDivision {
            message: message.into(),
        }
    }

    /// Python exception class name for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Tokenize(_) | EvalError::Parse(_) | EvalError::Syntax { .. } => {
                "SyntaxError"
            }
            EvalError::Name { .. } => "NameError",
            EvalError::Type { .. } => "TypeError",
            EvalError::Attribute { .. } => "AttributeError",
            EvalError::Key { .. } => "KeyError",
            EvalError::Index { .. } => "IndexError",
            EvalError::Value { .. } => "ValueError",
            EvalError::ZeroDivision { .. } => "ZeroDivisionError",
        }
    }
}

impl From<EscapeError> for EvalError {
    fn from(err: EscapeError) -> Self {
        if err.is_value_error() {
            EvalError::value_error(err.to_string())
        } else {
            EvalError::Syntax {
                message: err.to_string(),
            }
        }
    }
}
