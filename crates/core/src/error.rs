//! Errors raised while turning source text into an expression tree.

use thiserror::Error;

/// The source could not be split into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to tokenize <<{text}>> at index {index}; parsed so far: {consumed:?}")]
pub struct TokenizeError {
    /// The full input text.
    pub text: String,
    /// Character offset where no token pattern matched.
    pub index: usize,
    /// Display forms of the tokens produced before the failure.
    pub consumed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("token stream is not terminated by an end marker")]
    MissingEnd,
    #[error("undefined prefix {found}")]
    UndefinedPrefix { found: String },
    #[error("undefined infix {found}")]
    UndefinedInfix { found: String },
    #[error("expected {expected}, got {found}")]
    Expected { expected: String, found: String },
    #[error("expected keyword argument name, got {found}")]
    KeywordName { found: String },
    #[error("expected attribute name, got {found}")]
    AttributeName { found: String },
    #[error("unexpected {found} after end of expression")]
    TrailingInput { found: String },
}

/// A string literal contains an escape sequence that cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscapeError {
    #[error("(unicode error) 'unicodeescape' codec can't decode bytes in position {start}-{end}: truncated \\{escape} escape")]
    Truncated { escape: char, start: usize, end: usize },
    #[error("(unicode error) 'unicodeescape' codec can't decode bytes in position {start}-{end}: illegal Unicode character")]
    IllegalCodePoint { start: usize, end: usize },
    #[error("invalid \\x escape")]
    InvalidHex,
    #[error("(unicode error) \\N escapes not supported")]
    NamedEscape,
}

impl EscapeError {
    /// Whether Python would report this as a `ValueError` rather than a `SyntaxError`.
    pub fn is_value_error(&self) -> bool {
        matches!(self, EscapeError::InvalidHex)
    }
}
