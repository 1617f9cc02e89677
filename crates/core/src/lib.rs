//! quill-core: front end of the Quill expression language.
//!
//! Turns Python-style expression text into an [`Expr`] tree:
//!
//! - [`tokenize()`] -- split text into [`Token`]s
//! - [`parse()`] -- Pratt-parse tokens using the [`grammar`] table
//! - [`decode_string_literal()`] -- resolve backslash escapes of a string literal
//!
//! Evaluation lives in `quill-eval`.

pub mod ast;
pub mod error;
pub mod escape;
pub mod grammar;
pub mod lexer;
pub mod parser;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{BinaryOp, CompareOp, Constant, Expr, UnaryOp};
pub use error::{EscapeError, ParseError, TokenizeError};
pub use escape::decode_string_literal;
pub use lexer::{format_number, tokenize, Literal, Symbol, Token};
pub use parser::parse;
