//! Quill expression evaluator.
//!
//! Evaluates Python expressions parsed by `quill-core` against a context
//! of runtime values, with Python's data model: rich comparisons with
//! reflection, truthiness, attribute and item access, keyword arguments.
//! The [`compose`] module threads a context through lists of context,
//! domain and group-by fragments.

pub mod assemble;
pub mod builtins;
pub mod compose;
pub mod context;
pub mod datetime;
pub mod evaluator;
pub mod numeric;
pub mod protocol;
pub mod types;

use quill_core::{parse, tokenize, Expr};
use serde_json::{Map, Value as Json};

pub use assemble::{to_native, wrap};
pub use compose::{
    ensure_evaluated, evaluate_argument, evaluate_domains_and_contexts, evaluate_fragments,
    normalize_domain, Composition, CompositionSource, Fragment, FragmentKind,
};
pub use context::Context;
pub use evaluator::evaluate;
pub use types::{EvalError, Value};

/// Tokenize and parse expression source.
pub fn compile(source: &str) -> Result<Expr, EvalError> {
    tracing::trace!(source, "compiling expression");
    let tokens = tokenize(source)?;
    Ok(parse(&tokens)?)
}

/// Evaluate expression source and convert the result to its native form.
pub fn eval(source: &str, context: &Context) -> Result<Json, EvalError> {
    let tree = compile(source)?;
    to_native(&evaluate(&tree, context)?)
}

/// [`eval`] over a native context, with the JSON spellings `true`,
/// `false` and `null` bound to their Python counterparts.
pub fn eval_compat(source: &str, context: &Map<String, Json>) -> Result<Json, EvalError> {
    let mut context = Context::from_native(context);
    context.insert("true", Value::Bool(true));
    context.insert("false", Value::Bool(false));
    context.insert("null", Value::None);
    eval(source, &context)
}
