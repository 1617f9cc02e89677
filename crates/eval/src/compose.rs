//! Composition of context, domain and group-by fragment lists.
//!
//! Every composition starts from a freshly seeded [`Context`]. Each
//! fragment's result is folded into that context before the next sibling
//! is evaluated, so later fragments can refer to names bound by earlier
//! ones.

use std::fmt;
use std::str::FromStr;

use quill_core::Expr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::assemble::to_native;
use crate::context::{Context, SELF_NAME};
use crate::evaluator::evaluate;
use crate::types::{Dict, EvalError, Value};

// ──────────────────────────────────────────────
// Fragments
// ──────────────────────────────────────────────

/// What a fragment list composes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Merged key/value dict.
    Context,
    /// Concatenated prefix-notation domain.
    Domain,
    /// Flattened list of `group_by` names.
    GroupBy,
}

impl FragmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FragmentKind::Context => "context",
            FragmentKind::Domain => "domain",
            FragmentKind::GroupBy => "groupby",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FragmentKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "context" | "contexts" => Ok(FragmentKind::Context),
            "domain" | "domains" => Ok(FragmentKind::Domain),
            "groupby" | "groupbys" | "group_by" => Ok(FragmentKind::GroupBy),
            other => Err(EvalError::value_error(format!(
                "Unknown evaluation type {other}"
            ))),
        }
    }
}

/// One element of a fragment list.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Already-evaluated data, used as is.
    Literal(Json),
    /// Expression source text.
    Expression(String),
    /// Fragments evaluated under an inner context, itself a fragment
    /// evaluated on a fresh seed.
    Compound {
        eval_context: Box<Fragment>,
        fragments: Vec<Fragment>,
    },
}

impl Fragment {
    /// Interpret the JSON form of a fragment.
    ///
    /// Strings are expressions. Objects tagged `__ref: "context"` or
    /// `"domain"` carry their source in `__debug`; `"compound_context"` and
    /// `"compound_domain"` carry `__eval_context` plus `__contexts` or
    /// `__domains`. Anything else is literal.
    pub fn from_json(json: &Json) -> Result<Fragment, EvalError> {
        let Some(reference) = json.get("__ref").and_then(Json::as_str) else {
            return Ok(match json {
                Json::String(text) => Fragment::Expression(text.clone()),
                other => Fragment::Literal(other.clone()),
            });
        };
        match reference {
            "context" | "domain" => match json.get("__debug") {
                Some(Json::String(text)) => Ok(Fragment::Expression(text.clone())),
                _ => Err(EvalError::value_error(format!(
                    "{reference} fragment without __debug source"
                ))),
            },
            "compound_context" | "compound_domain" => {
                let key = if reference == "compound_context" {
                    "__contexts"
                } else {
                    "__domains"
                };
                let eval_context = match json.get("__eval_context") {
                    Some(inner) => Fragment::from_json(inner)?,
                    None => Fragment::Literal(Json::Null),
                };
                let fragments = match json.get(key) {
                    Some(Json::Array(items)) => {
                        items.iter().map(Fragment::from_json).collect::<Result<_, _>>()?
                    }
                    None | Some(Json::Null) => Vec::new(),
                    Some(other) => {
                        return Err(EvalError::type_error(format!(
                            "{key} must be a list, not {}",
                            json_type(other)
                        )))
                    }
                };
                Ok(Fragment::Compound {
                    eval_context: Box::new(eval_context),
                    fragments,
                })
            }
            _ => Ok(Fragment::Literal(json.clone())),
        }
    }

    /// Empty fragments are skipped without affecting accumulation.
    pub fn is_empty(&self) -> bool {
        match self {
            Fragment::Literal(Json::Null) => true,
            Fragment::Literal(Json::Array(items)) => items.is_empty(),
            Fragment::Literal(Json::Object(map)) => map.is_empty(),
            Fragment::Literal(Json::String(text)) | Fragment::Expression(text) => {
                text.trim().is_empty()
            }
            Fragment::Literal(_) | Fragment::Compound { .. } => false,
        }
    }

    fn form(&self) -> &'static str {
        match self {
            Fragment::Literal(_) => "literal",
            Fragment::Expression(_) => "expression",
            Fragment::Compound { .. } => "compound",
        }
    }

    /// `["|"]` or `["!"]`: the marker that turns on domain normalization
    /// when it is the first fragment.
    fn is_unary_prefix(&self) -> bool {
        match self {
            Fragment::Literal(Json::Array(items)) => {
                matches!(items.as_slice(), [Json::String(op)] if op == "|" || op == "!")
            }
            _ => false,
        }
    }
}

// ──────────────────────────────────────────────
// Composition
// ──────────────────────────────────────────────

/// Compose the JSON fragments of one kind on top of `base`.
///
/// Context composition yields an object, domain and group-by composition
/// yield arrays.
pub fn evaluate_fragments(
    kind: FragmentKind,
    fragments: &[Json],
    base: &Map<String, Json>,
) -> Result<Json, EvalError> {
    let fragments = fragments
        .iter()
        .map(Fragment::from_json)
        .collect::<Result<Vec<_>, _>>()?;
    let mut context = Context::seeded(base)?;
    match kind {
        FragmentKind::Context => compose_contexts(&fragments, &mut context).map(Json::Object),
        FragmentKind::Domain => compose_domains(&fragments, &mut context).map(Json::Array),
        FragmentKind::GroupBy => compose_group_bys(&fragments, &mut context).map(Json::Array),
    }
}

fn compose_contexts(
    fragments: &[Fragment],
    context: &mut Context,
) -> Result<Map<String, Json>, EvalError> {
    let mut result = Map::new();
    for (index, fragment) in fragments.iter().enumerate() {
        if fragment.is_empty() {
            continue;
        }
        debug!(kind = "context", index, form = fragment.form(), "composing fragment");
        let evaluated = match evaluate_as_context(fragment, context)? {
            Json::Object(map) => map,
            other => {
                return Err(EvalError::type_error(format!(
                    "context fragment must evaluate to a dict, not {}",
                    json_type(&other)
                )))
            }
        };
        context.extend_native(&evaluated);
        result.extend(evaluated);
    }
    Ok(result)
}

fn compose_domains(fragments: &[Fragment], context: &mut Context) -> Result<Vec<Json>, EvalError> {
    let normalize = fragments.first().is_some_and(Fragment::is_unary_prefix);
    let mut result = Vec::new();
    for (index, fragment) in fragments.iter().enumerate() {
        if fragment.is_empty() {
            continue;
        }
        debug!(kind = "domain", index, form = fragment.form(), normalize, "composing fragment");
        let evaluated = match fragment {
            Fragment::Literal(json) => json.clone(),
            Fragment::Expression(text) => evaluate_text(text, context)?,
            Fragment::Compound {
                eval_context,
                fragments,
            } => {
                let mut scope = compound_scope(eval_context, context)?;
                Json::Array(compose_domains(fragments, &mut scope)?)
            }
        };
        let Json::Array(items) = evaluated else {
            return Err(EvalError::type_error(format!(
                "domain fragment must evaluate to a list, not {}",
                json_type(&evaluated)
            )));
        };
        if normalize {
            result.extend(normalize_domain(items));
        } else {
            result.extend(items);
        }
    }
    Ok(result)
}

fn compose_group_bys(
    fragments: &[Fragment],
    context: &mut Context,
) -> Result<Vec<Json>, EvalError> {
    let mut result = Vec::new();
    for (index, fragment) in fragments.iter().enumerate() {
        if fragment.is_empty() {
            continue;
        }
        debug!(kind = "groupby", index, form = fragment.form(), "composing fragment");
        let Json::Object(evaluated) = evaluate_as_context(fragment, context)? else {
            continue;
        };
        match evaluated.get("group_by") {
            None | Some(Json::Null) | Some(Json::Bool(false)) => continue,
            Some(Json::String(name)) if name.is_empty() => continue,
            Some(Json::Number(n)) if n.as_f64() == Some(0.0) => continue,
            Some(Json::String(name)) => result.push(Json::String(name.clone())),
            Some(Json::Array(names)) => result.extend(names.iter().cloned()),
            Some(other) => {
                return Err(EvalError::value_error(format!("Got invalid groupby {other}")))
            }
        }
        context.extend_native(&evaluated);
    }
    Ok(result)
}

/// Evaluate a single fragment the way context composition does.
fn evaluate_as_context(fragment: &Fragment, context: &mut Context) -> Result<Json, EvalError> {
    match fragment {
        Fragment::Literal(json) => Ok(json.clone()),
        Fragment::Expression(text) => evaluate_text(text, context),
        Fragment::Compound {
            eval_context,
            fragments,
        } => {
            let mut scope = compound_scope(eval_context, context)?;
            compose_contexts(fragments, &mut scope).map(Json::Object)
        }
    }
}

/// The outer context extended with the compound's inner context, which is
/// evaluated on its own fresh seed.
fn compound_scope(eval_context: &Fragment, outer: &Context) -> Result<Context, EvalError> {
    let mut fresh = Context::seeded(&Map::new())?;
    let inner = compose_contexts(std::slice::from_ref(eval_context), &mut fresh)?;
    let mut scope = outer.clone();
    scope.extend_native(&inner);
    Ok(scope)
}

/// Evaluate expression text with `context` bound to a snapshot of the
/// context itself. A top-level `name = expr` yields `{name: value}`.
fn evaluate_text(text: &str, context: &mut Context) -> Result<Json, EvalError> {
    let snapshot = context.to_dict()?;
    context.insert(SELF_NAME, snapshot);
    let tree = crate::compile(text)?;
    let value = match &tree {
        Expr::KeywordArg { name, value } => {
            let mut dict = Dict::new();
            dict.insert(Value::from(name.as_str()), evaluate(value, context)?)?;
            Value::dict(dict)
        }
        other => evaluate(other, context)?,
    };
    to_native(&value)
}

/// Make a domain's implicit top-level conjunction explicit by prepending
/// as many `"&"` as there are operands beyond a single root.
pub fn normalize_domain(items: Vec<Json>) -> Vec<Json> {
    let mut expected: i64 = 1;
    for item in &items {
        match item.as_str() {
            Some("&" | "|") => expected += 1,
            Some("!") => {}
            _ => expected -= 1,
        }
    }
    let missing = usize::try_from(-expected).unwrap_or(0);
    let mut normalized = vec![Json::String("&".to_owned()); missing];
    normalized.extend(items);
    normalized
}

// ──────────────────────────────────────────────
// Bulk evaluation
// ──────────────────────────────────────────────

/// Input of [`evaluate_domains_and_contexts`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompositionSource {
    #[serde(default)]
    pub contexts: Vec<Json>,
    #[serde(default)]
    pub domains: Vec<Json>,
    #[serde(default)]
    pub group_by_seq: Vec<Json>,
    #[serde(default)]
    pub eval_context: Option<Map<String, Json>>,
}

/// Output of [`evaluate_domains_and_contexts`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub context: Map<String, Json>,
    pub domain: Vec<Json>,
    pub group_by: Vec<Json>,
}

/// Compose contexts, domains and group-bys against the same base context.
/// Each list starts from its own fresh seed.
pub fn evaluate_domains_and_contexts(
    source: &CompositionSource,
) -> Result<Composition, EvalError> {
    let base = source.eval_context.clone().unwrap_or_default();
    let context = match evaluate_fragments(FragmentKind::Context, &source.contexts, &base)? {
        Json::Object(map) => map,
        _ => Map::new(),
    };
    let domain = match evaluate_fragments(FragmentKind::Domain, &source.domains, &base)? {
        Json::Array(items) => items,
        _ => Vec::new(),
    };
    let group_by = match evaluate_fragments(FragmentKind::GroupBy, &source.group_by_seq, &base)? {
        Json::Array(items) => items,
        _ => Vec::new(),
    };
    Ok(Composition {
        context,
        domain,
        group_by,
    })
}

/// Evaluate an argument that may be an unevaluated domain or context.
/// Values without a `__ref` tag pass through unchanged.
pub fn evaluate_argument(arg: &Json) -> Result<Json, EvalError> {
    let Some(reference) = arg.get("__ref").and_then(Json::as_str) else {
        return Ok(arg.clone());
    };
    let kind = match reference {
        "domain" | "compound_domain" => FragmentKind::Domain,
        "context" | "compound_context" => FragmentKind::Context,
        other => {
            return Err(EvalError::value_error(format!(
                "Unknown nonliteral type {other}"
            )))
        }
    };
    evaluate_fragments(kind, std::slice::from_ref(arg), &Map::new())
}

/// Evaluate every unevaluated domain or context among call arguments, in
/// place.
pub fn ensure_evaluated(args: &mut [Json], kwargs: &mut Map<String, Json>) -> Result<(), EvalError> {
    for arg in args.iter_mut() {
        *arg = evaluate_argument(arg)?;
    }
    for value in kwargs.values_mut() {
        *value = evaluate_argument(value)?;
    }
    Ok(())
}

fn json_type(json: &Json) -> &'static str {
    match json {
        Json::Null => "None",
        Json::Bool(_) => "bool",
        Json::Number(_) => "float",
        Json::String(_) => "str",
        Json::Array(_) => "list",
        Json::Object(_) => "dict",
    }
}
