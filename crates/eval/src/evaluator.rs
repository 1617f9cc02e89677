//! Tree-walking evaluator.
//!
//! `evaluate` is a pure function of the expression tree and the context:
//! names resolve through the context first, then the builtins.

use std::sync::Arc;

use quill_core::{decode_string_literal, CompareOp, Constant, Expr, UnaryOp};

use crate::builtins;
use crate::context::Context;
use crate::protocol;
use crate::types::{next_id, BoundArgs, Dict, EvalError, Function, FunctionBody, ParamSpec, Value};

/// Evaluate an expression tree against a context.
pub fn evaluate(expr: &Expr, context: &Context) -> Result<Value, EvalError> {
    match expr {
        Expr::Name(name) => lookup(name, context),
        Expr::Number(n) => Ok(Value::Float(*n)),
        Expr::Str { raw, unicode } => Ok(Value::from(decode_string_literal(raw, *unicode)?)),
        Expr::Constant(constant) => Ok(match constant {
            Constant::None => Value::None,
            Constant::True => Value::Bool(true),
            Constant::False => Value::Bool(false),
        }),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, context)?;
            match op {
                UnaryOp::Neg => protocol::negative(&value),
                UnaryOp::Pos => protocol::positive(&value),
                UnaryOp::Invert => protocol::invert(&value),
            }
        }
        Expr::Not(operand) => {
            let value = evaluate(operand, context)?;
            Ok(Value::Bool(!protocol::is_truthy(&value)?))
        }
        Expr::Binary { op, left, right } => {
            let a = evaluate(left, context)?;
            let b = evaluate(right, context)?;
            protocol::binary(*op, &a, &b)
        }
        Expr::And(left, right) => {
            let first = evaluate(left, context)?;
            if !protocol::is_truthy(&first)? {
                return Ok(first);
            }
            evaluate(right, context)
        }
        Expr::Or(left, right) => {
            let first = evaluate(left, context)?;
            if protocol::is_truthy(&first)? {
                return Ok(first);
            }
            evaluate(right, context)
        }
        Expr::Compare {
            expressions,
            operators,
        } => compare_chain(expressions, operators, context),
        Expr::Call { callee, args } => {
            let function = evaluate(callee, context)?;
            let mut positional = Vec::new();
            let mut keywords = Vec::new();
            for arg in args {
                match arg {
                    Expr::KeywordArg { name, value } => {
                        keywords.push((name.clone(), evaluate(value, context)?));
                    }
                    other => positional.push(evaluate(other, context)?),
                }
            }
            protocol::call(&function, positional, keywords)
        }
        Expr::KeywordArg { name, .. } => Err(EvalError::Syntax {
            message: format!("keyword argument '{name}' outside of a call"),
        }),
        Expr::Attribute { object, name } => {
            let object = evaluate(object, context)?;
            protocol::get_attr(&object, name)
        }
        Expr::Subscript { object, index } => {
            let object = evaluate(object, context)?;
            let index = evaluate(index, context)?;
            protocol::get_item(&object, &index)
        }
        Expr::Tuple(items) => Ok(Value::tuple(evaluate_all(items, context)?)),
        Expr::List(items) => Ok(Value::list(evaluate_all(items, context)?)),
        Expr::Dict(entries) => {
            let mut dict = Dict::new();
            for (key, value) in entries {
                let key = evaluate(key, context)?;
                let value = evaluate(value, context)?;
                dict.insert(key, value)?;
            }
            Ok(Value::dict(dict))
        }
        Expr::Conditional { body, test, orelse } => {
            if protocol::is_truthy(&evaluate(test, context)?)? {
                evaluate(body, context)
            } else {
                evaluate(orelse, context)
            }
        }
        Expr::Lambda { params, body } => Ok(Value::Function(Arc::new(Function {
            id: next_id(),
            name: "<lambda>".to_owned(),
            params: ParamSpec::positional(params),
            body: FunctionBody::Lambda {
                body: Arc::new(body.as_ref().clone()),
                closure: context.clone(),
            },
        }))),
    }
}

fn lookup(name: &str, context: &Context) -> Result<Value, EvalError> {
    context
        .get(name)
        .cloned()
        .or_else(|| builtins::lookup(name))
        .ok_or_else(|| EvalError::Name {
            name: name.to_owned(),
        })
}

fn evaluate_all(items: &[Expr], context: &Context) -> Result<Vec<Value>, EvalError> {
    items.iter().map(|item| evaluate(item, context)).collect()
}

/// `a < b <= c ...`: each operand is evaluated at most once, and the chain
/// stops at the first false comparison.
fn compare_chain(
    expressions: &[Expr],
    operators: &[CompareOp],
    context: &Context,
) -> Result<Value, EvalError> {
    let Some((first, rest)) = expressions.split_first() else {
        return Err(EvalError::Syntax {
            message: "empty comparison".to_owned(),
        });
    };
    let mut left = evaluate(first, context)?;
    for (op, operand) in operators.iter().zip(rest) {
        let right = evaluate(operand, context)?;
        if !compare_pair(*op, &left, &right)? {
            return Ok(Value::Bool(false));
        }
        left = right;
    }
    Ok(Value::Bool(true))
}

fn compare_pair(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match op {
        CompareOp::Is => Ok(left.identical(right)),
        CompareOp::IsNot => Ok(!left.identical(right)),
        CompareOp::In => protocol::contains(right, left),
        CompareOp::NotIn => Ok(!protocol::contains(right, left)?),
        other => protocol::is_truthy(&protocol::compare(other, left, right)?),
    }
}

/// Run a lambda body with its parameters bound over the captured context.
pub(crate) fn call_lambda(
    body: &Expr,
    closure: &Context,
    args: &BoundArgs<'_>,
) -> Result<Value, EvalError> {
    let mut scope = closure.clone();
    for (name, value) in args.named() {
        scope.insert(name, value.clone());
    }
    evaluate(body, &scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{parse, tokenize};

    fn run(source: &str) -> Result<Value, EvalError> {
        let tokens = tokenize(source)?;
        let tree = parse(&tokens)?;
        evaluate(&tree, &Context::new())
    }

    fn number(source: &str) -> f64 {
        run(source).unwrap().as_float().unwrap()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(number("2 + 3 * 4"), 14.0);
        assert_eq!(number("2 ** 3 ** 2"), 512.0);
        assert_eq!(number("-2 ** 2"), -4.0);
        assert_eq!(number("7 // 2 + 7 % 3"), 4.0);
        assert_eq!(number("-7 // 2"), -4.0);
    }

    #[test]
    fn boolean_operators_return_operands() {
        assert_eq!(number("0 or 5"), 5.0);
        assert_eq!(number("3 and 4"), 4.0);
        assert!(matches!(run("[] and 1/0").unwrap(), Value::List(_)));
        assert!(matches!(run("not 0").unwrap(), Value::Bool(true)));
    }

    #[test]
    fn chained_comparison_short_circuits() {
        assert!(matches!(run("1 < 2 < 0 < (1/0)").unwrap(), Value::Bool(false)));
        assert!(matches!(run("1 < 2 <= 2 != 3").unwrap(), Value::Bool(true)));
        let err = run("1 < 2 < 3 < (1/0)").unwrap_err();
        assert_eq!(err.kind(), "ZeroDivisionError");
    }

    #[test]
    fn membership_and_identity() {
        assert!(matches!(run("2 in [1, 2]").unwrap(), Value::Bool(true)));
        assert!(matches!(run("'b' not in 'abc'").unwrap(), Value::Bool(false)));
        assert!(matches!(run("None is None").unwrap(), Value::Bool(true)));
        assert!(matches!(run("[] is not []").unwrap(), Value::Bool(true)));
    }

    #[test]
    fn conditionals_nest_to_the_right() {
        assert_eq!(number("1 if False else 2 if True else 3"), 2.0);
    }

    #[test]
    fn lambdas_close_over_their_context() {
        let mut context = Context::new();
        context.insert("k", Value::int(10));
        let tree = parse(&tokenize("(lambda x, y=2: x * y + k)(3)").unwrap());
        // Defaults are not part of lambda syntax; `y=2` is a parse error.
        assert!(tree.is_err());
        let tree = parse(&tokenize("(lambda x, y: x * y + k)(3, 2)").unwrap()).unwrap();
        assert_eq!(evaluate(&tree, &context).unwrap().as_float(), Some(16.0));
    }

    #[test]
    fn dict_literals_keep_last_duplicate() {
        let value = run("{'a': 1, 'b': 2, 'a': 3}").unwrap();
        let Value::Dict(dict) = value else {
            panic!("expected dict");
        };
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get_str("a").and_then(Value::as_float), Some(3.0));
    }

    #[test]
    fn unknown_names_fail() {
        let err = run("missing + 1").unwrap_err();
        assert_eq!(err.to_string(), "NameError: name 'missing' is not defined");
    }

    #[test]
    fn keyword_outside_call_is_rejected() {
        let err = run("a = 1").unwrap_err();
        assert_eq!(err.kind(), "SyntaxError");
    }
}
