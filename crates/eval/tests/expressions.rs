//! End-to-end expression evaluation: source text in, native JSON out.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use quill_eval::builtins::OBJECT;
use quill_eval::types::{Class, Function, Instance, ParamSpec};
use quill_eval::{eval, eval_compat, Context, EvalError, Value};
use serde_json::{json, Map, Value as Json};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn run(source: &str) -> Json {
    eval(source, &Context::new()).unwrap_or_else(|err| panic!("{source}: {err}"))
}

fn fail(source: &str) -> EvalError {
    match eval(source, &Context::new()) {
        Ok(value) => panic!("{source}: expected an error, got {value}"),
        Err(err) => err,
    }
}

fn with_context(source: &str, context: Json) -> Result<Json, EvalError> {
    let native = context.as_object().cloned().unwrap_or_default();
    eval(source, &Context::from_native(&native))
}

/// A class implementing only reflected addition, tagging its result.
static RIGHT_ADDER: LazyLock<Arc<Class>> = LazyLock::new(|| {
    Class::builder("RightAdder")
        .base(&OBJECT)
        .method("__radd__", ParamSpec::new().required("other"), |_, args| {
            Ok(Value::tuple(vec![Value::from("radd"), args.get("other").clone()]))
        })
        .build()
});

// ──────────────────────────────────────────────
// Precedence and literals
// ──────────────────────────────────────────────

#[test]
fn precedence_and_associativity() {
    assert_eq!(run("2 + 3 * 4"), json!(14));
    assert_eq!(run("2 ** 3 ** 2"), json!(512));
    assert_eq!(run("1 if False else 2 if True else 3"), json!(2));
    assert_eq!(run("(1 + 2) * 3"), json!(9));
    assert_eq!(run("1 | 6 & 3 ^ 8"), json!(11));
    assert_eq!(run("1 << 4 >> 2"), json!(4));
    assert_eq!(run("not 1 == 2"), json!(true));
}

#[test]
fn container_literals() {
    assert_eq!(run("(1,)"), json!([1]));
    assert_eq!(run("()"), json!([]));
    assert_eq!(run("[1, 'a', None, True]"), json!([1, "a", null, true]));
    assert_eq!(run("{'a': [1, 2], 'b': {'c': 3.5}}"), json!({"a": [1, 2], "b": {"c": 3.5}}));
    assert_eq!(run("[1, 2, 3][-1]"), json!(3));
    assert_eq!(run("'abc'[1]"), json!("b"));
}

#[test]
fn string_escapes_are_decoded() {
    assert_eq!(run(r"'a\tb'"), json!("a\tb"));
    assert_eq!(run(r"u'é'"), json!("é"));
    assert_eq!(run(r#""it's""#), json!("it's"));
    assert_eq!(fail(r"'\x4'").kind(), "ValueError");
}

// ──────────────────────────────────────────────
// Operator protocol
// ──────────────────────────────────────────────

#[test]
fn incompatible_operands_name_both_kinds() {
    let err = fail("1 + 'a'");
    assert_eq!(
        err.to_string(),
        "TypeError: unsupported operand type(s) for +: 'float' and 'str'"
    );
    let err = fail("[] - {}");
    assert_eq!(
        err.to_string(),
        "TypeError: unsupported operand type(s) for -: 'list' and 'dict'"
    );
}

#[test]
fn comparisons_fall_back_to_type_names() {
    assert_eq!(run("1 < 'a'"), json!(true));
    assert_eq!(run("[] > None"), json!(true));
    assert_eq!(run("1 == '1'"), json!(false));
    assert_eq!(run("1 != '1'"), json!(true));
}

#[test]
fn reflected_method_is_used_when_left_declines() {
    let mut context = Context::new();
    context.insert("r", Instance::new(&RIGHT_ADDER, BTreeMap::new()));
    assert_eq!(eval("1 + r", &context).unwrap(), json!(["radd", 1]));
    let err = eval("r + 1", &context).unwrap_err();
    assert_eq!(err.kind(), "TypeError");
}

#[test]
fn chained_comparisons_stop_at_first_false() {
    assert_eq!(run("1 < 2 < 0 < (1/0)"), json!(false));
    assert_eq!(run("1 < 2 < 3"), json!(true));
    assert_eq!(run("3 > 2 == 2 >= 1"), json!(true));
    assert_eq!(run("1 <> 2"), json!(true));
    assert_eq!(fail("1 < 2 < (1/0)").kind(), "ZeroDivisionError");
}

#[test]
fn sequences_compare_lexicographically() {
    assert_eq!(run("(1, 2) < (1, 3)"), json!(true));
    assert_eq!(run("[1, 2] == [1, 2]"), json!(true));
    assert_eq!(run("(1, 2) < (1, 2, 0)"), json!(true));
    assert_eq!(run("'abc' < 'abd'"), json!(true));
}

#[test]
fn arithmetic_follows_python() {
    assert_eq!(run("-7 % 3"), json!(2));
    assert_eq!(run("7 % -3"), json!(-2));
    assert_eq!(run("-7 // 2"), json!(-4));
    assert_eq!(run("7 / 2"), json!(3.5));
    assert_eq!(run("'ab' * 2"), json!("abab"));
    assert_eq!(run("2 * [0]"), json!([0, 0]));
    assert_eq!(run("'a' + 'b'"), json!("ab"));
    assert_eq!(run("~5"), json!(-6));
    assert_eq!(fail("1 / 0").kind(), "ZeroDivisionError");
}

#[test]
fn rounding_is_half_away_from_zero() {
    assert_eq!(run("round(-0.5)"), json!(-1));
    assert_eq!(run("round(0.5)"), json!(1));
    assert_eq!(run("round(2.675, 2)"), json!(2.68));
    assert_eq!(run("round(1234.5678, -2)"), json!(1200));
}

// ──────────────────────────────────────────────
// Calls and builtins
// ──────────────────────────────────────────────

#[test]
fn argument_binding_errors() {
    let mut context = Context::new();
    context.insert(
        "strict",
        Function::native(
            "strict",
            ParamSpec::new().optional("a", Value::int(1)),
            |args| Ok(args.get("a").clone()),
        ),
    );
    context.insert(
        "loose",
        Function::native(
            "loose",
            ParamSpec::new().optional("a", Value::int(1)).varkw("kw"),
            |args| Ok(Value::int(args.kwrest().len() as i64)),
        ),
    );

    assert_eq!(eval("strict()", &context).unwrap(), json!(1));
    assert_eq!(eval("strict(a=4)", &context).unwrap(), json!(4));
    assert_eq!(eval("loose(b=2, c=3)", &context).unwrap(), json!(2));

    let err = eval("strict(b=2)", &context).unwrap_err();
    assert_eq!(
        err.to_string(),
        "TypeError: strict() got an unexpected keyword argument 'b'"
    );
    let err = eval("strict(1, 2, 3)", &context).unwrap_err();
    assert_eq!(
        err.to_string(),
        "TypeError: strict() takes at most 1 positional arguments (3 given)"
    );
    let err = eval("strict(1, a=2)", &context).unwrap_err();
    assert_eq!(
        err.to_string(),
        "TypeError: strict() got multiple values for keyword argument 'a'"
    );
}

#[test]
fn lambdas_bind_parameters() {
    assert_eq!(run("(lambda: 42)()"), json!(42));
    assert_eq!(run("(lambda a, b: a - b)(b=1, a=5)"), json!(4));
    assert_eq!(fail("(lambda a: a)()").kind(), "TypeError");
}

#[test]
fn builtin_functions() {
    assert_eq!(run("len('héllo')"), json!(5));
    assert_eq!(run("abs(-3)"), json!(3));
    assert_eq!(run("int(-3.7)"), json!(-3));
    assert_eq!(run("float('2.5')"), json!(2.5));
    assert_eq!(run("min(4, 2, 8)"), json!(2));
    assert_eq!(run("max([4, 2, 8])"), json!(8));
    assert_eq!(run("bool([])"), json!(false));
    assert_eq!(run("str(1.5)"), json!("1.5"));
    assert_eq!(run("isinstance('a', str)"), json!(true));
    assert_eq!(run("isinstance(1, (str, float))"), json!(true));
    assert_eq!(run("issubclass(bool, object)"), json!(true));
    assert_eq!(run("type('a') == str"), json!(true));
    assert_eq!(run("dict([('a', 1)], b=2)"), json!({"a": 1, "b": 2}));
    assert_eq!(run("list('ab')"), json!(["a", "b"]));
}

#[test]
fn methods_of_builtin_kinds() {
    assert_eq!(run("' Ab '.strip().lower()"), json!("ab"));
    assert_eq!(run("'a,b,c'.split(',')"), json!(["a", "b", "c"]));
    assert_eq!(run("'-'.join(['x', 'y'])"), json!("x-y"));
    assert_eq!(run("'abc'.startswith('ab')"), json!(true));
    assert_eq!(run("'aaa'.replace('a', 'b', 2)"), json!("bba"));
    assert_eq!(run("{'a': 1}.get('b', 7)"), json!(7));
    assert_eq!(run("{'a': 1}.items()"), json!([["a", 1]]));
    assert_eq!(run("[1, 2, 1].count(1)"), json!(2));
}

// ──────────────────────────────────────────────
// Names and native context
// ──────────────────────────────────────────────

#[test]
fn native_context_values_are_wrapped() {
    let context = json!({"user": {"id": 4, "groups": ["a", "b"]}, "ids": [1, 2, 3]});
    assert_eq!(with_context("user.id + 1", context.clone()).unwrap(), json!(5));
    assert_eq!(with_context("user['groups'][1]", context.clone()).unwrap(), json!("b"));
    assert_eq!(with_context("2 in ids", context.clone()).unwrap(), json!(true));
    assert_eq!(with_context("user.get('missing')", context.clone()).unwrap(), json!(null));
    assert_eq!(with_context("user", context.clone()).unwrap(), context["user"]);
    let err = with_context("user.missing", context).unwrap_err();
    assert_eq!(
        err.to_string(),
        "AttributeError: 'dict' object has no attribute 'missing'"
    );
}

#[test]
fn missing_names_and_keys() {
    assert_eq!(
        fail("undefined_name").to_string(),
        "NameError: name 'undefined_name' is not defined"
    );
    assert_eq!(fail("{'a': 1}['b']").kind(), "KeyError");
    assert_eq!(fail("[1][3]").kind(), "IndexError");
    assert_eq!(fail("None()").kind(), "TypeError");
}

#[test]
fn compat_evaluation_binds_json_spellings() {
    let context = Map::new();
    assert_eq!(eval_compat("[true, false, null]", &context).unwrap(), json!([true, false, null]));
    assert_eq!(fail("true").kind(), "NameError");
}

#[test]
fn syntax_errors_surface() {
    assert_eq!(fail("1 +").kind(), "SyntaxError");
    assert_eq!(fail("1 $ 2").kind(), "SyntaxError");
    assert_eq!(fail("(1, 2").kind(), "SyntaxError");
    assert_eq!(fail("1 2").kind(), "SyntaxError");
}
