//! Builtin classes and the builtin namespace.
//!
//! Each builtin kind of [`Value`] has a class descriptor so that `type()`,
//! `isinstance()` and attribute lookup treat builtin and native-library
//! classes the same way.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use crate::assemble::wrap;
use crate::numeric;
use crate::protocol::{self, Op};
use crate::types::{BoundArgs, Class, Dict, EvalError, Function, Instance, ParamSpec, Value};

// ──────────────────────────────────────────────
// Classes
// ──────────────────────────────────────────────

pub static OBJECT: LazyLock<Arc<Class>> = LazyLock::new(|| {
    Class::builder("object")
        .constructor(ParamSpec::new(), |class, _| {
            Ok(Instance::new(class, BTreeMap::new()))
        })
        .build()
});

static TYPE: LazyLock<Arc<Class>> = LazyLock::new(|| {
    Class::builder("type")
        .base(&OBJECT)
        .constructor(ParamSpec::new().required("object"), |_, args| {
            Ok(Value::Class(class_of(args.get("object"))))
        })
        .build()
});

static NONE_TYPE: LazyLock<Arc<Class>> =
    LazyLock::new(|| Class::builder("NoneType").base(&OBJECT).build());

static NOT_IMPLEMENTED_TYPE: LazyLock<Arc<Class>> =
    LazyLock::new(|| Class::builder("NotImplementedType").base(&OBJECT).build());

static BOOL: LazyLock<Arc<Class>> = LazyLock::new(|| {
    Class::builder("bool")
        .base(&OBJECT)
        .constructor(ParamSpec::new().optional("x", Value::Bool(false)), |_, args| {
            Ok(Value::Bool(protocol::is_truthy(args.get("x"))?))
        })
        .build()
});

static FLOAT: LazyLock<Arc<Class>> = LazyLock::new(|| {
    Class::builder("float")
        .base(&OBJECT)
        .constructor(ParamSpec::new().optional("x", Value::Float(0.0)), |_, args| {
            to_float(args.get("x")).map(Value::Float)
        })
        .build()
});

static STR: LazyLock<Arc<Class>> = LazyLock::new(|| {
    let one = |name: &str| ParamSpec::new().required(name);
    let chars = || ParamSpec::new().optional("chars", Value::None);
    Class::builder("str")
        .base(&OBJECT)
        .constructor(ParamSpec::new().optional("object", Value::from("")), |_, args| {
            protocol::to_str(args.get("object")).map(Value::from)
        })
        .method("lower", ParamSpec::new(), |this, _| {
            Ok(Value::from(receiver_str(this)?.to_lowercase()))
        })
        .method("upper", ParamSpec::new(), |this, _| {
            Ok(Value::from(receiver_str(this)?.to_uppercase()))
        })
        .method("strip", chars(), |this, args| strip(this, args, Trim::Both))
        .method("lstrip", chars(), |this, args| strip(this, args, Trim::Start))
        .method("rstrip", chars(), |this, args| strip(this, args, Trim::End))
        .method("startswith", one("prefix"), |this, args| {
            affix(this, args.get("prefix"), |s, p| s.starts_with(p))
        })
        .method("endswith", one("suffix"), |this, args| {
            affix(this, args.get("suffix"), |s, p| s.ends_with(p))
        })
        .method(
            "split",
            ParamSpec::new()
                .optional("sep", Value::None)
                .optional("maxsplit", Value::int(-1)),
            split,
        )
        .method("join", one("iterable"), join)
        .method(
            "replace",
            ParamSpec::new()
                .required("old")
                .required("new")
                .optional("count", Value::int(-1)),
            replace,
        )
        .build()
});

static TUPLE: LazyLock<Arc<Class>> = LazyLock::new(|| {
    Class::builder("tuple")
        .base(&OBJECT)
        .constructor(
            ParamSpec::new().optional("iterable", Value::tuple(vec![])),
            |_, args| protocol::iterate(args.get("iterable")).map(Value::tuple),
        )
        .method("index", ParamSpec::new().required("value"), sequence_index)
        .method("count", ParamSpec::new().required("value"), sequence_count)
        .build()
});

static LIST: LazyLock<Arc<Class>> = LazyLock::new(|| {
    Class::builder("list")
        .base(&OBJECT)
        .constructor(
            ParamSpec::new().optional("iterable", Value::tuple(vec![])),
            |_, args| protocol::iterate(args.get("iterable")).map(Value::list),
        )
        .method("index", ParamSpec::new().required("value"), sequence_index)
        .method("count", ParamSpec::new().required("value"), sequence_count)
        .build()
});

static DICT: LazyLock<Arc<Class>> = LazyLock::new(|| {
    Class::builder("dict")
        .base(&OBJECT)
        .constructor(
            ParamSpec::new()
                .optional("iterable", Value::None)
                .varkw("kwargs"),
            build_dict,
        )
        .method(
            "get",
            ParamSpec::new()
                .required("key")
                .optional("default", Value::None),
            |this, args| {
                Ok(protocol::mapping_get(this, args.get("key"))?
                    .unwrap_or_else(|| args.get("default").clone()))
            },
        )
        .method("has_key", ParamSpec::new().required("key"), |this, args| {
            protocol::contains(this, args.get("key")).map(Value::Bool)
        })
        .method("keys", ParamSpec::new(), |this, _| {
            Ok(Value::list(entries(this)?.into_iter().map(|(k, _)| k).collect()))
        })
        .method("values", ParamSpec::new(), |this, _| {
            Ok(Value::list(entries(this)?.into_iter().map(|(_, v)| v).collect()))
        })
        .method("items", ParamSpec::new(), |this, _| {
            Ok(Value::list(
                entries(this)?
                    .into_iter()
                    .map(|(k, v)| Value::tuple(vec![k, v]))
                    .collect(),
            ))
        })
        // Native maps expose their keys as attributes.
        .method("__getattr__", ParamSpec::new().required("name"), |this, args| {
            let name = args.get("name").as_str().unwrap_or_default();
            match this {
                Value::WrappedDict(map) if map.contains_key(name) => {
                    Ok(wrap(map[name].clone()))
                }
                _ => Err(EvalError::Attribute {
                    type_name: this.type_name().to_owned(),
                    attribute: name.to_owned(),
                }),
            }
        })
        .build()
});

static FUNCTION: LazyLock<Arc<Class>> =
    LazyLock::new(|| Class::builder("function").base(&OBJECT).build());

static INSTANCEMETHOD: LazyLock<Arc<Class>> =
    LazyLock::new(|| Class::builder("instancemethod").base(&OBJECT).build());

/// Class of namespace objects such as the injected `datetime` module.
pub static MODULE: LazyLock<Arc<Class>> =
    LazyLock::new(|| Class::builder("module").base(&OBJECT).build());

/// The class of any runtime value.
pub fn class_of(value: &Value) -> Arc<Class> {
    let class: &Arc<Class> = match value {
        Value::None => &NONE_TYPE,
        Value::NotImplemented => &NOT_IMPLEMENTED_TYPE,
        Value::Bool(_) => &BOOL,
        Value::Float(_) => &FLOAT,
        Value::Str(_) => &STR,
        Value::Tuple(_) => &TUPLE,
        Value::List(_) | Value::WrappedList(_) => &LIST,
        Value::Dict(_) | Value::WrappedDict(_) => &DICT,
        Value::Function(_) => &FUNCTION,
        Value::BoundMethod(_) => &INSTANCEMETHOD,
        Value::Class(_) => &TYPE,
        Value::Instance(inst) => return Arc::clone(&inst.class),
    };
    Arc::clone(class)
}

// ──────────────────────────────────────────────
// Namespace
// ──────────────────────────────────────────────

static NAMESPACE: LazyLock<BTreeMap<&'static str, Value>> = LazyLock::new(|| {
    let number = || ParamSpec::new().required("x");
    let mut names = BTreeMap::new();
    names.insert("None", Value::None);
    names.insert("True", Value::Bool(true));
    names.insert("False", Value::Bool(false));
    names.insert("NotImplemented", Value::NotImplemented);
    names.insert("type", Value::Class(Arc::clone(&TYPE)));
    names.insert("object", Value::Class(Arc::clone(&OBJECT)));
    names.insert("bool", Value::Class(Arc::clone(&BOOL)));
    names.insert("float", Value::Class(Arc::clone(&FLOAT)));
    names.insert("str", Value::Class(Arc::clone(&STR)));
    names.insert("unicode", Value::Class(Arc::clone(&STR)));
    names.insert("tuple", Value::Class(Arc::clone(&TUPLE)));
    names.insert("list", Value::Class(Arc::clone(&LIST)));
    names.insert("dict", Value::Class(Arc::clone(&DICT)));
    names.insert("abs", Function::native("abs", number(), abs));
    names.insert(
        "len",
        Function::native("len", ParamSpec::new().required("obj"), |args| {
            protocol::len(args.get("obj")).map(|n| Value::int(n as i64))
        }),
    );
    names.insert(
        "isinstance",
        Function::native(
            "isinstance",
            ParamSpec::new().required("object").required("classinfo"),
            |args| {
                let class = class_of(args.get("object"));
                matches_classinfo(&class, args.get("classinfo"), "isinstance").map(Value::Bool)
            },
        ),
    );
    names.insert(
        "issubclass",
        Function::native(
            "issubclass",
            ParamSpec::new().required("class").required("classinfo"),
            |args| match args.get("class") {
                Value::Class(class) => {
                    matches_classinfo(class, args.get("classinfo"), "issubclass").map(Value::Bool)
                }
                _ => Err(EvalError::type_error("issubclass() arg 1 must be a class")),
            },
        ),
    );
    names.insert(
        "round",
        Function::native(
            "round",
            ParamSpec::new()
                .required("number")
                .optional("ndigits", Value::int(0)),
            |args| {
                let number = to_number(args.get("number"), "round")?;
                let digits = args.get("ndigits").as_integer().ok_or_else(|| {
                    EvalError::type_error("round() ndigits must be an integer")
                })?;
                Ok(Value::Float(numeric::round_decimals(number, digits as i32)))
            },
        ),
    );
    names.insert(
        "int",
        Function::native("int", ParamSpec::new().optional("x", Value::int(0)), |args| {
            let n = match args.get("x") {
                Value::Str(s) => s.trim().parse::<i64>().map(|n| n as f64).map_err(|_| {
                    EvalError::value_error(format!("invalid literal for int() with base 10: '{s}'"))
                })?,
                other => to_number(other, "int")?.trunc(),
            };
            Ok(Value::Float(n))
        }),
    );
    names.insert(
        "min",
        Function::native("min", ParamSpec::new().varargs("args"), |args| {
            extreme(args, Op::Lt, "min")
        }),
    );
    names.insert(
        "max",
        Function::native("max", ParamSpec::new().varargs("args"), |args| {
            extreme(args, Op::Gt, "max")
        }),
    );
    names
});

/// Resolve a builtin name.
pub fn lookup(name: &str) -> Option<Value> {
    NAMESPACE.get(name).cloned()
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn to_number(value: &Value, callee: &str) -> Result<f64, EvalError> {
    match value {
        Value::Float(n) => Ok(*n),
        Value::Bool(b) => Ok(f64::from(u8::from(*b))),
        other => Err(EvalError::type_error(format!(
            "{callee}() argument must be a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Str(s) => s.trim().parse::<f64>().map_err(|_| {
            EvalError::value_error(format!("could not convert string to float: '{s}'"))
        }),
        other => to_number(other, "float"),
    }
}

fn abs(args: &BoundArgs<'_>) -> Result<Value, EvalError> {
    let x = args.get("x");
    if let Value::Instance(inst) = x {
        if let Some(m) = inst.class.find_method("__abs__") {
            return protocol::call_method(x, m, vec![], vec![]);
        }
    }
    Ok(Value::Float(to_number(x, "abs")?.abs()))
}

fn matches_classinfo(class: &Class, classinfo: &Value, callee: &str) -> Result<bool, EvalError> {
    match classinfo {
        Value::Class(target) => Ok(class.is_subclass_of(target)),
        Value::Tuple(options) => {
            for option in options.iter() {
                if matches_classinfo(class, option, callee)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(EvalError::type_error(format!(
            "{callee}() arg 2 must be a class, type, or tuple of classes and types"
        ))),
    }
}

fn extreme(args: &BoundArgs<'_>, op: Op, callee: &str) -> Result<Value, EvalError> {
    let candidates = match args.rest() {
        [single] => protocol::iterate(single)?,
        many => many.to_vec(),
    };
    let mut candidates = candidates.into_iter();
    let Some(mut best) = candidates.next() else {
        return Err(EvalError::value_error(format!(
            "{callee}() arg is an empty sequence"
        )));
    };
    for candidate in candidates {
        if protocol::is_truthy(&protocol::dispatch(op, &candidate, &best)?)? {
            best = candidate;
        }
    }
    Ok(best)
}

fn build_dict(_: &Arc<Class>, args: &BoundArgs<'_>) -> Result<Value, EvalError> {
    let mut dict = Dict::new();
    let source = args.get("iterable");
    if let Some(entries) = protocol::mapping_entries(source) {
        for (k, v) in entries {
            dict.insert(k, v)?;
        }
    } else if !source.is_none() {
        for (i, pair) in protocol::iterate(source)?.iter().enumerate() {
            match protocol::iterate(pair)?.as_slice() {
                [k, v] => dict.insert(k.clone(), v.clone())?,
                other => {
                    return Err(EvalError::value_error(format!(
                        "dictionary update sequence element #{i} has length {}; 2 is required",
                        other.len()
                    )))
                }
            }
        }
    }
    for (name, value) in args.kwrest() {
        dict.insert(Value::from(name.as_str()), value.clone())?;
    }
    Ok(Value::dict(dict))
}

fn entries(this: &Value) -> Result<Vec<(Value, Value)>, EvalError> {
    protocol::mapping_entries(this).ok_or_else(|| {
        EvalError::type_error(format!(
            "descriptor requires a 'dict' object but received a '{}'",
            this.type_name()
        ))
    })
}

fn sequence_index(this: &Value, args: &BoundArgs<'_>) -> Result<Value, EvalError> {
    for (i, item) in protocol::iterate(this)?.iter().enumerate() {
        if protocol::equals(item, args.get("value"))? {
            return Ok(Value::int(i as i64));
        }
    }
    Err(EvalError::value_error(format!(
        "{}.index(x): x not in {}",
        this.type_name(),
        this.type_name()
    )))
}

fn sequence_count(this: &Value, args: &BoundArgs<'_>) -> Result<Value, EvalError> {
    let mut count = 0i64;
    for item in protocol::iterate(this)? {
        if protocol::equals(&item, args.get("value"))? {
            count += 1;
        }
    }
    Ok(Value::int(count))
}

// ── str methods ──────────────────────────────────────────────────────

fn receiver_str(this: &Value) -> Result<&str, EvalError> {
    this.as_str().ok_or_else(|| {
        EvalError::type_error(format!(
            "descriptor requires a 'str' object but received a '{}'",
            this.type_name()
        ))
    })
}

fn str_arg<'v>(value: &'v Value, what: &str) -> Result<&'v str, EvalError> {
    value.as_str().ok_or_else(|| {
        EvalError::type_error(format!(
            "{what} must be str, not {}",
            value.type_name()
        ))
    })
}

enum Trim {
    Both,
    Start,
    End,
}

fn strip(this: &Value, args: &BoundArgs<'_>, side: Trim) -> Result<Value, EvalError> {
    let s = receiver_str(this)?;
    let stripped = match args.get("chars") {
        Value::None => match side {
            Trim::Both => s.trim(),
            Trim::Start => s.trim_start(),
            Trim::End => s.trim_end(),
        },
        chars => {
            let set = str_arg(chars, "strip arg")?;
            let pattern = |c: char| set.contains(c);
            match side {
                Trim::Both => s.trim_matches(pattern),
                Trim::Start => s.trim_start_matches(pattern),
                Trim::End => s.trim_end_matches(pattern),
            }
        }
    };
    Ok(Value::from(stripped))
}

fn affix(this: &Value, affix: &Value, test: fn(&str, &str) -> bool) -> Result<Value, EvalError> {
    let s = receiver_str(this)?;
    match affix {
        Value::Tuple(options) => {
            for option in options.iter() {
                if test(s, str_arg(option, "affix")?) {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        other => Ok(Value::Bool(test(s, str_arg(other, "affix")?))),
    }
}

fn split(this: &Value, args: &BoundArgs<'_>) -> Result<Value, EvalError> {
    let s = receiver_str(this)?;
    let limit = args
        .get("maxsplit")
        .as_integer()
        .and_then(|n| usize::try_from(n).ok());
    let parts: Vec<Value> = match args.get("sep") {
        Value::None => split_whitespace(s, limit).into_iter().map(Value::from).collect(),
        sep => {
            let sep = str_arg(sep, "separator")?;
            if sep.is_empty() {
                return Err(EvalError::value_error("empty separator"));
            }
            match limit {
                Some(n) => s.splitn(n + 1, sep).map(Value::from).collect(),
                None => s.split(sep).map(Value::from).collect(),
            }
        }
    };
    Ok(Value::list(parts))
}

fn split_whitespace(s: &str, limit: Option<usize>) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if limit == Some(parts.len()) {
            parts.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(i) => {
                parts.push(&rest[..i]);
                rest = rest[i..].trim_start();
            }
            None => {
                parts.push(rest);
                break;
            }
        }
    }
    parts
}

fn join(this: &Value, args: &BoundArgs<'_>) -> Result<Value, EvalError> {
    let sep = receiver_str(this)?;
    let items = protocol::iterate(args.get("iterable"))?;
    let mut parts = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Str(s) => parts.push(s.to_string()),
            other => {
                return Err(EvalError::type_error(format!(
                    "sequence item {i}: expected string, {} found",
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::from(parts.join(sep)))
}

fn replace(this: &Value, args: &BoundArgs<'_>) -> Result<Value, EvalError> {
    let s = receiver_str(this)?;
    let old = str_arg(args.get("old"), "replace() argument 1")?;
    let new = str_arg(args.get("new"), "replace() argument 2")?;
    let replaced = match args.get("count").as_integer() {
        Some(n) if n >= 0 => s.replacen(old, new, n as usize),
        _ => s.replace(old, new),
    };
    Ok(Value::from(replaced))
}
