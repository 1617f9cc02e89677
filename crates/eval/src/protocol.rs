//! Python data-model protocol over runtime values: operator dispatch with
//! reflection and fallbacks, truthiness, containment, length, item and
//! attribute access, calls, hashing and string conversion.

use std::cmp::Ordering;
use std::sync::Arc;

use quill_core::{format_number, BinaryOp, CompareOp};

use crate::assemble::wrap;
use crate::builtins::class_of;
use crate::evaluator::call_lambda;
use crate::numeric;
use crate::types::{
    BoundMethod, EvalError, FunctionBody, HashKey, Method, MethodKind, Value,
};

// ──────────────────────────────────────────────
// Binary operators
// ──────────────────────────────────────────────

/// Operators dispatched through forward/reflected special methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Arith(BinaryOp),
}

impl Op {
    /// Forward and reflected special method names.
    pub fn methods(self) -> (&'static str, &'static str) {
        match self {
            Op::Eq => ("__eq__", "__eq__"),
            Op::Ne => ("__ne__", "__ne__"),
            Op::Lt => ("__lt__", "__gt__"),
            Op::Le => ("__le__", "__ge__"),
            Op::Gt => ("__gt__", "__lt__"),
            Op::Ge => ("__ge__", "__le__"),
            Op::Arith(op) => match op {
                BinaryOp::Add => ("__add__", "__radd__"),
                BinaryOp::Sub => ("__sub__", "__rsub__"),
                BinaryOp::Mul => ("__mul__", "__rmul__"),
                BinaryOp::Div => ("__div__", "__rdiv__"),
                BinaryOp::FloorDiv => ("__floordiv__", "__rfloordiv__"),
                BinaryOp::Mod => ("__mod__", "__rmod__"),
                BinaryOp::Pow => ("__pow__", "__rpow__"),
                BinaryOp::LShift => ("__lshift__", "__rlshift__"),
                BinaryOp::RShift => ("__rshift__", "__rrshift__"),
                BinaryOp::BitAnd => ("__and__", "__rand__"),
                BinaryOp::BitXor => ("__xor__", "__rxor__"),
                BinaryOp::BitOr => ("__or__", "__ror__"),
            },
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Arith(op) => op.text(),
        }
    }

    fn accepts(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Op::Lt, Some(Ordering::Less)) => true,
            (Op::Le, Some(Ordering::Less | Ordering::Equal)) => true,
            (Op::Gt, Some(Ordering::Greater)) => true,
            (Op::Ge, Some(Ordering::Greater | Ordering::Equal)) => true,
            (Op::Eq, Some(Ordering::Equal)) => true,
            (Op::Ne, Some(Ordering::Less | Ordering::Greater) | None) => true,
            _ => false,
        }
    }
}

pub fn binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value, EvalError> {
    dispatch(Op::Arith(op), a, b)
}

/// Rich comparison for the ordering and equality comparators.
pub fn compare(op: CompareOp, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let op = match op {
        CompareOp::Eq => Op::Eq,
        CompareOp::Ne => Op::Ne,
        CompareOp::Lt => Op::Lt,
        CompareOp::Le => Op::Le,
        CompareOp::Gt => Op::Gt,
        CompareOp::Ge => Op::Ge,
        other => {
            return Err(EvalError::Syntax {
                message: format!("'{}' is not a rich comparison", other.text()),
            })
        }
    };
    dispatch(op, a, b)
}

pub fn equals(a: &Value, b: &Value) -> Result<bool, EvalError> {
    is_truthy(&dispatch(Op::Eq, a, b)?)
}

/// Resolve `a OP b`: forward method of `a`, then reflected method of `b`,
/// then the comparison fallbacks, else a `TypeError`.
pub fn dispatch(op: Op, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let (forward, reflected) = op.methods();
    if let Some(result) = native_forward(op, a, b)? {
        return Ok(result);
    }
    if let Some(result) = call_operator(a, forward, b)? {
        return Ok(result);
    }
    if let Some(result) = native_reflected(op, b, a)? {
        return Ok(result);
    }
    if let Some(result) = call_operator(b, reflected, a)? {
        return Ok(result);
    }
    match op {
        Op::Eq => Ok(Value::Bool(a.identical(b))),
        Op::Ne => Ok(Value::Bool(!a.identical(b))),
        Op::Lt | Op::Le | Op::Gt | Op::Ge => {
            let ordering = a.type_name().cmp(b.type_name());
            Ok(Value::Bool(op.accepts(Some(ordering))))
        }
        Op::Arith(_) => Err(EvalError::type_error(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// Call a special method on an instance. `None` when the method is absent
/// or returns `NotImplemented`.
fn call_operator(receiver: &Value, name: &str, other: &Value) -> Result<Option<Value>, EvalError> {
    let Value::Instance(inst) = receiver else {
        return Ok(None);
    };
    let Some(method) = inst.class.find_method(name) else {
        return Ok(None);
    };
    match call_method(receiver, method, vec![other.clone()], vec![])? {
        Value::NotImplemented => Ok(None),
        result => Ok(Some(result)),
    }
}

fn native_forward(op: Op, a: &Value, b: &Value) -> Result<Option<Value>, EvalError> {
    match op {
        Op::Eq => Ok(native_eq(a, b)?.map(Value::Bool)),
        Op::Ne => Ok(native_eq(a, b)?.map(|eq| Value::Bool(!eq))),
        Op::Lt | Op::Le | Op::Gt | Op::Ge => native_order(op, a, b),
        Op::Arith(bop) => native_arith(bop, a, b),
    }
}

fn native_reflected(op: Op, receiver: &Value, other: &Value) -> Result<Option<Value>, EvalError> {
    match (op, receiver, other) {
        (Op::Arith(BinaryOp::Mul), Value::Str(_) | Value::Tuple(_) | Value::List(_) | Value::WrappedList(_), Value::Float(_)) => {
            repeat(receiver, other).map(Some)
        }
        _ => Ok(None),
    }
}

// ── Equality and ordering of builtin kinds ───────────────────────────

fn native_eq(a: &Value, b: &Value) -> Result<Option<bool>, EvalError> {
    Ok(Some(match (a, b) {
        (Value::None, Value::None) | (Value::NotImplemented, Value::NotImplemented) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Tuple(x), Value::Tuple(y)) => sequences_equal(x, y)?,
        _ => match (list_items(a), list_items(b)) {
            (Some(x), Some(y)) => sequences_equal(&x, &y)?,
            _ => match (mapping_entries(a), mapping_entries(b)) {
                (Some(x), Some(_)) => mappings_equal(&x, b)?,
                _ => return Ok(None),
            },
        },
    }))
}

fn sequences_equal(x: &[Value], y: &[Value]) -> Result<bool, EvalError> {
    if x.len() != y.len() {
        return Ok(false);
    }
    for (a, b) in x.iter().zip(y) {
        if !equals(a, b)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn mappings_equal(entries: &[(Value, Value)], other: &Value) -> Result<bool, EvalError> {
    if entries.len() != len(other)? {
        return Ok(false);
    }
    for (key, value) in entries {
        match mapping_get(other, key)? {
            Some(found) if equals(value, &found)? => {}
            _ => return Ok(false),
        }
    }
    Ok(true)
}

fn native_order(op: Op, a: &Value, b: &Value) -> Result<Option<Value>, EvalError> {
    let ordering = match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Tuple(x), Value::Tuple(y)) => return order_sequences(op, x, y).map(Some),
        _ => match (list_items(a), list_items(b)) {
            (Some(x), Some(y)) => return order_sequences(op, &x, &y).map(Some),
            _ => return Ok(None),
        },
    };
    Ok(Some(Value::Bool(op.accepts(ordering))))
}

/// Lexicographic ordering: the first unequal pair decides, else length.
fn order_sequences(op: Op, x: &[Value], y: &[Value]) -> Result<Value, EvalError> {
    for (a, b) in x.iter().zip(y) {
        if !equals(a, b)? {
            return dispatch(op, a, b);
        }
    }
    Ok(Value::Bool(op.accepts(Some(x.len().cmp(&y.len())))))
}

// ── Arithmetic of builtin kinds ──────────────────────────────────────

fn native_arith(op: BinaryOp, a: &Value, b: &Value) -> Result<Option<Value>, EvalError> {
    match (op, a, b) {
        (_, Value::Float(x), Value::Float(y)) => float_arith(op, *x, *y),
        (BinaryOp::BitAnd, Value::Bool(x), Value::Bool(y)) => Ok(Some(Value::Bool(x & y))),
        (BinaryOp::BitOr, Value::Bool(x), Value::Bool(y)) => Ok(Some(Value::Bool(x | y))),
        (BinaryOp::BitXor, Value::Bool(x), Value::Bool(y)) => Ok(Some(Value::Bool(x ^ y))),
        (BinaryOp::Add, Value::Str(x), Value::Str(y)) => Ok(Some(Value::str(format!("{x}{y}")))),
        (BinaryOp::Add, Value::Tuple(x), Value::Tuple(y)) => {
            Ok(Some(Value::tuple(x.iter().chain(y.iter()).cloned().collect())))
        }
        (BinaryOp::Add, _, _) => match (list_items(a), list_items(b)) {
            (Some(x), Some(y)) => Ok(Some(Value::list(x.into_iter().chain(y).collect()))),
            _ => Ok(None),
        },
        (BinaryOp::Mul, Value::Str(_) | Value::Tuple(_) | Value::List(_) | Value::WrappedList(_), Value::Float(_)) => {
            repeat(a, b).map(Some)
        }
        _ => Ok(None),
    }
}

fn float_arith(op: BinaryOp, x: f64, y: f64) -> Result<Option<Value>, EvalError> {
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float division by zero"));
            }
            x / y
        }
        BinaryOp::FloorDiv => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float divmod()"));
            }
            numeric::divmod(x, y).0
        }
        BinaryOp::Mod => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float modulo"));
            }
            numeric::divmod(x, y).1
        }
        BinaryOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(EvalError::zero_division(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if x < 0.0 && y.fract() != 0.0 {
                return Err(EvalError::value_error(
                    "negative number cannot be raised to a fractional power",
                ));
            }
            x.powf(y)
        }
        BinaryOp::LShift | BinaryOp::RShift | BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr => {
            let (Some(x), Some(y)) = (integral(x), integral(y)) else {
                return Ok(None);
            };
            match op {
                BinaryOp::LShift | BinaryOp::RShift if y < 0 => {
                    return Err(EvalError::value_error("negative shift count"));
                }
                BinaryOp::LShift => x as f64 * 2f64.powi(y.min(i32::MAX as i64) as i32),
                BinaryOp::RShift => (x as f64 / 2f64.powi(y.min(i32::MAX as i64) as i32)).floor(),
                BinaryOp::BitAnd => (x & y) as f64,
                BinaryOp::BitXor => (x ^ y) as f64,
                _ => (x | y) as f64,
            }
        }
    };
    Ok(Some(Value::Float(result)))
}

fn integral(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0).then_some(n as i64)
}

/// `sequence * count`
fn repeat(sequence: &Value, count: &Value) -> Result<Value, EvalError> {
    let Some(n) = count.as_float().and_then(integral) else {
        return Err(EvalError::type_error(format!(
            "can't multiply sequence by non-int of type '{}'",
            count.type_name()
        )));
    };
    let n = n.max(0) as usize;
    Ok(match sequence {
        Value::Str(s) => Value::str(s.repeat(n)),
        Value::Tuple(items) => Value::tuple(repeat_items(items, n)),
        other => Value::list(repeat_items(&list_items(other).unwrap_or_default(), n)),
    })
}

fn repeat_items(items: &[Value], n: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len() * n);
    for _ in 0..n {
        out.extend_from_slice(items);
    }
    out
}

// ──────────────────────────────────────────────
// Unary operators
// ──────────────────────────────────────────────

fn unary(value: &Value, method: &str, symbol: &str) -> Result<Value, EvalError> {
    if let Value::Instance(inst) = value {
        if let Some(m) = inst.class.find_method(method) {
            return call_method(value, m, vec![], vec![]);
        }
    }
    Err(EvalError::type_error(format!(
        "bad operand type for unary {symbol}: '{}'",
        value.type_name()
    )))
}

pub fn negative(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Float(n) => Ok(Value::Float(-n)),
        Value::Bool(b) => Ok(Value::int(-i64::from(*b))),
        other => unary(other, "__neg__", "-"),
    }
}

pub fn positive(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Float(n) => Ok(Value::Float(*n)),
        Value::Bool(b) => Ok(Value::int(i64::from(*b))),
        other => unary(other, "__pos__", "+"),
    }
}

pub fn invert(value: &Value) -> Result<Value, EvalError> {
    match value.as_integer() {
        Some(n) => Ok(Value::int(-n - 1)),
        None => unary(value, "__invert__", "~"),
    }
}

// ──────────────────────────────────────────────
// Truthiness, length, containment, iteration
// ──────────────────────────────────────────────

pub fn is_truthy(value: &Value) -> Result<bool, EvalError> {
    Ok(match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Float(n) => *n != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::Tuple(items) | Value::List(items) => !items.is_empty(),
        Value::Dict(dict) => !dict.is_empty(),
        Value::WrappedDict(map) => !map.is_empty(),
        Value::WrappedList(items) => !items.is_empty(),
        Value::Instance(inst) => {
            if let Some(m) = inst.class.find_method("__nonzero__") {
                return match call_method(value, m, vec![], vec![])? {
                    Value::Bool(b) => Ok(b),
                    other => Err(EvalError::type_error(format!(
                        "__nonzero__ should return bool, returned {}",
                        other.type_name()
                    ))),
                };
            }
            if inst.class.find_method("__len__").is_some() {
                return Ok(len(value)? != 0);
            }
            true
        }
        Value::NotImplemented | Value::Function(_) | Value::BoundMethod(_) | Value::Class(_) => {
            true
        }
    })
}

pub fn len(value: &Value) -> Result<usize, EvalError> {
    match value {
        Value::Str(s) => Ok(s.chars().count()),
        Value::Tuple(items) | Value::List(items) => Ok(items.len()),
        Value::Dict(dict) => Ok(dict.len()),
        Value::WrappedDict(map) => Ok(map.len()),
        Value::WrappedList(items) => Ok(items.len()),
        Value::Instance(inst) => {
            if let Some(m) = inst.class.find_method("__len__") {
                let result = call_method(value, m, vec![], vec![])?;
                return result
                    .as_integer()
                    .filter(|n| *n >= 0)
                    .map(|n| n as usize)
                    .ok_or_else(|| EvalError::type_error("__len__ should return a non-negative integer"));
            }
            Err(no_len(value))
        }
        other => Err(no_len(other)),
    }
}

fn no_len(value: &Value) -> EvalError {
    EvalError::type_error(format!(
        "object of type '{}' has no len()",
        value.type_name()
    ))
}

/// `item in container`
pub fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match container {
        Value::Str(s) => match item {
            Value::Str(needle) => Ok(s.contains(needle.as_ref())),
            other => Err(EvalError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::Tuple(items) | Value::List(items) => {
            for candidate in items.iter() {
                if equals(candidate, item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::WrappedList(items) => {
            for candidate in items.iter() {
                if equals(&wrap(candidate.clone()), item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Dict(dict) => dict.contains_key(item),
        Value::WrappedDict(map) => Ok(item.as_str().is_some_and(|key| map.contains_key(key))),
        Value::Instance(inst) => match inst.class.find_method("__contains__") {
            Some(m) => is_truthy(&call_method(container, m, vec![item.clone()], vec![])?),
            None => Err(not_iterable(container)),
        },
        other => Err(EvalError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn not_iterable(value: &Value) -> EvalError {
    EvalError::type_error(format!("'{}' object is not iterable", value.type_name()))
}

/// Elements of any iterable kind, materialized.
pub fn iterate(value: &Value) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
        Value::Tuple(items) | Value::List(items) => Ok(items.to_vec()),
        Value::WrappedList(items) => Ok(items.iter().cloned().map(wrap).collect()),
        Value::Dict(dict) => Ok(dict.keys().cloned().collect()),
        Value::WrappedDict(map) => Ok(map.keys().map(|k| Value::str(k.as_str())).collect()),
        other => Err(not_iterable(other)),
    }
}

/// Items of a list or wrapped native list.
pub fn list_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::List(items) => Some(items.to_vec()),
        Value::WrappedList(items) => Some(items.iter().cloned().map(wrap).collect()),
        _ => None,
    }
}

/// Entries of a dict or wrapped native map.
pub fn mapping_entries(value: &Value) -> Option<Vec<(Value, Value)>> {
    match value {
        Value::Dict(dict) => Some(dict.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Value::WrappedDict(map) => Some(
            map.iter()
                .map(|(k, v)| (Value::str(k.as_str()), wrap(v.clone())))
                .collect(),
        ),
        _ => None,
    }
}

/// Look up `key` in a dict or wrapped native map.
pub fn mapping_get(mapping: &Value, key: &Value) -> Result<Option<Value>, EvalError> {
    match mapping {
        Value::Dict(dict) => Ok(dict.get(key)?.cloned()),
        Value::WrappedDict(map) => Ok(key
            .as_str()
            .and_then(|k| map.get(k))
            .cloned()
            .map(wrap)),
        _ => Ok(None),
    }
}

// ──────────────────────────────────────────────
// Items
// ──────────────────────────────────────────────

pub fn get_item(object: &Value, index: &Value) -> Result<Value, EvalError> {
    match object {
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = sequence_index(object, chars.len(), index)?;
            Ok(Value::str(chars[i].to_string()))
        }
        Value::Tuple(items) | Value::List(items) => {
            let i = sequence_index(object, items.len(), index)?;
            Ok(items[i].clone())
        }
        Value::WrappedList(items) => {
            let i = sequence_index(object, items.len(), index)?;
            Ok(wrap(items[i].clone()))
        }
        Value::Dict(_) | Value::WrappedDict(_) => {
            mapping_get(object, index)?.ok_or_else(|| EvalError::Key {
                key: repr(index).unwrap_or_else(|_| index.type_name().to_owned()),
            })
        }
        Value::Instance(inst) => match inst.class.find_method("__getitem__") {
            Some(m) => call_method(object, m, vec![index.clone()], vec![]),
            None => Err(not_subscriptable(object)),
        },
        other => Err(not_subscriptable(other)),
    }
}

fn not_subscriptable(value: &Value) -> EvalError {
    EvalError::type_error(format!(
        "'{}' object is not subscriptable",
        value.type_name()
    ))
}

fn sequence_index(sequence: &Value, len: usize, index: &Value) -> Result<usize, EvalError> {
    let Some(i) = index.as_integer() else {
        return Err(EvalError::type_error(format!(
            "{} indices must be integers, not {}",
            sequence.type_name(),
            index.type_name()
        )));
    };
    let resolved = if i < 0 { i + len as i64 } else { i };
    if resolved < 0 || resolved >= len as i64 {
        return Err(EvalError::Index {
            message: format!("{} index out of range", sequence.type_name()),
        });
    }
    Ok(resolved as usize)
}

// ──────────────────────────────────────────────
// Attributes and calls
// ──────────────────────────────────────────────

/// Attribute lookup: instance fields, then methods bound to the receiver
/// (class methods bind to the class), then the class `__getattr__` hook.
pub fn get_attr(object: &Value, name: &str) -> Result<Value, EvalError> {
    if let Value::Instance(inst) = object {
        if let Some(value) = inst.field(name) {
            return Ok(value.clone());
        }
    }
    if let Value::Class(class) = object {
        if name == "__name__" {
            return Ok(Value::str(class.name));
        }
        if let Some(method) = class.find_method(name) {
            return Ok(bind(object.clone(), method));
        }
        return Err(EvalError::Attribute {
            type_name: class.name.to_owned(),
            attribute: name.to_owned(),
        });
    }
    let class = class_of(object);
    if name == "__class__" {
        return Ok(Value::Class(class));
    }
    if let Some(method) = class.find_method(name) {
        let receiver = match method.kind {
            MethodKind::Class => Value::Class(Arc::clone(&class)),
            MethodKind::Instance => object.clone(),
        };
        return Ok(bind(receiver, method));
    }
    if let Some(hook) = class.find_method("__getattr__") {
        return call_method(object, hook, vec![Value::str(name)], vec![]);
    }
    Err(EvalError::Attribute {
        type_name: object.type_name().to_owned(),
        attribute: name.to_owned(),
    })
}

fn bind(receiver: Value, method: &Arc<Method>) -> Value {
    Value::BoundMethod(Arc::new(BoundMethod {
        receiver,
        method: Arc::clone(method),
    }))
}

pub fn call_method(
    receiver: &Value,
    method: &Method,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> Result<Value, EvalError> {
    let bound = method.params.bind(method.name, args, kwargs)?;
    (method.func)(receiver, &bound)
}

/// Invoke any callable value.
pub fn call(callee: &Value, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value, EvalError> {
    match callee {
        Value::Function(function) => {
            let bound = function.params.bind(&function.name, args, kwargs)?;
            match &function.body {
                FunctionBody::Native(func) => func(&bound),
                FunctionBody::Lambda { body, closure } => call_lambda(body, closure, &bound),
            }
        }
        Value::BoundMethod(bound) => call_method(&bound.receiver, &bound.method, args, kwargs),
        Value::Class(class) => match class.constructor() {
            Some((params, construct)) => {
                let bound = params.bind(class.name, args, kwargs)?;
                construct(class, &bound)
            }
            None => Err(EvalError::type_error(format!(
                "cannot create '{}' instances",
                class.name
            ))),
        },
        Value::Instance(inst) => match inst.class.find_method("__call__") {
            Some(m) => call_method(callee, m, args, kwargs),
            None => Err(not_callable(callee)),
        },
        other => Err(not_callable(other)),
    }
}

fn not_callable(value: &Value) -> EvalError {
    EvalError::type_error(format!("'{}' object is not callable", value.type_name()))
}

// ──────────────────────────────────────────────
// Hashing
// ──────────────────────────────────────────────

pub fn hash_key(value: &Value) -> Result<HashKey, EvalError> {
    Ok(match value {
        Value::None => HashKey::None,
        Value::NotImplemented => HashKey::Identity(0),
        Value::Bool(b) => HashKey::Bool(*b),
        Value::Float(n) => HashKey::float(*n),
        Value::Str(s) => HashKey::Str(s.to_string()),
        Value::Tuple(items) => HashKey::Tuple(items.iter().map(hash_key).collect::<Result<_, _>>()?),
        Value::Function(f) => HashKey::Identity(f.id),
        Value::Class(c) => HashKey::Identity(c.id),
        Value::BoundMethod(m) => HashKey::Identity(Arc::as_ptr(m) as usize as u64),
        Value::Instance(inst) => match inst.class.find_method("__hash__") {
            Some(m) => {
                let hashed = call_method(value, m, vec![], vec![])?;
                HashKey::Instance(inst.class.id, Box::new(hash_key(&hashed)?))
            }
            None => HashKey::Identity(inst.id),
        },
        Value::List(_) | Value::WrappedList(_) | Value::Dict(_) | Value::WrappedDict(_) => {
            return Err(EvalError::type_error(format!(
                "unhashable type: '{}'",
                value.type_name()
            )))
        }
    })
}

// ──────────────────────────────────────────────
// String conversion
// ──────────────────────────────────────────────

/// `str(value)`
pub fn to_str(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Str(s) => Ok(s.to_string()),
        Value::Instance(inst) => match inst.class.find_method("__str__") {
            Some(m) => match call_method(value, m, vec![], vec![])? {
                Value::Str(s) => Ok(s.to_string()),
                other => Err(EvalError::type_error(format!(
                    "__str__ returned non-string (type {})",
                    other.type_name()
                ))),
            },
            None => repr(value),
        },
        other => repr(other),
    }
}

/// `repr(value)`
pub fn repr(value: &Value) -> Result<String, EvalError> {
    Ok(match value {
        Value::None => "None".to_owned(),
        Value::NotImplemented => "NotImplemented".to_owned(),
        Value::Bool(true) => "True".to_owned(),
        Value::Bool(false) => "False".to_owned(),
        Value::Float(n) => format_number(*n),
        Value::Str(s) => quote(s),
        Value::Tuple(items) if items.len() == 1 => format!("({},)", repr(&items[0])?),
        Value::Tuple(items) => format!("({})", join_repr(items)?),
        Value::List(_) | Value::WrappedList(_) => {
            format!("[{}]", join_repr(&list_items(value).unwrap_or_default())?)
        }
        Value::Dict(_) | Value::WrappedDict(_) => {
            let mut parts = Vec::new();
            for (k, v) in mapping_entries(value).unwrap_or_default() {
                parts.push(format!("{}: {}", repr(&k)?, repr(&v)?));
            }
            format!("{{{}}}", parts.join(", "))
        }
        Value::Function(f) => format!("<function {}>", f.name),
        Value::BoundMethod(m) => format!(
            "<bound method {}.{}>",
            m.receiver.type_name(),
            m.method.name
        ),
        Value::Class(c) => format!("<type '{}'>", c.name),
        Value::Instance(inst) => match inst.class.find_method("__repr__") {
            Some(m) => match call_method(value, m, vec![], vec![])? {
                Value::Str(s) => s.to_string(),
                other => {
                    return Err(EvalError::type_error(format!(
                        "__repr__ returned non-string (type {})",
                        other.type_name()
                    )))
                }
            },
            None => format!("<{} object>", inst.class.name),
        },
    })
}

fn join_repr(items: &[Value]) -> Result<String, EvalError> {
    let parts = items.iter().map(repr).collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(", "))
}

/// Python-style quoted string.
fn quote(s: &str) -> String {
    let q = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(q);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == q => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(q);
    out
}
