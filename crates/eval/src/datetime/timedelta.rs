//! `datetime.timedelta`: a signed duration normalized to days, seconds
//! (`0..86400`) and microseconds (`0..1_000_000`).

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use crate::builtins::OBJECT;
use crate::types::{BoundArgs, Class, EvalError, Instance, ParamSpec, Value};

use super::{compare_by, number_arg, other, rich_comparisons};

pub(crate) const MICROS_PER_SECOND: i128 = 1_000_000;
pub(crate) const MICROS_PER_DAY: i128 = 86_400 * MICROS_PER_SECOND;
const MAX_DAYS: i128 = 999_999_999;

pub static TIMEDELTA: LazyLock<Arc<Class>> = LazyLock::new(|| {
    let params = ParamSpec::new()
        .optional("days", Value::int(0))
        .optional("seconds", Value::int(0))
        .optional("microseconds", Value::int(0))
        .optional("milliseconds", Value::int(0))
        .optional("minutes", Value::int(0))
        .optional("hours", Value::int(0))
        .optional("weeks", Value::int(0));
    let builder = Class::builder("timedelta")
        .base(&OBJECT)
        .constructor(params, |_, args| construct(args))
        .method("__add__", other(), |this, args| {
            with_other(this, args, |a, b| timedelta(a + b))
        })
        .method("__radd__", other(), |this, args| {
            with_other(this, args, |a, b| timedelta(b + a))
        })
        .method("__sub__", other(), |this, args| {
            with_other(this, args, |a, b| timedelta(a - b))
        })
        .method("__rsub__", other(), |this, args| {
            with_other(this, args, |a, b| timedelta(b - a))
        })
        .method("__neg__", ParamSpec::new(), |this, _| timedelta(-micros(this)?))
        .method("__pos__", ParamSpec::new(), |this, _| timedelta(micros(this)?))
        .method("__abs__", ParamSpec::new(), |this, _| timedelta(micros(this)?.abs()))
        .method("__mul__", other(), |this, args| scale(this, args.get("other")))
        .method("__rmul__", other(), |this, args| scale(this, args.get("other")))
        .method("__div__", other(), |this, args| divide(this, args.get("other"), false))
        .method("__floordiv__", other(), |this, args| {
            divide(this, args.get("other"), true)
        })
        .method("total_seconds", ParamSpec::new(), |this, _| {
            Ok(Value::Float(micros(this)? as f64 / MICROS_PER_SECOND as f64))
        })
        .method("__nonzero__", ParamSpec::new(), |this, _| {
            Ok(Value::Bool(micros(this)? != 0))
        })
        .method("__hash__", ParamSpec::new(), |this, _| {
            Ok(Value::str(micros(this)?.to_string()))
        })
        .method("__str__", ParamSpec::new(), |this, _| {
            Ok(Value::from(render(micros(this)?)))
        })
        .method("__repr__", ParamSpec::new(), |this, _| {
            let (days, seconds, microseconds) = split(micros(this)?);
            Ok(Value::from(format!(
                "datetime.timedelta({days}, {seconds}, {microseconds})"
            )))
        });
    rich_comparisons!(builder, total_micros)
        .to_native(|inst| {
            let total = micros_of(inst)?;
            Ok(serde_json::json!(total as f64 / MICROS_PER_SECOND as f64))
        })
        .build()
});

fn construct(args: &BoundArgs<'_>) -> Result<Value, EvalError> {
    let seconds = number_arg(args, "weeks")? * 7.0 * 86_400.0
        + number_arg(args, "days")? * 86_400.0
        + number_arg(args, "hours")? * 3_600.0
        + number_arg(args, "minutes")? * 60.0
        + number_arg(args, "seconds")?;
    let total = seconds * 1e6
        + number_arg(args, "milliseconds")? * 1e3
        + number_arg(args, "microseconds")?;
    if !total.is_finite() {
        return Err(EvalError::value_error("cannot convert float NaN or infinity to timedelta"));
    }
    timedelta(total.round() as i128)
}

/// Build a normalized timedelta from a signed microsecond count.
pub(crate) fn timedelta(total: i128) -> Result<Value, EvalError> {
    let (days, seconds, microseconds) = split(total);
    if days.abs() > MAX_DAYS {
        return Err(EvalError::value_error(format!(
            "days={days}; must have magnitude <= {MAX_DAYS}"
        )));
    }
    let mut fields = BTreeMap::new();
    fields.insert("days".to_owned(), Value::int(days as i64));
    fields.insert("seconds".to_owned(), Value::int(seconds as i64));
    fields.insert("microseconds".to_owned(), Value::int(microseconds as i64));
    Ok(Instance::new(&TIMEDELTA, fields))
}

fn split(total: i128) -> (i128, i128, i128) {
    let days = total.div_euclid(MICROS_PER_DAY);
    let rest = total.rem_euclid(MICROS_PER_DAY);
    (days, rest / MICROS_PER_SECOND, rest % MICROS_PER_SECOND)
}

/// Signed microsecond count of a timedelta, `None` for anything else.
pub(crate) fn total_micros(value: &Value) -> Option<i128> {
    value
        .as_instance()
        .filter(|inst| inst.is_instance_of(&TIMEDELTA))
        .and_then(|inst| micros_of(inst).ok())
}

fn micros_of(inst: &Instance) -> Result<i128, EvalError> {
    Ok(i128::from(inst.int_field("days")?) * MICROS_PER_DAY
        + i128::from(inst.int_field("seconds")?) * MICROS_PER_SECOND
        + i128::from(inst.int_field("microseconds")?))
}

fn micros(this: &Value) -> Result<i128, EvalError> {
    total_micros(this).ok_or_else(|| {
        EvalError::type_error(format!(
            "descriptor requires a 'timedelta' object but received a '{}'",
            this.type_name()
        ))
    })
}

fn with_other(
    this: &Value,
    args: &BoundArgs<'_>,
    combine: fn(i128, i128) -> Result<Value, EvalError>,
) -> Result<Value, EvalError> {
    match total_micros(args.get("other")) {
        Some(b) => combine(micros(this)?, b),
        None => Ok(Value::NotImplemented),
    }
}

fn scale(this: &Value, factor: &Value) -> Result<Value, EvalError> {
    let Some(factor) = factor.as_float() else {
        return Ok(Value::NotImplemented);
    };
    let scaled = micros(this)? as f64 * factor;
    if !scaled.is_finite() {
        return Err(EvalError::value_error("cannot convert float NaN or infinity to timedelta"));
    }
    timedelta(scaled.round() as i128)
}

/// `td / n`, `td // n`, and the same against another timedelta.
fn divide(this: &Value, divisor: &Value, floor: bool) -> Result<Value, EvalError> {
    let total = micros(this)?;
    if let Some(other) = total_micros(divisor) {
        if other == 0 {
            return Err(EvalError::zero_division("integer division or modulo by zero"));
        }
        return Ok(if floor {
            Value::int(total.div_euclid(other) as i64)
        } else {
            Value::Float(total as f64 / other as f64)
        });
    }
    let Some(n) = divisor.as_float() else {
        return Ok(Value::NotImplemented);
    };
    if n == 0.0 {
        return Err(EvalError::zero_division("integer division or modulo by zero"));
    }
    let quotient = total as f64 / n;
    timedelta(if floor { quotient.floor() } else { quotient.round() } as i128)
}

/// `[D day[s], ]H:MM:SS[.ffffff]`
fn render(total: i128) -> String {
    let (days, seconds, microseconds) = split(total);
    let mut out = format!(
        "{}:{:02}:{:02}",
        seconds / 3_600,
        seconds % 3_600 / 60,
        seconds % 60
    );
    if days != 0 {
        let plural = if days.abs() == 1 { "" } else { "s" };
        out = format!("{days} day{plural}, {out}");
    }
    if microseconds != 0 {
        out = format!("{out}.{microseconds:06}");
    }
    out
}
