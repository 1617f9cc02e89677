//! Date and time helpers injected into every composition context:
//! the `datetime` module (`date`, `datetime`, `time`, `timedelta`),
//! `relativedelta`, a `time` module with `strftime`, `context_today()` and
//! the pre-formatted `current_date`.
//!
//! Calendar validation and arithmetic are delegated to the `time` crate.

mod date;
mod relativedelta;
mod timedelta;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::builtins::MODULE;
use crate::types::{BoundArgs, EvalError, Function, Instance, ParamSpec, Value};

pub use date::{DATE, DATETIME, TIME};
pub use relativedelta::RELATIVEDELTA;
pub use timedelta::TIMEDELTA;

/// Names injected into a fresh evaluation context.
pub fn helpers() -> Result<Vec<(&'static str, Value)>, EvalError> {
    let mut module = BTreeMap::new();
    module.insert("date".to_owned(), Value::Class(Arc::clone(&DATE)));
    module.insert("datetime".to_owned(), Value::Class(Arc::clone(&DATETIME)));
    module.insert("time".to_owned(), Value::Class(Arc::clone(&TIME)));
    module.insert("timedelta".to_owned(), Value::Class(Arc::clone(&TIMEDELTA)));
    let datetime_module = Instance::new(&MODULE, module);

    let mut time_fields = BTreeMap::new();
    time_fields.insert(
        "strftime".to_owned(),
        Function::native("strftime", ParamSpec::new().required("format"), |args| {
            let format = format_arg(args)?;
            let now = now_utc();
            strftime(format, &Moment::from_offset(now)).map(Value::from)
        }),
    );
    let time_module = Instance::new(&MODULE, time_fields);

    let context_today = Function::native("context_today", ParamSpec::new(), |_| {
        Ok(date::date_value(&DATE, now_local().date()))
    });

    let current_date = strftime("%Y-%m-%d", &Moment::from_offset(now_utc()))?;

    Ok(vec![
        ("datetime", datetime_module),
        ("context_today", context_today),
        ("time", time_module),
        ("relativedelta", Value::Class(Arc::clone(&RELATIVEDELTA))),
        ("current_date", Value::from(current_date)),
    ])
}

// ──────────────────────────────────────────────
// Clock
// ──────────────────────────────────────────────

fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Local wall-clock time, falling back to UTC where the local offset
/// cannot be determined.
fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|err| {
        tracing::debug!(%err, "local offset unavailable, using UTC");
        OffsetDateTime::now_utc()
    })
}

// ──────────────────────────────────────────────
// Formatting
// ──────────────────────────────────────────────

/// Broken-down calendar fields used for `strftime`.
#[derive(Debug, Clone, Copy, Default)]
struct Moment {
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl Moment {
    fn from_date(date: time::Date) -> Self {
        Moment {
            year: date.year(),
            month: u8::from(date.month()),
            day: date.day(),
            ..Moment::default()
        }
    }

    fn from_primitive(dt: time::PrimitiveDateTime) -> Self {
        Moment {
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
            ..Moment::from_date(dt.date())
        }
    }

    fn from_time(t: time::Time) -> Self {
        Moment {
            year: 1900,
            month: 1,
            day: 1,
            hour: t.hour(),
            minute: t.minute(),
            second: t.second(),
        }
    }

    fn from_offset(now: OffsetDateTime) -> Self {
        Moment::from_primitive(time::PrimitiveDateTime::new(now.date(), now.time()))
    }
}

/// Supports `%Y %m %d %H %M %S` and `%%`; other letters are a `ValueError`.
fn strftime(format: &str, m: &Moment) -> Result<String, EvalError> {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(code) if code.is_ascii_alphabetic() => {
                chars.next();
                let field = match code {
                    'Y' => format!("{:04}", m.year),
                    'm' => format!("{:02}", m.month),
                    'd' => format!("{:02}", m.day),
                    'H' => format!("{:02}", m.hour),
                    'M' => format!("{:02}", m.minute),
                    'S' => format!("{:02}", m.second),
                    _ => {
                        return Err(EvalError::value_error(format!(
                            "No known conversion for %{code}"
                        )))
                    }
                };
                out.push_str(&field);
            }
            _ => out.push('%'),
        }
    }
    Ok(out)
}

fn format_arg<'a>(args: &'a BoundArgs<'_>) -> Result<&'a str, EvalError> {
    args.get("format").as_str().ok_or_else(|| {
        EvalError::type_error(format!(
            "strftime() argument 1 must be str, not {}",
            args.get("format").type_name()
        ))
    })
}

// ──────────────────────────────────────────────
// Argument helpers
// ──────────────────────────────────────────────

fn other() -> ParamSpec {
    ParamSpec::new().required("other")
}

/// Integer-valued argument, as required by calendar constructors.
fn int_arg(args: &BoundArgs<'_>, name: &str) -> Result<i64, EvalError> {
    let value = args.get(name);
    value.as_integer().ok_or_else(|| {
        EvalError::type_error(format!(
            "integer argument expected for '{name}', got {}",
            value.type_name()
        ))
    })
}

/// Integer argument that may be left as `None`.
fn opt_int_arg(args: &BoundArgs<'_>, name: &str) -> Result<Option<i64>, EvalError> {
    if args.get(name).is_none() {
        Ok(None)
    } else {
        int_arg(args, name).map(Some)
    }
}

/// Numeric argument (float or bool).
fn number_arg(args: &BoundArgs<'_>, name: &str) -> Result<f64, EvalError> {
    match args.get(name) {
        Value::Float(n) => Ok(*n),
        Value::Bool(b) => Ok(f64::from(u8::from(*b))),
        other => Err(EvalError::type_error(format!(
            "unsupported type for {name} component: {}",
            other.type_name()
        ))),
    }
}

fn out_of_range(what: &str) -> EvalError {
    EvalError::value_error(format!("{what} is out of range"))
}

/// Rich comparison through an ordering key. Operands without a key are
/// `NotImplemented`, which hands over to the reflected method or the
/// default fallback.
fn compare_by<K: Ord>(
    this: &Value,
    other: &Value,
    key: fn(&Value) -> Option<K>,
    test: fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    match (key(this), key(other)) {
        (Some(a), Some(b)) => Ok(Value::Bool(test(a.cmp(&b)))),
        _ => Ok(Value::NotImplemented),
    }
}

/// Add `__eq__`, `__ne__`, `__lt__`, `__le__`, `__gt__` and `__ge__`
/// comparing by `$key`.
macro_rules! rich_comparisons {
    ($builder:expr, $key:path) => {
        $builder
            .method("__eq__", other(), |this, args| {
                compare_by(this, args.get("other"), $key, std::cmp::Ordering::is_eq)
            })
            .method("__ne__", other(), |this, args| {
                compare_by(this, args.get("other"), $key, std::cmp::Ordering::is_ne)
            })
            .method("__lt__", other(), |this, args| {
                compare_by(this, args.get("other"), $key, std::cmp::Ordering::is_lt)
            })
            .method("__le__", other(), |this, args| {
                compare_by(this, args.get("other"), $key, std::cmp::Ordering::is_le)
            })
            .method("__gt__", other(), |this, args| {
                compare_by(this, args.get("other"), $key, std::cmp::Ordering::is_gt)
            })
            .method("__ge__", other(), |this, args| {
                compare_by(this, args.get("other"), $key, std::cmp::Ordering::is_ge)
            })
    };
}
pub(crate) use rich_comparisons;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strftime_codes() {
        let m = Moment {
            year: 2024,
            month: 2,
            day: 9,
            hour: 7,
            minute: 5,
            second: 3,
        };
        assert_eq!(
            strftime("%Y-%m-%d %H:%M:%S 100%%", &m).unwrap(),
            "2024-02-09 07:05:03 100%"
        );
        assert_eq!(strftime("%Y/%", &m).unwrap(), "2024/%");
        let err = strftime("%b", &m).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: No known conversion for %b");
    }

    #[test]
    fn helpers_cover_injected_names() {
        let names: Vec<&str> = helpers().unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["datetime", "context_today", "time", "relativedelta", "current_date"]
        );
    }
}
