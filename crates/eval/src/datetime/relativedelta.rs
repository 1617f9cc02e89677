//! `relativedelta`: calendar-aware offsets applied to dates.
//!
//! Absolute fields (`year`, `month`, `day`, `weekday`) replace the date's
//! own; relative ones (`years`, `months`, `days`, `leapdays`) shift it.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use quill_core::BinaryOp;
use time::Month;

use crate::builtins::OBJECT;
use crate::protocol;
use crate::types::{BoundArgs, Class, EvalError, Instance, ParamSpec, Value};

use super::date::{days_in_month, to_date};
use super::timedelta::{self, MICROS_PER_DAY};
use super::{opt_int_arg, other};

/// Cumulative day counts at the end of each month of a non-leap year.
const YEAR_DAYS: [i64; 12] = [31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 366];

const ABSOLUTE: [&str; 4] = ["year", "month", "day", "weekday"];
const RELATIVE: [&str; 4] = ["years", "months", "days", "leapdays"];

pub static RELATIVEDELTA: LazyLock<Arc<Class>> = LazyLock::new(|| {
    let params = ParamSpec::new()
        .keyword_only()
        .optional("year", Value::None)
        .optional("month", Value::None)
        .optional("day", Value::None)
        .optional("weekday", Value::None)
        .optional("yearday", Value::None)
        .optional("nlyearday", Value::None)
        .optional("years", Value::int(0))
        .optional("months", Value::int(0))
        .optional("weeks", Value::int(0))
        .optional("days", Value::int(0))
        .optional("leapdays", Value::int(0));
    Class::builder("relativedelta")
        .base(&OBJECT)
        .constructor(params, |_, args| construct(args))
        .method("__add__", other(), |this, args| apply(this, args.get("other")))
        .method("__radd__", other(), |this, args| apply(this, args.get("other")))
        .method("__rsub__", other(), |this, args| {
            apply(&negate(this)?, args.get("other"))
        })
        .method("__neg__", ParamSpec::new(), |this, _| negate(this))
        .method("__repr__", ParamSpec::new(), |this, _| {
            let ops = ops(this)?;
            let mut parts = Vec::new();
            for name in RELATIVE {
                let n = ops.int_field(name)?;
                if n != 0 {
                    parts.push(format!("{name}={n:+}"));
                }
            }
            for name in ABSOLUTE {
                if let Some(n) = field(ops, name)? {
                    parts.push(format!("{name}={n}"));
                }
            }
            Ok(Value::from(format!("relativedelta({})", parts.join(", "))))
        })
        .build()
});

#[derive(Debug, Default)]
struct Offsets {
    year: Option<i64>,
    month: Option<i64>,
    day: Option<i64>,
    weekday: Option<i64>,
    years: i64,
    months: i64,
    days: i64,
    leapdays: i64,
}

impl Offsets {
    fn into_value(self) -> Value {
        let mut fields = BTreeMap::new();
        let absolute = [self.year, self.month, self.day, self.weekday];
        for (name, value) in ABSOLUTE.into_iter().zip(absolute) {
            fields.insert(name.to_owned(), value.map_or(Value::None, Value::int));
        }
        let relative = [self.years, self.months, self.days, self.leapdays];
        for (name, value) in RELATIVE.into_iter().zip(relative) {
            fields.insert(name.to_owned(), Value::int(value));
        }
        Instance::new(&RELATIVEDELTA, fields)
    }
}

fn construct(args: &BoundArgs<'_>) -> Result<Value, EvalError> {
    let relative = |name: &str| opt_int_arg(args, name).map(Option::unwrap_or_default);
    let mut offsets = Offsets {
        year: opt_int_arg(args, "year")?,
        month: opt_int_arg(args, "month")?,
        day: opt_int_arg(args, "day")?,
        weekday: opt_int_arg(args, "weekday")?,
        years: relative("years")?,
        months: relative("months")?,
        days: relative("days")? + relative("weeks")? * 7,
        leapdays: relative("leapdays")?,
    };

    let yearday = match opt_int_arg(args, "nlyearday")? {
        Some(n) => Some(n),
        None => match opt_int_arg(args, "yearday")? {
            Some(n) => {
                if n > 59 {
                    offsets.leapdays = -1;
                }
                Some(n)
            }
            None => None,
        },
    };
    if let Some(yday) = yearday.filter(|n| *n != 0) {
        let month = YEAR_DAYS
            .iter()
            .position(|end| yday <= *end)
            .ok_or_else(|| EvalError::value_error(format!("invalid year day ({yday})")))?;
        offsets.month = Some(month as i64 + 1);
        offsets.day = Some(match month {
            0 => yday,
            m => yday - YEAR_DAYS[m - 1],
        });
    }

    if offsets.months.abs() > 11 {
        let sign = offsets.months.signum();
        let magnitude = offsets.months.abs();
        offsets.years += magnitude / 12 * sign;
        offsets.months = magnitude % 12 * sign;
    }
    Ok(offsets.into_value())
}

fn ops(this: &Value) -> Result<&Instance, EvalError> {
    this.as_instance()
        .filter(|inst| inst.is_instance_of(&RELATIVEDELTA))
        .map(|inst| inst.as_ref())
        .ok_or_else(|| EvalError::type_error("descriptor requires a 'relativedelta' object"))
}

fn field(ops: &Instance, name: &str) -> Result<Option<i64>, EvalError> {
    match ops.field(name) {
        None | Some(Value::None) => Ok(None),
        Some(_) => ops.int_field(name).map(Some),
    }
}

fn negate(this: &Value) -> Result<Value, EvalError> {
    let ops = ops(this)?;
    Ok(Offsets {
        year: field(ops, "year")?,
        month: field(ops, "month")?,
        day: field(ops, "day")?,
        weekday: field(ops, "weekday")?,
        years: -ops.int_field("years")?,
        months: -ops.int_field("months")?,
        days: -ops.int_field("days")?,
        leapdays: ops.int_field("leapdays")?,
    }
    .into_value())
}

/// `date + relativedelta`: replace the absolute fields, shift by years and
/// months clamping the day to the month's length, then add days and jump
/// forward to the requested weekday.
fn apply(this: &Value, other: &Value) -> Result<Value, EvalError> {
    let Some(date) = to_date(other) else {
        return Ok(Value::NotImplemented);
    };
    let ops = ops(this)?;
    let truthy = |name: &str| field(ops, name).map(|n| n.filter(|n| *n != 0));

    let mut year = truthy("year")?.unwrap_or(i64::from(date.year())) + ops.int_field("years")?;
    let mut month = truthy("month")?.unwrap_or(i64::from(u8::from(date.month())));
    let months = ops.int_field("months")?;
    if months != 0 {
        if !(1..=12).contains(&months.abs()) {
            return Err(EvalError::value_error(
                "Can only use relative months between -12 and +12",
            ));
        }
        month += months;
        if month > 12 {
            year += 1;
            month -= 12;
        } else if month < 1 {
            year -= 1;
            month += 12;
        }
    }
    let calendar_year = i32::try_from(year)
        .map_err(|_| EvalError::value_error(format!("year {year} is out of range")))?;
    let calendar_month = u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(|| EvalError::value_error("month must be in 1..12"))?;
    let day = truthy("day")?
        .unwrap_or(i64::from(date.day()))
        .min(i64::from(days_in_month(calendar_year, calendar_month)));

    let mut days = ops.int_field("days")?;
    let leapdays = ops.int_field("leapdays")?;
    if leapdays != 0 && month > 2 && time::util::is_leap_year(calendar_year) {
        days += leapdays;
    }

    let replace = protocol::get_attr(other, "replace")?;
    let replaced = protocol::call(
        &replace,
        vec![],
        vec![
            ("year".to_owned(), Value::int(year)),
            ("month".to_owned(), Value::int(month)),
            ("day".to_owned(), Value::int(day)),
        ],
    )?;
    let mut result = protocol::binary(
        BinaryOp::Add,
        &replaced,
        &timedelta::timedelta(i128::from(days) * MICROS_PER_DAY)?,
    )?;

    if let Some(weekday) = field(ops, "weekday")? {
        let current = protocol::call(&protocol::get_attr(&result, "weekday")?, vec![], vec![])?
            .as_integer()
            .unwrap_or_default();
        let jump = (7 - current + weekday).rem_euclid(7);
        result = protocol::binary(
            BinaryOp::Add,
            &result,
            &timedelta::timedelta(i128::from(jump) * MICROS_PER_DAY)?,
        )?;
    }
    Ok(result)
}
