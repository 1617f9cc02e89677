//! `datetime.date`, `datetime.datetime` and `datetime.time`.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use time::macros::format_description;
use time::{Date, Month, PrimitiveDateTime, Time};

use crate::builtins::OBJECT;
use crate::types::{BoundArgs, Class, EvalError, Instance, ParamSpec, Value};

use super::timedelta::{self, MICROS_PER_DAY};
use super::{
    compare_by, format_arg, int_arg, now_local, now_utc, opt_int_arg, other, out_of_range,
    rich_comparisons, strftime, Moment,
};

/// Julian day number of the proleptic Gregorian 0000-12-31, so that
/// 0001-01-01 has ordinal 1.
const ORDINAL_OFFSET: i64 = 1_721_425;

// ──────────────────────────────────────────────
// date
// ──────────────────────────────────────────────

pub static DATE: LazyLock<Arc<Class>> = LazyLock::new(|| {
    let params = ParamSpec::new()
        .required("year")
        .required("month")
        .required("day");
    let builder = Class::builder("date")
        .base(&OBJECT)
        .constructor(params, |class, args| {
            let date = calendar_date(
                int_arg(args, "year")?,
                int_arg(args, "month")?,
                int_arg(args, "day")?,
            )?;
            Ok(date_value(class, date))
        })
        .classmethod("today", ParamSpec::new(), |_, _| {
            Ok(date_value(&DATE, now_local().date()))
        })
        .method("strftime", ParamSpec::new().required("format"), |this, args| {
            let date = this_date(this)?;
            strftime(format_arg(args)?, &Moment::from_date(date)).map(Value::from)
        })
        .method("isoformat", ParamSpec::new(), |this, _| {
            iso_date(this_date(this)?).map(Value::from)
        })
        .method("__str__", ParamSpec::new(), |this, _| {
            iso_date(this_date(this)?).map(Value::from)
        })
        .method("__repr__", ParamSpec::new(), |this, _| {
            let date = this_date(this)?;
            Ok(Value::from(format!(
                "datetime.date({}, {}, {})",
                date.year(),
                u8::from(date.month()),
                date.day()
            )))
        })
        .method(
            "replace",
            ParamSpec::new()
                .optional("year", Value::None)
                .optional("month", Value::None)
                .optional("day", Value::None),
            |this, args| {
                let date = this_date(this)?;
                let replaced = replace_date(date, args)?;
                Ok(date_value(&DATE, replaced))
            },
        )
        .method("toordinal", ParamSpec::new(), |this, _| {
            Ok(Value::int(ordinal(this_date(this)?)))
        })
        .method("weekday", ParamSpec::new(), |this, _| {
            Ok(Value::int(i64::from(
                this_date(this)?.weekday().number_days_from_monday(),
            )))
        })
        .method("isoweekday", ParamSpec::new(), |this, _| {
            Ok(Value::int(i64::from(
                this_date(this)?.weekday().number_from_monday(),
            )))
        })
        .method("__add__", other(), |this, args| add_days(this, args.get("other"), 1))
        .method("__radd__", other(), |this, args| add_days(this, args.get("other"), 1))
        .method("__sub__", other(), |this, args| {
            let date = this_date(this)?;
            match plain_date(args.get("other")) {
                Some(other) => {
                    let days = ordinal(date) - ordinal(other);
                    timedelta::timedelta(i128::from(days) * MICROS_PER_DAY)
                }
                None => add_days(this, args.get("other"), -1),
            }
        })
        .method("__hash__", ParamSpec::new(), |this, _| {
            Ok(Value::int(ordinal(this_date(this)?)))
        });
    rich_comparisons!(builder, plain_date)
        .to_native(|inst| Ok(serde_json::Value::String(iso_date(date_of(inst)?)?)))
        .build()
});

/// Instantiate `class` (date or a subclass) at midnight of `date`.
pub(crate) fn date_value(class: &Arc<Class>, date: Date) -> Value {
    Instance::new(class, date_fields(date))
}

fn date_fields(date: Date) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    fields.insert("year".to_owned(), Value::int(i64::from(date.year())));
    fields.insert("month".to_owned(), Value::int(i64::from(u8::from(date.month()))));
    fields.insert("day".to_owned(), Value::int(i64::from(date.day())));
    fields
}

/// The calendar date of any `date` instance, `datetime` included.
pub(crate) fn to_date(value: &Value) -> Option<Date> {
    value
        .as_instance()
        .filter(|inst| inst.is_instance_of(&DATE))
        .and_then(|inst| date_of(inst).ok())
}

/// A `date` that is not a `datetime`.
fn plain_date(value: &Value) -> Option<Date> {
    match value.as_instance() {
        Some(inst) if inst.is_instance_of(&DATETIME) => None,
        _ => to_date(value),
    }
}

fn date_of(inst: &Instance) -> Result<Date, EvalError> {
    calendar_date(
        inst.int_field("year")?,
        inst.int_field("month")?,
        inst.int_field("day")?,
    )
}

fn this_date(this: &Value) -> Result<Date, EvalError> {
    to_date(this).ok_or_else(|| {
        EvalError::type_error(format!(
            "descriptor requires a 'date' object but received a '{}'",
            this.type_name()
        ))
    })
}

/// Validate a proleptic Gregorian calendar date.
pub(crate) fn calendar_date(year: i64, month: i64, day: i64) -> Result<Date, EvalError> {
    let year = i32::try_from(year)
        .ok()
        .filter(|y| (1..=9999).contains(y))
        .ok_or_else(|| EvalError::value_error(format!("year {year} is out of range")))?;
    let month = u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .ok_or_else(|| EvalError::value_error("month must be in 1..12"))?;
    let day = u8::try_from(day)
        .ok()
        .filter(|d| (1..=days_in_month(year, month)).contains(d))
        .ok_or_else(|| EvalError::value_error("day is out of range for month"))?;
    Date::from_calendar_date(year, month, day).map_err(|err| EvalError::value_error(err.to_string()))
}

pub(crate) fn days_in_month(year: i32, month: Month) -> u8 {
    match month {
        Month::February if time::util::is_leap_year(year) => 29,
        Month::February => 28,
        Month::April | Month::June | Month::September | Month::November => 30,
        _ => 31,
    }
}

pub(crate) fn ordinal(date: Date) -> i64 {
    i64::from(date.to_julian_day()) - ORDINAL_OFFSET
}

fn replace_date(date: Date, args: &BoundArgs<'_>) -> Result<Date, EvalError> {
    calendar_date(
        opt_int_arg(args, "year")?.unwrap_or(i64::from(date.year())),
        opt_int_arg(args, "month")?.unwrap_or(i64::from(u8::from(date.month()))),
        opt_int_arg(args, "day")?.unwrap_or(i64::from(date.day())),
    )
}

/// Move a date by the whole days of a timedelta, in direction `sign`.
/// Seconds and microseconds are ignored, as for Python dates.
fn add_days(this: &Value, delta: &Value, sign: i128) -> Result<Value, EvalError> {
    let Some(micros) = timedelta::total_micros(delta) else {
        return Ok(Value::NotImplemented);
    };
    let days = micros.div_euclid(MICROS_PER_DAY) * sign;
    let date = this_date(this)?;
    let shifted = i128::from(date.to_julian_day()) + days;
    let shifted = i32::try_from(shifted)
        .ok()
        .and_then(|jd| Date::from_julian_day(jd).ok())
        .filter(|d| (1..=9999).contains(&d.year()))
        .ok_or_else(|| out_of_range("date value"))?;
    Ok(date_value(&DATE, shifted))
}

fn iso_date(date: Date) -> Result<String, EvalError> {
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|err| EvalError::value_error(err.to_string()))
}

// ──────────────────────────────────────────────
// datetime
// ──────────────────────────────────────────────

pub static DATETIME: LazyLock<Arc<Class>> = LazyLock::new(|| {
    let params = ParamSpec::new()
        .required("year")
        .required("month")
        .required("day")
        .optional("hour", Value::int(0))
        .optional("minute", Value::int(0))
        .optional("second", Value::int(0))
        .optional("microsecond", Value::int(0))
        .optional("tzinfo", Value::None);
    let builder = Class::builder("datetime")
        .base(&DATE)
        .constructor(params, |class, args| {
            let date = calendar_date(
                int_arg(args, "year")?,
                int_arg(args, "month")?,
                int_arg(args, "day")?,
            )?;
            let time = clock_time(
                int_arg(args, "hour")?,
                int_arg(args, "minute")?,
                int_arg(args, "second")?,
                int_arg(args, "microsecond")?,
            )?;
            Ok(datetime_value(class, PrimitiveDateTime::new(date, time)))
        })
        .classmethod("now", ParamSpec::new(), |_, _| Ok(local_now()))
        .classmethod("today", ParamSpec::new(), |_, _| Ok(local_now()))
        .classmethod("utcnow", ParamSpec::new(), |_, _| {
            let now = now_utc();
            Ok(datetime_value(
                &DATETIME,
                PrimitiveDateTime::new(now.date(), now.time()),
            ))
        })
        .classmethod(
            "combine",
            ParamSpec::new().required("date").required("time"),
            |_, args| {
                let date = to_date(args.get("date")).ok_or_else(|| {
                    EvalError::type_error("combine() argument 1 must be datetime.date")
                })?;
                let time = to_clock(args.get("time")).ok_or_else(|| {
                    EvalError::type_error("combine() argument 2 must be datetime.time")
                })?;
                Ok(datetime_value(&DATETIME, PrimitiveDateTime::new(date, time)))
            },
        )
        .method("strftime", ParamSpec::new().required("format"), |this, args| {
            let dt = this_datetime(this)?;
            strftime(format_arg(args)?, &Moment::from_primitive(dt)).map(Value::from)
        })
        .method(
            "isoformat",
            ParamSpec::new().optional("sep", Value::str("T")),
            |this, args| {
                let sep = args.get("sep").as_str().unwrap_or("T").to_owned();
                iso_datetime(this_datetime(this)?, &sep).map(Value::from)
            },
        )
        .method("__str__", ParamSpec::new(), |this, _| {
            iso_datetime(this_datetime(this)?, " ").map(Value::from)
        })
        .method("__repr__", ParamSpec::new(), |this, _| {
            let dt = this_datetime(this)?;
            let mut parts = vec![
                dt.year().to_string(),
                u8::from(dt.month()).to_string(),
                dt.day().to_string(),
                dt.hour().to_string(),
                dt.minute().to_string(),
            ];
            if dt.second() != 0 || dt.microsecond() != 0 {
                parts.push(dt.second().to_string());
            }
            if dt.microsecond() != 0 {
                parts.push(dt.microsecond().to_string());
            }
            Ok(Value::from(format!("datetime.datetime({})", parts.join(", "))))
        })
        .method(
            "replace",
            ParamSpec::new()
                .optional("year", Value::None)
                .optional("month", Value::None)
                .optional("day", Value::None)
                .optional("hour", Value::None)
                .optional("minute", Value::None)
                .optional("second", Value::None)
                .optional("microsecond", Value::None)
                .optional("tzinfo", Value::None),
            |this, args| {
                let dt = this_datetime(this)?;
                let date = replace_date(dt.date(), args)?;
                let time = clock_time(
                    opt_int_arg(args, "hour")?.unwrap_or(i64::from(dt.hour())),
                    opt_int_arg(args, "minute")?.unwrap_or(i64::from(dt.minute())),
                    opt_int_arg(args, "second")?.unwrap_or(i64::from(dt.second())),
                    opt_int_arg(args, "microsecond")?.unwrap_or(i64::from(dt.microsecond())),
                )?;
                Ok(datetime_value(&DATETIME, PrimitiveDateTime::new(date, time)))
            },
        )
        .method("date", ParamSpec::new(), |this, _| {
            Ok(date_value(&DATE, this_datetime(this)?.date()))
        })
        .method("time", ParamSpec::new(), |this, _| {
            Ok(time_value(this_datetime(this)?.time()))
        })
        .method("__add__", other(), |this, args| shift(this, args.get("other"), 1))
        .method("__radd__", other(), |this, args| shift(this, args.get("other"), 1))
        .method("__sub__", other(), |this, args| {
            let dt = this_datetime(this)?;
            match to_datetime(args.get("other")) {
                Some(other) => timedelta::timedelta((dt - other).whole_microseconds()),
                None => shift(this, args.get("other"), -1),
            }
        })
        .method("__hash__", ParamSpec::new(), |this, _| {
            iso_datetime(this_datetime(this)?, "T").map(Value::from)
        });
    rich_comparisons!(builder, to_datetime)
        .to_native(|inst| {
            let dt = PrimitiveDateTime::new(date_of(inst)?, time_of(inst)?);
            let text = dt
                .format(format_description!(
                    "[year]-[month]-[day] [hour]:[minute]:[second]"
                ))
                .map_err(|err| EvalError::value_error(err.to_string()))?;
            Ok(serde_json::Value::String(text))
        })
        .build()
});

pub(crate) fn datetime_value(class: &Arc<Class>, dt: PrimitiveDateTime) -> Value {
    let mut fields = date_fields(dt.date());
    fields.extend(clock_fields(dt.time()));
    Instance::new(class, fields)
}

fn local_now() -> Value {
    let now = now_local();
    datetime_value(&DATETIME, PrimitiveDateTime::new(now.date(), now.time()))
}

pub(crate) fn to_datetime(value: &Value) -> Option<PrimitiveDateTime> {
    let inst = value
        .as_instance()
        .filter(|inst| inst.is_instance_of(&DATETIME))?;
    Some(PrimitiveDateTime::new(date_of(inst).ok()?, time_of(inst).ok()?))
}

fn this_datetime(this: &Value) -> Result<PrimitiveDateTime, EvalError> {
    to_datetime(this).ok_or_else(|| {
        EvalError::type_error(format!(
            "descriptor requires a 'datetime' object but received a '{}'",
            this.type_name()
        ))
    })
}

/// `datetime ± timedelta`, at microsecond precision.
fn shift(this: &Value, delta: &Value, sign: i128) -> Result<Value, EvalError> {
    let Some(micros) = timedelta::total_micros(delta) else {
        return Ok(Value::NotImplemented);
    };
    let dt = this_datetime(this)?;
    let shifted = i64::try_from(micros * sign)
        .ok()
        .and_then(|us| dt.checked_add(time::Duration::microseconds(us)))
        .filter(|d| (1..=9999).contains(&d.year()))
        .ok_or_else(|| out_of_range("date value"))?;
    Ok(datetime_value(&DATETIME, shifted))
}

fn iso_datetime(dt: PrimitiveDateTime, sep: &str) -> Result<String, EvalError> {
    Ok(format!("{}{sep}{}", iso_date(dt.date())?, iso_time(dt.time())?))
}

// ──────────────────────────────────────────────
// time
// ──────────────────────────────────────────────

pub static TIME: LazyLock<Arc<Class>> = LazyLock::new(|| {
    let params = ParamSpec::new()
        .optional("hour", Value::int(0))
        .optional("minute", Value::int(0))
        .optional("second", Value::int(0))
        .optional("microsecond", Value::int(0))
        .optional("tzinfo", Value::None);
    let builder = Class::builder("time")
        .base(&OBJECT)
        .constructor(params, |_, args| {
            let time = clock_time(
                int_arg(args, "hour")?,
                int_arg(args, "minute")?,
                int_arg(args, "second")?,
                int_arg(args, "microsecond")?,
            )?;
            Ok(time_value(time))
        })
        .method("strftime", ParamSpec::new().required("format"), |this, args| {
            let time = this_clock(this)?;
            strftime(format_arg(args)?, &Moment::from_time(time)).map(Value::from)
        })
        .method("isoformat", ParamSpec::new(), |this, _| {
            iso_time(this_clock(this)?).map(Value::from)
        })
        .method("__str__", ParamSpec::new(), |this, _| {
            iso_time(this_clock(this)?).map(Value::from)
        })
        .method("__hash__", ParamSpec::new(), |this, _| {
            iso_time(this_clock(this)?).map(Value::from)
        });
    rich_comparisons!(builder, to_clock)
        .to_native(|inst| {
            let text = time_of(inst)?
                .format(format_description!("[hour]:[minute]:[second]"))
                .map_err(|err| EvalError::value_error(err.to_string()))?;
            Ok(serde_json::Value::String(text))
        })
        .build()
});

fn time_value(time: Time) -> Value {
    Instance::new(&TIME, clock_fields(time))
}

fn clock_fields(time: Time) -> BTreeMap<String, Value> {
    let mut fields = BTreeMap::new();
    fields.insert("hour".to_owned(), Value::int(i64::from(time.hour())));
    fields.insert("minute".to_owned(), Value::int(i64::from(time.minute())));
    fields.insert("second".to_owned(), Value::int(i64::from(time.second())));
    fields.insert(
        "microsecond".to_owned(),
        Value::int(i64::from(time.microsecond())),
    );
    fields.insert("tzinfo".to_owned(), Value::None);
    fields
}

fn to_clock(value: &Value) -> Option<Time> {
    value
        .as_instance()
        .filter(|inst| inst.is_instance_of(&TIME))
        .and_then(|inst| time_of(inst).ok())
}

fn this_clock(this: &Value) -> Result<Time, EvalError> {
    to_clock(this).ok_or_else(|| {
        EvalError::type_error(format!(
            "descriptor requires a 'time' object but received a '{}'",
            this.type_name()
        ))
    })
}

fn time_of(inst: &Instance) -> Result<Time, EvalError> {
    clock_time(
        inst.int_field("hour")?,
        inst.int_field("minute")?,
        inst.int_field("second")?,
        inst.int_field("microsecond")?,
    )
}

fn clock_time(hour: i64, minute: i64, second: i64, microsecond: i64) -> Result<Time, EvalError> {
    fn component(value: i64, max: i64, message: &str) -> Result<u32, EvalError> {
        if (0..=max).contains(&value) {
            Ok(value as u32)
        } else {
            Err(EvalError::value_error(message))
        }
    }
    let hour = component(hour, 23, "hour must be in 0..23")?;
    let minute = component(minute, 59, "minute must be in 0..59")?;
    let second = component(second, 59, "second must be in 0..59")?;
    let microsecond = component(microsecond, 999_999, "microsecond must be in 0..999999")?;
    Time::from_hms_micro(hour as u8, minute as u8, second as u8, microsecond)
        .map_err(|err| EvalError::value_error(err.to_string()))
}

/// `HH:MM:SS[.ffffff]`
fn iso_time(time: Time) -> Result<String, EvalError> {
    let text = if time.microsecond() == 0 {
        time.format(format_description!("[hour]:[minute]:[second]"))
    } else {
        time.format(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:6]"
        ))
    };
    text.map_err(|err| EvalError::value_error(err.to_string()))
}
