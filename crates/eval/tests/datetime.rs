//! The injected date/time helpers, driven through expressions.

use quill_eval::{eval, Context, EvalError};
use serde_json::{json, Map, Value as Json};

fn seeded() -> Context {
    Context::seeded(&Map::new()).unwrap()
}

fn run(source: &str) -> Json {
    eval(source, &seeded()).unwrap_or_else(|err| panic!("{source}: {err}"))
}

fn fail(source: &str) -> EvalError {
    eval(source, &seeded()).expect_err(source)
}

#[test]
fn dates_unwrap_to_iso_strings() {
    assert_eq!(run("datetime.date(2024, 2, 9)"), json!("2024-02-09"));
    assert_eq!(
        run("datetime.datetime(2024, 2, 9, 7, 5, 3)"),
        json!("2024-02-09 07:05:03")
    );
    assert_eq!(run("datetime.time(7, 5)"), json!("07:05:00"));
}

#[test]
fn calendar_fields_are_validated() {
    assert_eq!(
        fail("datetime.date(2023, 2, 29)").to_string(),
        "ValueError: day is out of range for month"
    );
    assert_eq!(fail("datetime.date(2024, 0, 1)").kind(), "ValueError");
    assert_eq!(fail("datetime.time(25)").kind(), "ValueError");
    assert_eq!(fail("datetime.date(2024, 1)").kind(), "TypeError");
}

#[test]
fn date_arithmetic_with_timedelta() {
    assert_eq!(
        run("datetime.date(2024, 3, 1) - datetime.timedelta(days=1)"),
        json!("2024-02-29")
    );
    assert_eq!(
        run("datetime.timedelta(weeks=1) + datetime.date(2024, 12, 28)"),
        json!("2025-01-04")
    );
    assert_eq!(
        run("(datetime.date(2024, 3, 1) - datetime.date(2024, 1, 1)).days"),
        json!(60)
    );
    assert_eq!(
        run("datetime.datetime(2024, 1, 1, 23, 30) + datetime.timedelta(hours=1)"),
        json!("2024-01-02 00:30:00")
    );
    assert_eq!(
        run("(datetime.datetime(2024, 1, 2) - datetime.datetime(2024, 1, 1, 12)).total_seconds()"),
        json!(43200)
    );
}

#[test]
fn timedelta_normalizes_and_prints() {
    assert_eq!(run("datetime.timedelta(hours=36).days"), json!(1));
    assert_eq!(run("datetime.timedelta(hours=36).seconds"), json!(43200));
    assert_eq!(run("str(datetime.timedelta(days=1, seconds=3661))"), json!("1 day, 1:01:01"));
    assert_eq!(run("str(-datetime.timedelta(seconds=1))"), json!("-1 day, 23:59:59"));
    assert_eq!(run("str(datetime.timedelta(minutes=1.5))"), json!("0:01:30"));
    assert_eq!(run("(3 * datetime.timedelta(hours=2)).seconds"), json!(21600));
    assert_eq!(run("(datetime.timedelta(days=1) / 4).seconds"), json!(21600));
    assert_eq!(run("bool(datetime.timedelta())"), json!(false));
    assert_eq!(
        run("datetime.timedelta(hours=24) == datetime.timedelta(days=1)"),
        json!(true)
    );
}

#[test]
fn dates_compare_and_hash() {
    assert_eq!(run("datetime.date(2024, 1, 1) < datetime.date(2024, 1, 2)"), json!(true));
    assert_eq!(run("datetime.date(2024, 1, 1) == datetime.date(2024, 1, 1)"), json!(true));
    assert_eq!(run("datetime.date(2024, 1, 1) != datetime.date(2024, 1, 1)"), json!(false));
    assert_eq!(
        run("len({datetime.date(2024, 1, 1): 1, datetime.date(2024, 1, 1): 2})"),
        json!(1)
    );
}

#[test]
fn strftime_codes() {
    assert_eq!(
        run("datetime.datetime(2024, 2, 9, 7, 5, 3).strftime('%Y/%m/%d %H:%M:%S')"),
        json!("2024/02/09 07:05:03")
    );
    assert_eq!(run("datetime.date(2024, 2, 9).strftime('%d%%')"), json!("09%"));
    assert_eq!(
        fail("datetime.date(2024, 2, 9).strftime('%b')").to_string(),
        "ValueError: No known conversion for %b"
    );
    assert_eq!(run("len(time.strftime('%Y-%m-%d %H:%M:%S'))"), json!(19));
    assert_eq!(run("len(current_date)"), json!(10));
}

#[test]
fn datetime_helpers() {
    assert_eq!(
        run("datetime.datetime.combine(datetime.date(2024, 5, 6), datetime.time(7, 8, 9))"),
        json!("2024-05-06 07:08:09")
    );
    assert_eq!(
        run("datetime.datetime(2024, 5, 6, 7, 8).replace(day=1, hour=0)"),
        json!("2024-05-01 00:08:00")
    );
    assert_eq!(run("datetime.datetime(2024, 5, 6, 7, 8).date()"), json!("2024-05-06"));
    assert_eq!(run("datetime.date(2024, 1, 3).weekday()"), json!(2));
    assert_eq!(run("datetime.date(1, 1, 1).toordinal()"), json!(1));
    assert_eq!(run("isinstance(datetime.datetime.now(), datetime.date)"), json!(true));
    assert_eq!(run("isinstance(context_today(), datetime.date)"), json!(true));
}

#[test]
fn relativedelta_months_clamp_days() {
    assert_eq!(
        run("datetime.date(2024, 1, 31) + relativedelta(months=1)"),
        json!("2024-02-29")
    );
    assert_eq!(
        run("datetime.date(2024, 1, 15) - relativedelta(months=1)"),
        json!("2023-12-15")
    );
    assert_eq!(
        run("datetime.date(2024, 5, 17) + relativedelta(months=14)"),
        json!("2025-07-17")
    );
    assert_eq!(
        run("datetime.date(2024, 5, 17) + relativedelta(day=1, months=-1)"),
        json!("2024-04-01")
    );
}

#[test]
fn relativedelta_absolute_fields() {
    assert_eq!(
        run("datetime.date(2024, 1, 3) + relativedelta(weekday=0)"),
        json!("2024-01-08")
    );
    assert_eq!(
        run("datetime.date(2023, 6, 1) + relativedelta(yearday=100)"),
        json!("2023-04-10")
    );
    assert_eq!(
        run("datetime.date(2024, 6, 1) + relativedelta(yearday=100)"),
        json!("2024-04-09")
    );
    assert_eq!(
        run("datetime.datetime(2024, 2, 10, 8) + relativedelta(years=1, days=2)"),
        json!("2025-02-12 08:00:00")
    );
    assert_eq!(
        fail("relativedelta(yearday=400)").to_string(),
        "ValueError: invalid year day (400)"
    );
    assert_eq!(fail("relativedelta(1)").kind(), "TypeError");
}
