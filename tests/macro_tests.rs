use chrono::{TimeZone, Utc};
use xql_lang::{Value, macros};

fn clock(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

#[test]
fn test_plain_time_macro_uses_default_format() {
    let now = clock(2024, 3, 1, 12, 30, 45);
    let out = macros::eval_at(&Value::from("[[@T:]]"), now);
    assert_eq!(out, Value::from("2024-03-01 12:30:45"));
}

#[test]
fn test_now_is_an_alias_of_t() {
    let now = clock(2024, 3, 1, 12, 30, 45);
    assert_eq!(
        macros::eval_at(&Value::from("[[@NOW:]]"), now),
        macros::eval_at(&Value::from("[[@T:]]"), now)
    );
}

#[test]
fn test_day_shift_with_date_format() {
    let now = clock(2024, 3, 1, 12, 0, 0);
    let out = macros::eval_at(&Value::from("[[@T:+2d; YYYY-MM-DD]]"), now);
    assert_eq!(out, Value::from("2024-03-03"));
}

#[test]
fn test_negative_hour_shift() {
    let now = clock(2024, 3, 1, 2, 0, 0);
    let out = macros::eval_at(&Value::from("[[@T:-3hh;]]"), now);
    assert_eq!(out, Value::from("2024-02-29 23:00:00"));
}

#[test]
fn test_combined_shift_terms_apply_in_order() {
    let now = clock(2024, 3, 1, 12, 0, 0);
    let out = macros::eval_at(&Value::from("[[@T:+1d -2hh 30mm; YYYY-MM-DD HH:mm:ss]]"), now);
    assert_eq!(out, Value::from("2024-03-02 10:30:00"));
}

#[test]
fn test_month_shift_is_calendar_aware() {
    let now = clock(2024, 1, 31, 0, 0, 0);
    let out = macros::eval_at(&Value::from("[[@T:+1m; YYYY-MM-DD]]"), now);
    assert_eq!(out, Value::from("2024-02-29"));
}

#[test]
fn test_year_and_week_shifts() {
    let now = clock(2024, 3, 1, 0, 0, 0);
    assert_eq!(
        macros::eval_at(&Value::from("[[@T:-1y; ISO_DATE]]"), now),
        Value::from("2023-03-01")
    );
    assert_eq!(
        macros::eval_at(&Value::from("[[@T:+2wk; ISO_DATE]]"), now),
        Value::from("2024-03-15")
    );
}

#[test]
fn test_named_presets() {
    let now = clock(2024, 3, 1, 12, 30, 45);
    assert_eq!(
        macros::eval_at(&Value::from("[[@T:; ISO_DATE]]"), now),
        Value::from("2024-03-01")
    );
    assert_eq!(
        macros::eval_at(&Value::from("[[@T:; ISO_TIME]]"), now),
        Value::from("12:30:45")
    );
    assert_eq!(
        macros::eval_at(&Value::from("[[@T:; ISO_DATETIME]]"), now),
        Value::from("2024-03-01 12:30:45")
    );
}

#[test]
fn test_literal_format_pattern() {
    let now = clock(2024, 3, 1, 12, 30, 45);
    let out = macros::eval_at(&Value::from("[[@T:; DD/MM/YY HH:mm]]"), now);
    assert_eq!(out, Value::from("01/03/24 12:30"));
}

#[test]
fn test_macro_match_is_case_insensitive() {
    let now = clock(2024, 3, 1, 0, 0, 0);
    let out = macros::eval_at(&Value::from("[[@now:+1d; ISO_DATE]]"), now);
    assert_eq!(out, Value::from("2024-03-02"));
}

#[test]
fn test_unknown_shift_units_are_skipped() {
    let now = clock(2024, 3, 1, 12, 0, 0);
    let out = macros::eval_at(&Value::from("[[@T:+5fortnights; ISO_DATETIME]]"), now);
    assert_eq!(out, Value::from("2024-03-01 12:00:00"));
}

#[test]
fn test_non_macro_values_pass_through() {
    let now = clock(2024, 3, 1, 0, 0, 0);
    assert_eq!(
        macros::eval_at(&Value::from("plain string"), now),
        Value::from("plain string")
    );
    assert_eq!(macros::eval_at(&Value::Integer(7), now), Value::Integer(7));
    assert_eq!(macros::eval_at(&Value::Null, now), Value::Null);
    // an unterminated token is not a macro
    assert_eq!(
        macros::eval_at(&Value::from("[[@T: oops"), now),
        Value::from("[[@T: oops")
    );
}

#[test]
fn test_arrays_evaluate_element_wise() {
    let now = clock(2024, 3, 1, 0, 0, 0);
    let input = Value::from(vec![
        Value::from("[[@T:-2d; ISO_DATE]]"),
        Value::from("[[@T:-1d; ISO_DATE]]"),
        Value::from("untouched"),
    ]);
    let out = macros::eval_at(&input, now);
    assert_eq!(
        out,
        Value::from(vec![
            Value::from("2024-02-28"),
            Value::from("2024-02-29"),
            Value::from("untouched"),
        ])
    );
}
