//! Time-macro evaluation for filter values.
//!
//! Filter operands may carry sentinel tokens that stand for a computed
//! timestamp instead of a literal:
//!
//! ```text
//! [[@T:]]                          now
//! [[@NOW:]]                        alias of @T
//! [[@T:+2d;]]                      now shifted two days forward
//! [[@T:+2d; YYYY-MM-DD]]           shifted, with an output pattern
//! [[@T:-3hh 6mm; ISO_DATETIME]]    combined shift, named preset
//! ```
//!
//! Evaluation runs before operator dispatch on both backends, so a macro
//! never leaks into generated query text or a predicate as its literal
//! token. Non-matching values pass through untouched and arrays evaluate
//! element-wise.
//!
//! The shift grammar is whitespace-separated `[+|-]<n><unit>` terms with
//! units `y m d hh mm ss wk` (and their word forms); unrecognized terms
//! are skipped. Month and year shifts are calendar-aware.

use chrono::{DateTime, Duration, Months, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::value::Value;

/// Named output presets; anything else is treated as a literal pattern.
const ISO_DATE: &str = "YYYY-MM-DD";
const ISO_TIME: &str = "HH:mm:ss";
const ISO_DATETIME: &str = "YYYY-MM-DD HH:mm:ss";

static TIME_MACRO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\[\[@(?:T|NOW):\s*(.*)]]$").unwrap());

static SHIFT_TERM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([+-]?\d+)\s*([A-Za-z]+)").unwrap());

/// Evaluate macro tokens in a filter value against the current clock.
pub fn eval(value: &Value) -> Value {
    eval_at(value, Utc::now())
}

/// Evaluate macro tokens against a fixed clock.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use xql_lang::{Value, macros};
///
/// let clock = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
/// let out = macros::eval_at(&Value::from("[[@T:+2d; YYYY-MM-DD]]"), clock);
/// assert_eq!(out, Value::from("2024-03-03"));
/// ```
pub fn eval_at(value: &Value, now: DateTime<Utc>) -> Value {
    match value {
        Value::String(s) => match TIME_MACRO.captures(s) {
            Some(caps) => Value::String(expand(caps.get(1).map_or("", |m| m.as_str()), now)),
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| eval_at(v, now)).collect()),
        other => other.clone(),
    }
}

/// Expand one macro body: `shift[; format]`.
fn expand(body: &str, now: DateTime<Utc>) -> String {
    let (shifter, format) = match body.split_once(';') {
        Some((shifter, format)) => (shifter.trim(), format.trim()),
        None => (body.trim(), ""),
    };

    let mut at = now;
    if !shifter.is_empty() {
        at = apply_shift(at, shifter);
    }

    let pattern = match format {
        "" | "ISO_DATETIME" => ISO_DATETIME,
        "ISO_DATE" => ISO_DATE,
        "ISO_TIME" => ISO_TIME,
        literal => literal,
    };
    at.format(&to_chrono_format(pattern)).to_string()
}

/// Apply the shift terms in order; invalid terms leave the time unchanged.
fn apply_shift(at: DateTime<Utc>, shifter: &str) -> DateTime<Utc> {
    let mut at = at;
    for caps in SHIFT_TERM.captures_iter(shifter) {
        let Ok(amount) = caps[1].parse::<i64>() else {
            continue;
        };
        let unit = caps[2].to_lowercase();
        at = match unit.as_str() {
            "y" | "year" | "years" => shift_months(at, amount.saturating_mul(12)),
            "m" | "month" | "months" => shift_months(at, amount),
            "d" | "day" | "days" => at + Duration::days(amount),
            "hh" | "hr" | "hrs" | "hour" | "hours" => at + Duration::hours(amount),
            "mm" | "min" | "minute" | "minutes" => at + Duration::minutes(amount),
            "ss" | "sec" | "second" | "seconds" => at + Duration::seconds(amount),
            "wk" | "wks" | "week" | "weeks" => at + Duration::weeks(amount),
            _ => at,
        };
    }
    at
}

fn shift_months(at: DateTime<Utc>, months: i64) -> DateTime<Utc> {
    let magnitude = Months::new(months.unsigned_abs().min(u32::MAX as u64) as u32);
    let shifted = if months >= 0 {
        at.checked_add_months(magnitude)
    } else {
        at.checked_sub_months(magnitude)
    };
    shifted.unwrap_or(at)
}

/// Translate the `YYYY-MM-DD HH:mm:ss` token vocabulary into a chrono
/// format string; untokenized characters pass through literally.
fn to_chrono_format(pattern: &str) -> String {
    const TOKENS: [(&str, &str); 7] = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    'scan: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'scan;
            }
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        if ch == '%' {
            out.push_str("%%");
        } else {
            out.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }
    out
}
