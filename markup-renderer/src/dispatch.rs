//! Method table behind the `call` pipe.
//!
//! [`Value::Object`] receivers dispatch into their own method table. Every
//! other variant is looked up in [`METHODS`], keyed by the receiver's
//! [`Kind`] and the method name. Date methods live under [`Kind::String`]
//! and parse the receiver text on each call.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

use markup_core::value::{format_number, OPAQUE_MARKER};
use markup_core::{Kind, PipeError, Value};

use crate::pipes::{arg, away_from_tie, count_arg, fixed, invalid, optional_count, optional_int, required};

type Method = fn(&Value, &[String]) -> Result<Value, PipeError>;

const PIPE: &str = "call";

#[rustfmt::skip]
const METHODS: &[(Kind, &str, Method)] = &[
    (Kind::Number,   "toFixed",        to_fixed),
    (Kind::Number,   "toPrecision",    to_precision),
    (Kind::Number,   "toExponential",  to_exponential),
    (Kind::Number,   "toString",       number_to_string),

    (Kind::String,   "toUpperCase",    |v, _| Ok(Value::String(text(v).to_uppercase()))),
    (Kind::String,   "toLowerCase",    |v, _| Ok(Value::String(text(v).to_lowercase()))),
    (Kind::String,   "trim",           |v, _| Ok(Value::from(text(v).trim()))),
    (Kind::String,   "trimStart",      |v, _| Ok(Value::from(text(v).trim_start()))),
    (Kind::String,   "trimEnd",        |v, _| Ok(Value::from(text(v).trim_end()))),
    (Kind::String,   "charAt",         char_at),
    (Kind::String,   "indexOf",        string_index_of),
    (Kind::String,   "includes",       |v, a| Ok(Value::Bool(text(v).contains(arg(a, 0).unwrap_or_default())))),
    (Kind::String,   "startsWith",     |v, a| Ok(Value::Bool(text(v).starts_with(arg(a, 0).unwrap_or_default())))),
    (Kind::String,   "endsWith",       |v, a| Ok(Value::Bool(text(v).ends_with(arg(a, 0).unwrap_or_default())))),
    (Kind::String,   "repeat",         repeat),
    (Kind::String,   "padStart",       pad_start),
    (Kind::String,   "padEnd",         pad_end),
    (Kind::String,   "substring",      substring),
    (Kind::String,   "split",          string_split),
    (Kind::String,   "replace",        replace),
    (Kind::String,   "concat",         |v, a| Ok(Value::String(format!("{}{}", text(v), a.concat())))),
    (Kind::String,   "toString",       |v, _| Ok(v.clone())),
    (Kind::String,   "getFullYear",    |v, _| date_of(v).map(|d| Value::from(d.year()))),
    (Kind::String,   "getMonth",       |v, _| date_of(v).map(|d| Value::from(d.month0()))),
    (Kind::String,   "getDate",        |v, _| date_of(v).map(|d| Value::from(d.day()))),
    (Kind::String,   "getDay",         |v, _| date_of(v).map(|d| Value::from(d.weekday().num_days_from_sunday()))),
    (Kind::String,   "getHours",       |v, _| date_of(v).map(|d| Value::from(d.hour()))),
    (Kind::String,   "getMinutes",     |v, _| date_of(v).map(|d| Value::from(d.minute()))),
    (Kind::String,   "getSeconds",     |v, _| date_of(v).map(|d| Value::from(d.second()))),
    (Kind::String,   "getTime",        |v, _| date_of(v).map(|d| Value::from(d.timestamp_millis()))),
    (Kind::String,   "toISOString",    to_iso_string),

    (Kind::Sequence, "join",           |v, a| Ok(Value::String(joined(v, arg(a, 0).unwrap_or(","))))),
    (Kind::Sequence, "reverse",        |v, _| Ok(Value::Sequence(items(v).iter().rev().cloned().collect()))),
    (Kind::Sequence, "slice",          sequence_slice),
    (Kind::Sequence, "indexOf",        sequence_index_of),
    (Kind::Sequence, "includes",       sequence_includes),
    (Kind::Sequence, "at",             at),
    (Kind::Sequence, "toString",       |v, _| Ok(Value::String(joined(v, ",")))),

    (Kind::Mapping,  "hasOwnProperty", has_own_property),
    (Kind::Mapping,  "toString",       |_, _| Ok(Value::from(OPAQUE_MARKER))),

    (Kind::Bool,     "toString",       |v, _| Ok(Value::String(v.to_string()))),
];

/// Invoke `method` on `value` with raw string arguments.
pub fn call(value: &Value, method: &str, args: &[String]) -> Result<Value, PipeError> {
    if let Value::Object(object) = value {
        return object.call(method, args);
    }
    let kind = value.kind();
    match METHODS.iter().find(|(k, name, _)| *k == kind && *name == method) {
        Some((_, _, run)) => run(value, args),
        None => Err(PipeError::UnknownMethod {
            target: kind.to_string(),
            method: method.to_string(),
        }),
    }
}

/// Method names callable on values of `kind`. Objects list their own.
pub fn methods(kind: Kind) -> impl Iterator<Item = &'static str> {
    METHODS
        .iter()
        .filter(move |(k, _, _)| *k == kind)
        .map(|(_, name, _)| *name)
}

// The table guarantees the receiver variant; these never hit the fallback.

fn number(value: &Value) -> f64 {
    value.to_number().unwrap_or(f64::NAN)
}

fn text(value: &Value) -> &str {
    value.as_str().unwrap_or_default()
}

fn items(value: &Value) -> &[Value] {
    value.as_sequence().unwrap_or_default()
}

fn joined(value: &Value, separator: &str) -> String {
    items(value)
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

// ---------------------------------------------------------------------------
// Number
// ---------------------------------------------------------------------------

fn to_fixed(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let digits = optional_count(PIPE, args, 0)?.unwrap_or(0);
    if digits > 100 {
        return Err(invalid(PIPE, arg(args, 0).unwrap_or_default()));
    }
    let n = number(value);
    if !n.is_finite() {
        return Ok(Value::String(format_number(n)));
    }
    Ok(Value::String(fixed(n, digits)))
}

/// Decimal exponent `n` shows in `{:.*e}` form with `digits` mantissa decimals.
fn exponent_of(n: f64, digits: usize) -> i64 {
    format!("{n:.digits$e}")
        .split_once('e')
        .and_then(|(_, exp)| exp.parse().ok())
        .unwrap_or(0)
}

/// `d.ddde+X` form with an explicit exponent sign.
fn exponent_form(scientific: &str) -> String {
    match scientific.split_once('e') {
        Some((mantissa, exp)) if exp.starts_with('-') => format!("{mantissa}e{exp}"),
        Some((mantissa, exp)) => format!("{mantissa}e+{exp}"),
        None => scientific.to_string(),
    }
}

fn to_precision(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let n = number(value);
    let Some(precision) = optional_count(PIPE, args, 0)? else {
        return Ok(Value::String(format_number(n)));
    };
    if !(1..=100).contains(&precision) {
        return Err(invalid(PIPE, arg(args, 0).unwrap_or_default()));
    }
    if !n.is_finite() {
        return Ok(Value::String(format_number(n)));
    }

    let n = away_from_tie(n, precision as i64 - 1 - exponent_of(n, precision - 1));
    let scientific = format!("{:.*e}", precision - 1, n);
    let exp = exponent_of(n, precision - 1);
    if exp < -6 || exp >= precision as i64 {
        Ok(Value::String(exponent_form(&scientific)))
    } else {
        let decimals = (precision as i64 - 1 - exp) as usize;
        Ok(Value::String(format!("{n:.decimals$}")))
    }
}

fn to_exponential(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let n = number(value);
    if !n.is_finite() {
        return Ok(Value::String(format_number(n)));
    }
    let scientific = match optional_count(PIPE, args, 0)? {
        Some(digits) if digits > 100 => return Err(invalid(PIPE, arg(args, 0).unwrap_or_default())),
        Some(digits) => {
            let n = away_from_tie(n, digits as i64 - exponent_of(n, digits));
            format!("{n:.digits$e}")
        }
        None => format!("{n:e}"),
    };
    Ok(Value::String(exponent_form(&scientific)))
}

fn number_to_string(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let n = number(value);
    match optional_int(PIPE, args, 0)? {
        None | Some(10) => Ok(Value::String(format_number(n))),
        Some(radix) if (2..=36).contains(&radix) && n.is_finite() && n.fract() == 0.0 => {
            Ok(Value::String(to_radix(n as i128, radix as u32)))
        }
        Some(_) => Err(invalid(PIPE, arg(args, 0).unwrap_or_default())),
    }
}

fn to_radix(n: i128, radix: u32) -> String {
    let mut digits = Vec::new();
    let mut rest = n.unsigned_abs();
    loop {
        let digit = (rest % u128::from(radix)) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('0'));
        rest /= u128::from(radix);
        if rest == 0 {
            break;
        }
    }
    if n < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

// ---------------------------------------------------------------------------
// String
// ---------------------------------------------------------------------------

fn char_at(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let index = optional_count(PIPE, args, 0)?.unwrap_or(0);
    Ok(Value::String(
        text(value).chars().nth(index).map(String::from).unwrap_or_default(),
    ))
}

fn string_index_of(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let haystack = text(value);
    let needle = required(PIPE, args, 0, "the text to search for")?;
    let position = haystack
        .find(needle)
        .map_or(-1, |byte| haystack[..byte].chars().count() as i64);
    Ok(Value::from(position))
}

/// Longest string `repeat`, `padStart` and `padEnd` may produce, in chars.
const MAX_STRING_CHARS: usize = 1 << 24;

fn repeat(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let times = count_arg(PIPE, args, 0, "a repeat count")?;
    let receiver = text(value);
    let too_long = receiver
        .chars()
        .count()
        .checked_mul(times)
        .map_or(true, |len| len > MAX_STRING_CHARS);
    if too_long {
        return Err(invalid(PIPE, arg(args, 0).unwrap_or_default()));
    }
    Ok(Value::String(receiver.repeat(times)))
}

fn padding(value: &Value, args: &[String]) -> Result<Option<String>, PipeError> {
    let width = count_arg(PIPE, args, 0, "a target length")?;
    if width > MAX_STRING_CHARS {
        return Err(invalid(PIPE, arg(args, 0).unwrap_or_default()));
    }
    let fill = arg(args, 1).unwrap_or(" ");
    let len = text(value).chars().count();
    if width <= len || fill.is_empty() {
        return Ok(None);
    }
    Ok(Some(fill.chars().cycle().take(width - len).collect()))
}

fn pad_start(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    Ok(match padding(value, args)? {
        Some(pad) => Value::String(pad + text(value)),
        None => value.clone(),
    })
}

fn pad_end(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    Ok(match padding(value, args)? {
        Some(pad) => Value::String(format!("{}{pad}", text(value))),
        None => value.clone(),
    })
}

fn substring(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let chars: Vec<char> = text(value).chars().collect();
    let clamp = |i: i64| i.clamp(0, chars.len() as i64) as usize;
    let start = clamp(optional_int(PIPE, args, 0)?.unwrap_or(0));
    let end = optional_int(PIPE, args, 1)?.map_or(chars.len(), clamp);
    let (from, to) = if start > end { (end, start) } else { (start, end) };
    Ok(Value::String(chars[from..to].iter().collect()))
}

fn string_split(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let source = text(value);
    let parts = match arg(args, 0) {
        None => vec![Value::from(source)],
        Some("") => source.chars().map(|c| Value::String(c.to_string())).collect(),
        Some(separator) => source.split(separator).map(Value::from).collect(),
    };
    Ok(Value::Sequence(parts))
}

fn replace(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let old = required(PIPE, args, 0, "the text to replace")?;
    let new = arg(args, 1).unwrap_or_default();
    Ok(Value::String(text(value).replacen(old, new, 1)))
}

// ---------------------------------------------------------------------------
// Date
// ---------------------------------------------------------------------------

/// RFC 3339, or `YYYY-MM-DD` with an optional time, taken as UTC.
fn parse_date(source: &str) -> Option<DateTime<FixedOffset>> {
    let source = source.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(source) {
        return Some(date);
    }
    let utc = FixedOffset::east_opt(0)?;
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(source, format) {
            return Some(utc.from_utc_datetime(&naive));
        }
    }
    let midnight = NaiveDate::parse_from_str(source, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0)?;
    Some(utc.from_utc_datetime(&midnight))
}

fn date_of(value: &Value) -> Result<DateTime<FixedOffset>, PipeError> {
    parse_date(text(value)).ok_or_else(|| PipeError::NotADate(text(value).to_string()))
}

fn to_iso_string(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    let date = date_of(value)?.with_timezone(&Utc);
    Ok(Value::String(date.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()))
}

// ---------------------------------------------------------------------------
// Sequence and mapping
// ---------------------------------------------------------------------------

/// Position counted from the end when negative, clamped to `len`.
fn relative(index: i64, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs() as usize)
    } else {
        (index as usize).min(len)
    }
}

fn sequence_slice(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let list = items(value);
    let start = relative(optional_int(PIPE, args, 0)?.unwrap_or(0), list.len());
    let end = optional_int(PIPE, args, 1)?.map_or(list.len(), |end| relative(end, list.len()));
    Ok(Value::Sequence(list.get(start..end).unwrap_or_default().to_vec()))
}

fn position(value: &Value, needle: &str) -> Option<usize> {
    items(value).iter().position(|item| item.to_string() == needle)
}

fn sequence_index_of(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let needle = required(PIPE, args, 0, "the element to search for")?;
    Ok(Value::from(position(value, needle).map_or(-1, |i| i as i64)))
}

fn sequence_includes(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let needle = required(PIPE, args, 0, "the element to search for")?;
    Ok(Value::Bool(position(value, needle).is_some()))
}

fn at(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let list = items(value);
    let index = optional_int(PIPE, args, 0)?.unwrap_or(0);
    let resolved = if index < 0 {
        list.len().checked_sub(index.unsigned_abs() as usize)
    } else {
        Some(index as usize)
    };
    Ok(resolved
        .and_then(|i| list.get(i))
        .cloned()
        .unwrap_or(Value::Null))
}

fn has_own_property(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let key = required(PIPE, args, 0, "a key")?.trim();
    Ok(Value::Bool(matches!(value, Value::Mapping(map) if map.contains_key(key))))
}
