//! Built-in pipe catalog and the chain executor.
//!
//! Two families of pipes exist:
//!
//! | Family    | On success           | On failure              |
//! |-----------|----------------------|-------------------------|
//! | Predicate | input, unchanged     | `false` (the sentinel)  |
//! | Transform | a new value          | a [`PipeError`]         |
//!
//! Predicate pipes let a chain such as `age|more>30|choose>Old>Young` or
//! `if #|more>0|less>2` keep working on the original value after a test.
//!
//! Arguments arrive verbatim. Pipes that read an argument as a number,
//! pattern, field name or comparison operand trim it first; pipes that
//! insert argument text into the output (`join`, `choose`, `style`, ...) do
//! not.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;

use markup_core::value::{format_number, parse_number};
use markup_core::{PipeError, PipeInvocation, Value};

use crate::dispatch;

/// Signature shared by built-in and caller-supplied pipes.
pub type PipeFn = dyn Fn(&Value, &[String]) -> Result<Value, PipeError> + Send + Sync;

/// Shareable handle to a pipe.
pub type Pipe = Arc<PipeFn>;

type Builtin = fn(&Value, &[String]) -> Result<Value, PipeError>;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Whether a pipe passes its input through on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Predicate,
    Transform,
}

/// Catalog entry describing a built-in pipe.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PipeInfo {
    pub name: &'static str,
    pub family: Family,
    pub usage: &'static str,
    pub summary: &'static str,
}

struct Entry {
    info: PipeInfo,
    run: Builtin,
}

const fn predicate(name: &'static str, usage: &'static str, summary: &'static str, run: Builtin) -> Entry {
    Entry {
        info: PipeInfo { name, family: Family::Predicate, usage, summary },
        run,
    }
}

const fn transform(name: &'static str, usage: &'static str, summary: &'static str, run: Builtin) -> Entry {
    Entry {
        info: PipeInfo { name, family: Family::Transform, usage, summary },
        run,
    }
}

#[rustfmt::skip]
const BUILTINS: &[Entry] = &[
    // predicates
    predicate("equals",    "equals>x",        "value loosely equal to x",              equals),
    predicate("notequals", "notequals>x",     "value not loosely equal to x",          notequals),
    predicate("more",      "more>x",          "value (or sequence length) above x",    more),
    predicate("less",      "less>x",          "value (or sequence length) below x",    less),
    predicate("ormore",    "ormore>x",        "value (or sequence length) at least x", ormore),
    predicate("orless",    "orless>x",        "value (or sequence length) at most x",  orless),
    predicate("between",   "between>lo>hi",   "value (or sequence length) in [lo, hi]", between),
    predicate("like",      "like>pattern",    "case-insensitive glob match, `*` wildcard", like),
    predicate("notlike",   "notlike>pattern", "negated `like`",                        notlike),
    predicate("even",      "even",            "even number",                           even),
    predicate("odd",       "odd",             "odd number",                            odd),
    predicate("divisible", "divisible>n",     "number divisible by n",                 divisible),
    // text
    transform("upcase",    "upcase",          "upper case",                            upcase),
    transform("downcase",  "downcase",        "lower case",                            downcase),
    transform("capcase",   "capcase",         "capitalize every word",                 capcase),
    transform("trim",      "trim",            "strip surrounding whitespace",          trim),
    transform("pack",      "pack",            "collapse whitespace runs, then trim",   pack),
    transform("chop",      "chop>n",          "first n characters plus `...`",         chop),
    transform("tease",     "tease>n",         "first n words plus `...`",              tease),
    transform("style",     "style>classes",   "wrap in <span class=\"classes\">",      style),
    transform("clean",     "clean",           "strip markup tags",                     clean),
    transform("sub",       "sub>old>new",     "replace the first occurrence of old",   sub),
    transform("url",       "url",             "percent-encode unsafe characters",      url),
    // numbers
    transform("round",     "round",           "nearest integer",                       round),
    transform("fix",       "fix>n",           "fixed n-decimal text",                  fix),
    transform("mod",       "mod>n",           "remainder after division by n",         modulo),
    transform("number",    "number",          "leading numeric text as a number",      number),
    // collections
    transform("size",      "size",            "length of text or collection",          size),
    transform("length",    "length",          "alias of size",                         size),
    transform("reverse",   "reverse",         "reverse a sequence or text",            reverse),
    transform("join",      "join>sep",        "join elements, default `,`",            join),
    transform("split",     "split>sep",       "split text into a sequence, default `,`", split),
    transform("slice",     "slice>start>count", "sub-sequence or substring",           slice),
    transform("limit",     "limit>n>offset",  "first n elements after offset",         limit),
    transform("first",     "first",           "first element",                         first),
    transform("last",      "last",            "last element",                          last),
    transform("sort",      "sort>key",        "ascending sort, optionally by field",   sort),
    // logic
    transform("choose",    "choose>a>b",      "a when truthy, else b",                 choose),
    transform("toggle",    "toggle>keys>values>default", "map value through comma lists", toggle),
    transform("blank",     "blank>default",   "default for null or empty text",        blank),
    transform("empty",     "empty",           "true when null, blank or without entries", empty),
    transform("notempty",  "notempty",        "negated `empty`",                       notempty),
    transform("bool",      "bool",            "truthiness as a boolean",               boolean),
    transform("falsy",     "falsy",           "negated `bool`",                        falsy),
    // dispatch
    transform("call",      "call>method>args", "invoke a method of the value's type",  call),
    transform("log",       "log>label",       "log the value at debug level",          log),
];

/// Descriptions of every built-in pipe, in catalog order.
pub fn catalog() -> impl Iterator<Item = &'static PipeInfo> {
    BUILTINS.iter().map(|entry| &entry.info)
}

/// Built-in pipes as shareable handles, for seeding a registry.
pub(crate) fn builtins() -> impl Iterator<Item = (&'static str, Pipe)> {
    BUILTINS.iter().map(|entry| (entry.info.name, Arc::new(entry.run) as Pipe))
}

// ---------------------------------------------------------------------------
// Chain executor
// ---------------------------------------------------------------------------

/// Run `chain` left to right, feeding each result into the next pipe.
///
/// `lookup` resolves pipe names; the first unknown name or failing pipe
/// stops the chain. An empty chain hands the input back untouched.
pub fn run_chain<'v, F>(
    chain: &[PipeInvocation],
    input: Cow<'v, Value>,
    lookup: F,
) -> Result<Cow<'v, Value>, PipeError>
where
    F: Fn(&str) -> Option<Pipe>,
{
    chain.iter().try_fold(input, |value, invocation| {
        let pipe = lookup(&invocation.name)
            .ok_or_else(|| PipeError::UnknownPipe(invocation.name.clone()))?;
        pipe(&value, &invocation.args).map(Cow::Owned)
    })
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

pub(crate) fn arg(args: &[String], i: usize) -> Option<&str> {
    args.get(i).map(String::as_str)
}

pub(crate) fn required<'a>(
    pipe: &str,
    args: &'a [String],
    i: usize,
    expected: &'static str,
) -> Result<&'a str, PipeError> {
    arg(args, i).ok_or_else(|| PipeError::MissingArgument {
        pipe: pipe.to_string(),
        expected,
    })
}

pub(crate) fn invalid(pipe: &str, raw: &str) -> PipeError {
    PipeError::InvalidArgument {
        pipe: pipe.to_string(),
        arg: raw.to_string(),
    }
}

fn unsupported(pipe: &str, value: &Value) -> PipeError {
    PipeError::UnsupportedValue {
        pipe: pipe.to_string(),
        kind: value.kind(),
    }
}

fn number_arg(pipe: &str, args: &[String], i: usize, expected: &'static str) -> Result<f64, PipeError> {
    let raw = required(pipe, args, i, expected)?;
    parse_number(raw).ok_or_else(|| invalid(pipe, raw))
}

/// Optional integer argument; missing or blank is `None`.
pub(crate) fn optional_int(pipe: &str, args: &[String], i: usize) -> Result<Option<i64>, PipeError> {
    match arg(args, i) {
        Some(raw) if !raw.trim().is_empty() => match parse_number(raw) {
            Some(n) if n.is_finite() => Ok(Some(n.trunc() as i64)),
            _ => Err(invalid(pipe, raw)),
        },
        _ => Ok(None),
    }
}

pub(crate) fn optional_count(pipe: &str, args: &[String], i: usize) -> Result<Option<usize>, PipeError> {
    match optional_int(pipe, args, i)? {
        Some(n) if n < 0 => Err(invalid(pipe, arg(args, i).unwrap_or_default())),
        Some(n) => Ok(Some(n as usize)),
        None => Ok(None),
    }
}

pub(crate) fn count_arg(pipe: &str, args: &[String], i: usize, expected: &'static str) -> Result<usize, PipeError> {
    required(pipe, args, i, expected)?;
    optional_count(pipe, args, i)?.ok_or_else(|| invalid(pipe, arg(args, i).unwrap_or_default()))
}

fn number_of(pipe: &str, value: &Value) -> Result<f64, PipeError> {
    value.to_number().ok_or_else(|| unsupported(pipe, value))
}

fn text(value: &Value) -> String {
    value.to_string()
}

/// Predicate outcome: the input itself, or the `false` sentinel.
fn pass(value: &Value, ok: bool) -> Value {
    if ok {
        value.clone()
    } else {
        Value::Bool(false)
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Sequences compare by their length.
fn measure(value: &Value) -> Cow<'_, Value> {
    match value {
        Value::Sequence(items) => Cow::Owned(Value::from(items.len())),
        other => Cow::Borrowed(other),
    }
}

/// Numeric when both sides read as numbers, lexical otherwise.
pub(crate) fn loose_cmp(value: &Value, operand: &str) -> Option<Ordering> {
    match (value.to_number(), parse_number(operand)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(text(value).as_str().cmp(operand)),
    }
}

/// Sort key for `sort`: numbers first in numeric order, then text.
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(value: &Value) -> Self {
        match value.to_number() {
            Some(n) => SortKey::Number(n),
            None => SortKey::Text(text(value)),
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
        }
    }
}

fn compare(pipe: &str, value: &Value, args: &[String], test: fn(Ordering) -> bool) -> Result<Value, PipeError> {
    let operand = required(pipe, args, 0, "a value to compare with")?.trim();
    let ok = loose_cmp(&measure(value), operand).is_some_and(test);
    Ok(pass(value, ok))
}

fn equals(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let operand = required("equals", args, 0, "a value to compare with")?.trim();
    Ok(pass(value, loose_cmp(value, operand) == Some(Ordering::Equal)))
}

fn notequals(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let operand = required("notequals", args, 0, "a value to compare with")?.trim();
    Ok(pass(value, loose_cmp(value, operand) != Some(Ordering::Equal)))
}

fn more(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    compare("more", value, args, Ordering::is_gt)
}

fn less(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    compare("less", value, args, Ordering::is_lt)
}

fn ormore(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    compare("ormore", value, args, Ordering::is_ge)
}

fn orless(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    compare("orless", value, args, Ordering::is_le)
}

fn between(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let low = required("between", args, 0, "a lower bound")?.trim();
    let high = required("between", args, 1, "an upper bound")?.trim();
    let measured = measure(value);
    let ok = loose_cmp(&measured, low).is_some_and(Ordering::is_ge)
        && loose_cmp(&measured, high).is_some_and(Ordering::is_le);
    Ok(pass(value, ok))
}

fn like(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let pattern = required("like", args, 0, "a pattern")?.trim();
    Ok(pass(value, glob_match(&pattern.to_lowercase(), &text(value).to_lowercase())))
}

fn notlike(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let pattern = required("notlike", args, 0, "a pattern")?.trim();
    Ok(pass(value, !glob_match(&pattern.to_lowercase(), &text(value).to_lowercase())))
}

/// Whole-text glob match where `*` matches any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

fn even(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(pass(value, value.to_number().is_some_and(|n| n % 2.0 == 0.0)))
}

fn odd(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(pass(value, value.to_number().is_some_and(|n| n.abs() % 2.0 == 1.0)))
}

fn divisible(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let divisor = number_arg("divisible", args, 0, "a divisor")?;
    Ok(pass(value, value.to_number().is_some_and(|n| n % divisor == 0.0)))
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

fn upcase(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(Value::String(text(value).to_uppercase()))
}

fn downcase(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(Value::String(text(value).to_lowercase()))
}

fn capcase(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    let source = text(value);
    let mut out = String::with_capacity(source.len());
    let mut word_start = true;
    for c in source.chars() {
        if word_start && !c.is_whitespace() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        word_start = c.is_whitespace();
    }
    Ok(Value::String(out))
}

fn trim(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(Value::from(text(value).trim()))
}

fn pack(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(Value::String(text(value).split_whitespace().collect::<Vec<_>>().join(" ")))
}

fn chop(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let n = count_arg("chop", args, 0, "a character count")?;
    let source = text(value);
    if source.chars().count() > n {
        Ok(Value::String(source.chars().take(n).chain("...".chars()).collect()))
    } else {
        Ok(Value::String(source))
    }
}

fn tease(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let n = count_arg("tease", args, 0, "a word count")?;
    let source = text(value);
    let words: Vec<&str> = source.split_whitespace().collect();
    if words.len() > n {
        Ok(Value::String(format!("{}...", words[..n].join(" "))))
    } else {
        Ok(Value::String(source))
    }
}

fn style(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let classes = required("style", args, 0, "a class list")?;
    Ok(Value::String(format!("<span class=\"{classes}\">{value}</span>")))
}

fn clean(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(Value::String(strip_tags(&text(value))))
}

/// Remove every `<...>` run that has at least one character inside.
fn strip_tags(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(end) if end > 0 => rest = &after[end + 1..],
            _ => {
                out.push('<');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn sub(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let old = required("sub", args, 0, "the text to replace")?;
    let new = arg(args, 1).unwrap_or_default();
    Ok(Value::String(text(value).replacen(old, new, 1)))
}

fn url(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(Value::String(encode_uri(&text(value))))
}

/// Percent-encode everything except URI-safe and URI-reserved characters.
fn encode_uri(source: &str) -> String {
    const KEEP: &str = ";,/?:@&=+$-_.!~*'()#";
    let mut out = String::with_capacity(source.len());
    for c in source.chars() {
        if c.is_ascii_alphanumeric() || KEEP.contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

fn round(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    // Halves round toward positive infinity.
    Ok(Value::Number((number_of("round", value)? + 0.5).floor()))
}

fn fix(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let digits = optional_count("fix", args, 0)?.unwrap_or(0);
    if digits > 100 {
        return Err(invalid("fix", arg(args, 0).unwrap_or_default()));
    }
    let n = number_of("fix", value)?;
    if !n.is_finite() {
        return Ok(Value::String(format_number(n)));
    }
    Ok(Value::String(fixed(n, digits)))
}

const POW10: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
    1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

/// Moves `n` one ulp away from zero when it sits exactly halfway between two
/// values with `decimals` fractional digits (negative: integer places).
///
/// Rust formatting breaks such ties toward even; `fix` and the number methods
/// of `call` break them away from zero.
pub(crate) fn away_from_tie(n: f64, decimals: i64) -> f64 {
    let Some(&scale) = usize::try_from(decimals.unsigned_abs())
        .ok()
        .and_then(|i| POW10.get(i))
    else {
        return n;
    };
    let (scaled, exact) = if decimals >= 0 {
        let scaled = n * scale;
        (scaled, n.mul_add(scale, -scaled) == 0.0)
    } else {
        let scaled = n / scale;
        (scaled, scaled.mul_add(scale, -n) == 0.0)
    };
    if exact && scaled.fract().abs() == 0.5 {
        f64::from_bits(n.to_bits() + 1)
    } else {
        n
    }
}

/// `n` with exactly `digits` decimals, halves rounded away from zero.
pub(crate) fn fixed(n: f64, digits: usize) -> String {
    let n = away_from_tie(n, digits as i64);
    format!("{n:.digits$}")
}

fn modulo(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let divisor = number_arg("mod", args, 0, "a divisor")?;
    Ok(Value::Number(number_of("mod", value)? % divisor))
}

fn number(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        other => Ok(Value::Number(leading_number(&text(other)))),
    }
}

/// Longest numeric prefix of `source`, or NaN.
fn leading_number(source: &str) -> f64 {
    let source = source.trim_start();
    let bytes = source.as_bytes();
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        digits += frac_end - end - 1;
        end = frac_end;
    }
    if digits == 0 {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }
    source[..end].parse().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

fn size(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    match value {
        Value::String(s) => Ok(Value::from(s.chars().count())),
        Value::Sequence(items) => Ok(Value::from(items.len())),
        Value::Mapping(map) => Ok(Value::from(map.len())),
        other => Err(unsupported("size", other)),
    }
}

fn reverse(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    match value {
        Value::Sequence(items) => Ok(Value::Sequence(items.iter().rev().cloned().collect())),
        other => Ok(Value::String(text(other).chars().rev().collect())),
    }
}

fn join(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let separator = arg(args, 0).unwrap_or(",");
    match value {
        Value::Sequence(items) => Ok(Value::String(
            items.iter().map(Value::to_string).collect::<Vec<_>>().join(separator),
        )),
        other => Err(unsupported("join", other)),
    }
}

fn split(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let separator = arg(args, 0).unwrap_or(",");
    let source = text(value);
    let parts: Vec<Value> = if separator.is_empty() {
        source.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        source.split(separator).map(Value::from).collect()
    };
    Ok(Value::Sequence(parts))
}

/// Clamp `start` (negative counts from the end) and `count` to `len`.
fn window(len: usize, start: i64, count: Option<usize>) -> Range<usize> {
    let start = if start < 0 {
        len.saturating_sub(start.unsigned_abs() as usize)
    } else {
        (start as usize).min(len)
    };
    let end = count.map_or(len, |c| start.saturating_add(c).min(len));
    start..end
}

fn take_window(pipe: &str, value: &Value, start: i64, count: Option<usize>) -> Result<Value, PipeError> {
    match value {
        Value::Sequence(items) => Ok(Value::Sequence(items[window(items.len(), start, count)].to_vec())),
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::String(chars[window(chars.len(), start, count)].iter().collect()))
        }
        other => Err(unsupported(pipe, other)),
    }
}

fn slice(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let start = optional_int("slice", args, 0)?.unwrap_or(0);
    let count = optional_count("slice", args, 1)?;
    take_window("slice", value, start, count)
}

fn limit(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let count = count_arg("limit", args, 0, "an element count")?;
    let offset = optional_int("limit", args, 1)?.unwrap_or(0);
    take_window("limit", value, offset, Some(count))
}

fn first(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    match value {
        Value::Sequence(items) => Ok(items.first().cloned().unwrap_or(Value::Null)),
        Value::String(s) => Ok(Value::String(s.chars().take(1).collect())),
        other => Err(unsupported("first", other)),
    }
}

fn last(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    match value {
        Value::Sequence(items) => Ok(items.last().cloned().unwrap_or(Value::Null)),
        Value::String(s) => Ok(Value::String(s.chars().last().map(String::from).unwrap_or_default())),
        other => Err(unsupported("last", other)),
    }
}

static NULL: Value = Value::Null;

fn sort_key<'v>(item: &'v Value, key: Option<&str>) -> &'v Value {
    match key {
        Some(key) => item.get(key).unwrap_or(&NULL),
        None => item,
    }
}

fn sort(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let key = arg(args, 0).map(str::trim).filter(|k| !k.is_empty());
    match value {
        Value::Sequence(items) => {
            let mut keyed: Vec<(SortKey, &Value)> = items
                .iter()
                .map(|item| (SortKey::of(sort_key(item, key)), item))
                .collect();
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(Value::Sequence(keyed.into_iter().map(|(_, item)| item.clone()).collect()))
        }
        other => Err(unsupported("sort", other)),
    }
}

// ---------------------------------------------------------------------------
// Logic
// ---------------------------------------------------------------------------

fn choose(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let yes = required("choose", args, 0, "a value for the true case")?;
    let no = arg(args, 1).unwrap_or_default();
    Ok(Value::from(if value.is_truthy() { yes } else { no }))
}

fn toggle(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let keys = required("toggle", args, 0, "a comma-separated key list")?;
    let values = required("toggle", args, 1, "a comma-separated value list")?;
    let fallback = arg(args, 2).unwrap_or_default();
    let needle = text(value);
    let picked = keys
        .split(',')
        .position(|key| key.trim() == needle.trim())
        .and_then(|i| values.split(',').nth(i))
        .map(str::trim);
    Ok(Value::from(picked.unwrap_or(fallback)))
}

fn blank(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    match value {
        Value::Null => Ok(Value::from(arg(args, 0).unwrap_or_default())),
        Value::String(s) if s.is_empty() => Ok(Value::from(arg(args, 0).unwrap_or_default())),
        other => Ok(other.clone()),
    }
}

fn empty(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(Value::Bool(value.is_empty()))
}

fn notempty(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(Value::Bool(!value.is_empty()))
}

fn boolean(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(Value::Bool(value.is_truthy()))
}

fn falsy(value: &Value, _args: &[String]) -> Result<Value, PipeError> {
    Ok(Value::Bool(!value.is_truthy()))
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

fn call(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let method = required("call", args, 0, "a method name")?.trim();
    dispatch::call(value, method, &args[1..])
}

fn log(value: &Value, args: &[String]) -> Result<Value, PipeError> {
    let label = arg(args, 0).map(str::trim).unwrap_or("log");
    tracing::debug!(label, kind = %value.kind(), value = %value, "log pipe");
    Ok(value.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
