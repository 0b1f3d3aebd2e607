//! Context values.
//!
//! Every datum a template can see is a [`Value`]. Host data enters either
//! through the `From` conversions (including `serde_json::Value`) or by
//! deserializing any serde format straight into a `Value`.
//!
//! Values are never mutated by the engine. Pipes produce new values.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::error::PipeError;

/// Keyed children of a [`Value::Mapping`].
pub type Mapping = BTreeMap<String, Value>;

/// Text every mapping and object renders as.
pub const OPAQUE_MARKER: &str = "[object Object]";

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A context datum.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Mapping),
    /// Host object with fields and callable methods (see [`Object`]).
    Object(Object),
}

/// Runtime type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Sequence,
    Mapping,
    Object,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Sequence => "sequence",
            Kind::Mapping => "mapping",
            Kind::Object => "object",
        };
        f.write_str(name)
    }
}

/// The empty context: an empty mapping.
impl Default for Value {
    fn default() -> Self {
        Value::Mapping(Mapping::new())
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Sequence(_) => Kind::Sequence,
            Value::Mapping(_) => Kind::Mapping,
            Value::Object(_) => Kind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric reading of the value: numbers as-is, strings when their
    /// trimmed text parses as a number. Everything else is `None`.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }

    /// One step of path resolution: mapping key, sequence index or object
    /// field. `None` means the segment does not exist.
    pub fn get(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(segment),
            Value::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(object) => object.field(segment),
            _ => None,
        }
    }

    /// Add `key` to a mapping. Other variants are returned unchanged.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Value::Mapping(map) = &mut self {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Null, `false`, blank text, or a collection with no entries.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null | Value::Bool(false) => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Sequence(items) => items.is_empty(),
            Value::Mapping(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Loose truthiness used by `bool`, `falsy` and `choose`: null, false,
    /// zero, NaN and the empty string are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

/// Parse trimmed text as a number. Empty text is not a number.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok()
}

/// Minimal decimal text: `145`, `33.3`, `-0.5`, `NaN`, `Infinity`.
///
/// Magnitudes from `1e21` up and below `1e-6` use exponent form (`1e+21`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let scientific = format!("{n:e}");
        match scientific.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => scientific,
        }
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Sequence(items) => items.iter().try_for_each(|item| write!(f, "{item}")),
            Value::Mapping(_) | Value::Object(_) => f.write_str(OPAQUE_MARKER),
        }
    }
}

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

/// Signature of an [`Object`] method: the receiver plus raw string arguments.
pub type Method = dyn Fn(&Object, &[String]) -> Result<Value, PipeError> + Send + Sync;

/// Opaque host value with named fields and a method table.
///
/// Cloning is cheap; equality is identity.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

struct ObjectInner {
    class: String,
    fields: Mapping,
    methods: BTreeMap<String, Arc<Method>>,
}

impl Object {
    pub fn builder(class: impl Into<String>) -> ObjectBuilder {
        ObjectBuilder {
            class: class.into(),
            fields: Mapping::new(),
            methods: BTreeMap::new(),
        }
    }

    pub fn class(&self) -> &str {
        &self.inner.class
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.inner.fields.get(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.inner.methods.contains_key(name)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.inner.methods.keys().map(String::as_str)
    }

    /// Invoke a method by name.
    pub fn call(&self, method: &str, args: &[String]) -> Result<Value, PipeError> {
        match self.inner.methods.get(method) {
            Some(run) => run(self, args),
            None => Err(PipeError::UnknownMethod {
                target: self.inner.class.clone(),
                method: method.to_string(),
            }),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.inner.class)
            .field("fields", &self.inner.fields)
            .field("methods", &self.inner.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`Object`].
pub struct ObjectBuilder {
    class: String,
    fields: Mapping,
    methods: BTreeMap<String, Arc<Method>>,
}

impl ObjectBuilder {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&Object, &[String]) -> Result<Value, PipeError> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(run));
        self
    }

    pub fn build(self) -> Object {
        Object {
            inner: Arc::new(ObjectInner {
                class: self.class,
                fields: self.fields,
                methods: self.methods,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Mapping(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any context value")
    }

    fn visit_bool<E>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E>(self, n: i64) -> Result<Value, E> {
        Ok(Value::Number(n as f64))
    }

    fn visit_u64<E>(self, n: u64) -> Result<Value, E> {
        Ok(Value::Number(n as f64))
    }

    fn visit_f64<E>(self, n: f64) -> Result<Value, E> {
        Ok(Value::Number(n))
    }

    fn visit_str<E>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_owned()))
    }

    fn visit_string<E>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Mapping::new();
        // Non-string keys (YAML allows them) are stored by their text.
        while let Some((key, value)) = access.next_entry::<Value, Value>()? {
            map.insert(key.to_string(), value);
        }
        Ok(Value::Mapping(map))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
