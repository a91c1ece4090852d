//! Row-source values
//!
//! Column resolution walks attribute paths across row sources. Each step
//! yields a [`Value`]: a scalar, a related record, or a callable that the
//! default resolver may invoke. Whether a callable is safe to invoke is an
//! explicit flag on the callable, not something inferred at runtime.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::AttributeError;

/// Capability interface for one domain record backing a table row.
pub trait RowSource: Send + Sync {
    /// Primary identifier, emitted as `DT_RowId`.
    fn pk(&self) -> Value;

    /// Fetch a named attribute.
    ///
    /// # Errors
    /// `AttributeError::Missing` when the name is not an attribute, and
    /// `AttributeError::RelatedObjectMissing` when it names a relation with
    /// no target.
    fn attribute(&self, name: &str) -> Result<Value, AttributeError>;

    /// Canonical string representation, used when a record is the terminal
    /// value of an attribute path.
    fn display(&self) -> String;
}

type CallFn = dyn Fn() -> Result<Value, AttributeError> + Send + Sync;

/// A zero-argument callable attribute.
#[derive(Clone)]
pub struct Callable {
    name: String,
    func: Arc<CallFn>,
    alters_data: bool,
    collection: bool,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn() -> Result<Value, AttributeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
            alters_data: false,
            collection: false,
        }
    }

    /// Mark the callable as mutating; the default resolver never invokes it.
    pub fn alters_data(mut self) -> Self {
        self.alters_data = true;
        self
    }

    /// Mark the callable as a bulk relation manager; the default resolver
    /// never invokes it.
    ///
    /// A path that reaches a flagged callable resolves every later segment
    /// to null. Managers whose members should be reachable (`entries__count`)
    /// are exposed as a related [`Record`] holding callable attributes.
    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the default resolver may call this during traversal.
    pub fn is_invocable(&self) -> bool {
        !self.alters_data && !self.collection
    }

    pub fn call(&self) -> Result<Value, AttributeError> {
        (self.func)()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("alters_data", &self.alters_data)
            .field("collection", &self.collection)
            .finish()
    }
}

/// A value produced by an attribute lookup or a column resolver.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Record(Arc<dyn RowSource>),
    Callable(Callable),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn record(source: impl RowSource + 'static) -> Self {
        Value::Record(Arc::new(source))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::Record(r) => f.write_str(&r.display()),
            Value::Callable(c) => f.write_str(c.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(x) => write!(f, "Float({})", x),
            Value::Text(s) => write!(f, "Text({:?})", s),
            Value::Record(r) => write!(f, "Record({:?})", r.display()),
            Value::Callable(c) => write!(f, "{:?}", c),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => Arc::ptr_eq(&a.func, &b.func),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Record(r) => serializer.serialize_str(&r.display()),
            Value::Callable(c) => serializer.serialize_str(c.name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Callable(c)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A map-backed row source.
///
/// Absent keys report `AttributeError::Missing`; names registered through
/// [`Record::with_missing_relation`] report `RelatedObjectMissing`.
#[derive(Clone, Default)]
pub struct Record {
    pk: Value,
    label: Option<String>,
    attributes: BTreeMap<String, Value>,
    missing_relations: Vec<String>,
}

impl Record {
    pub fn new(pk: impl Into<Value>) -> Self {
        Self {
            pk: pk.into(),
            ..Default::default()
        }
    }

    /// Set the canonical string representation.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Attach a related record.
    pub fn with_related(self, name: impl Into<String>, related: Record) -> Self {
        self.with(name, Value::record(related))
    }

    pub fn with_missing_relation(mut self, name: impl Into<String>) -> Self {
        self.missing_relations.push(name.into());
        self
    }

    /// Build a record from a JSON object.
    ///
    /// `pk` (or `id`) becomes the primary identifier and `__str__` the label.
    /// Nested objects become related records; arrays are kept as their JSON
    /// text. Returns `None` for anything but an object.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let pk = object
            .get("pk")
            .or_else(|| object.get("id"))
            .map(json_scalar)
            .unwrap_or(Value::Null);

        let mut record = Record::new(pk);
        for (key, item) in object {
            if key == "__str__" {
                record.label = item.as_str().map(str::to_string);
                continue;
            }
            let value = match item {
                serde_json::Value::Object(_) => Record::from_json(item)
                    .map(Value::record)
                    .unwrap_or(Value::Null),
                other => json_scalar(other),
            };
            record.attributes.insert(key.clone(), value);
        }
        Some(record)
    }
}

fn json_scalar(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or_default()),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

impl RowSource for Record {
    fn pk(&self) -> Value {
        self.pk.clone()
    }

    fn attribute(&self, name: &str) -> Result<Value, AttributeError> {
        if self.missing_relations.iter().any(|r| r == name) {
            return Err(AttributeError::RelatedObjectMissing {
                name: name.to_string(),
            });
        }
        if name == "pk" {
            return Ok(self.pk.clone());
        }
        self.attributes
            .get(name)
            .cloned()
            .ok_or_else(|| AttributeError::Missing {
                name: name.to_string(),
            })
    }

    fn display(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("Record object ({})", self.pk),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("pk", &self.pk)
            .field("label", &self.label)
            .field("attributes", &self.attributes)
            .finish()
    }
}
