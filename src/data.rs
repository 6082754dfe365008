//! Conversion output values.
//!
//! `Data` is a JSON value that may also hold record instances. Values that a
//! conversion leaves unconverted are stored as their plain JSON shape.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::record::{Instance, Record};

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Data>),
    Map(IndexMap<String, Data>), // input key order
    Instance(Box<Instance>),
}

impl Data {
    pub fn is_null(&self) -> bool {
        matches!(self, Data::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Data::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Data::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Data]> {
        match self {
            Data::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Data>> {
        match self {
            Data::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Data::Instance(instance) => Some(instance),
            _ => None,
        }
    }
}

// ------------------------------ Conversions ------------------------------- //

impl From<&Value> for Data {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Data::Null,
            Value::Bool(b) => Data::Bool(*b),
            Value::Number(n) => Data::Number(n.clone()),
            Value::String(s) => Data::String(s.clone()),
            Value::Array(items) => Data::List(items.iter().map(Data::from).collect()),
            Value::Object(entries) => Data::Map(
                entries.iter().map(|(k, v)| (k.clone(), Data::from(v))).collect(),
            ),
        }
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Data::Null,
            Value::Bool(b) => Data::Bool(b),
            Value::Number(n) => Data::Number(n),
            Value::String(s) => Data::String(s),
            Value::Array(items) => Data::List(items.into_iter().map(Data::from).collect()),
            Value::Object(entries) => Data::Map(
                entries.into_iter().map(|(k, v)| (k, Data::from(v))).collect(),
            ),
        }
    }
}

impl From<Instance> for Data {
    fn from(instance: Instance) -> Self {
        Data::Instance(Box::new(instance))
    }
}

impl From<Record> for Data {
    fn from(record: Record) -> Self {
        Data::from(Instance::Record(record))
    }
}

impl From<bool> for Data {
    fn from(b: bool) -> Self {
        Data::Bool(b)
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Data::String(s.to_owned())
    }
}

impl From<String> for Data {
    fn from(s: String) -> Self {
        Data::String(s)
    }
}

macro_rules! data_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Data {
            fn from(n: $t) -> Self {
                Data::Number(Number::from(n))
            }
        })*
    };
}

data_from_int!(i32, i64, u32, u64);

/// Non-finite floats have no JSON number form and become `Null`.
impl From<f64> for Data {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Data::Number).unwrap_or(Data::Null)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::Null => f.write_str("null"),
            Data::Bool(b) => write!(f, "{b}"),
            Data::Number(n) => write!(f, "{n}"),
            Data::String(s) => write!(f, "{s:?}"),
            Data::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Data::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                f.write_str("}")
            }
            Data::Instance(instance) => write!(f, "{instance}"),
        }
    }
}
