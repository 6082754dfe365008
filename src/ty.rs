//! Declared field types.
//!
//! A `TypeExpr` is the tagged shape of a field's declared type. It is built
//! once when a record type is declared and never re-inspected from raw input.

use std::fmt;

use serde_json::Value;

use crate::data::Data;
use crate::record::RecordRef;

#[derive(Debug, Clone)]
pub enum TypeExpr {
    Any,                             // accepts everything, never coerced
    Null,                            // the explicit "no value" marker
    Bool,
    Int,
    Float,
    Str,
    Record(RecordRef),               // nested record type
    List(Box<TypeExpr>),             // sequence of E
    Map(Box<TypeExpr>, Box<TypeExpr>), // mapping of K to V
    Union(Vec<TypeExpr>),            // alternatives, declaration order
}

impl TypeExpr {
    pub fn record(ty: &RecordRef) -> Self {
        TypeExpr::Record(RecordRef::clone(ty))
    }

    pub fn list(item: TypeExpr) -> Self {
        TypeExpr::List(Box::new(item))
    }

    pub fn map(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::Map(Box::new(key), Box::new(value))
    }

    /// `T | null`
    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::union([inner, TypeExpr::Null])
    }

    /// Nested unions are flattened; a single alternative collapses to itself.
    pub fn union(alternatives: impl IntoIterator<Item = TypeExpr>) -> Self {
        let mut arms = Vec::new();
        for alt in alternatives {
            match alt {
                TypeExpr::Union(inner) => arms.extend(inner),
                other => arms.push(other),
            }
        }
        if arms.len() == 1 {
            arms.remove(0)
        } else {
            TypeExpr::Union(arms)
        }
    }

    /// The alternatives of a union, or the type itself.
    pub fn alternatives(&self) -> impl Iterator<Item = &TypeExpr> {
        let arms: &[TypeExpr] = match self {
            TypeExpr::Union(arms) => arms,
            other => std::slice::from_ref(other),
        };
        arms.iter()
    }

    /// Direct type arguments: list item, map key/value, union alternatives.
    pub fn args(&self) -> Vec<&TypeExpr> {
        match self {
            TypeExpr::List(item) => vec![item.as_ref()],
            TypeExpr::Map(key, value) => vec![key.as_ref(), value.as_ref()],
            TypeExpr::Union(arms) => arms.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Structural runtime check of a (coerced) value against this type.
    pub fn matches(&self, data: &Data) -> bool {
        match (self, data) {
            (TypeExpr::Any, _) => true,
            (TypeExpr::Union(arms), _) => arms.iter().any(|arm| arm.matches(data)),
            (TypeExpr::Null, Data::Null) => true,
            (TypeExpr::Bool, Data::Bool(_)) => true,
            (TypeExpr::Int, Data::Number(n)) => n.is_i64() || n.is_u64(),
            (TypeExpr::Float, Data::Number(_)) => true, // ints widen
            (TypeExpr::Str, Data::String(_)) => true,
            (TypeExpr::Record(ty), Data::Instance(instance)) => instance.is_a(ty),
            (TypeExpr::List(item), Data::List(items)) => items.iter().all(|x| item.matches(x)),
            (TypeExpr::Map(key, value), Data::Map(entries)) => {
                key.accepts_string_keys() && entries.values().all(|v| value.matches(v))
            }
            _ => false,
        }
    }

    fn accepts_string_keys(&self) -> bool {
        match self {
            TypeExpr::Any | TypeExpr::Str => true,
            TypeExpr::Union(arms) => arms.iter().any(TypeExpr::accepts_string_keys),
            _ => false,
        }
    }
}

impl PartialEq for TypeExpr {
    fn eq(&self, other: &Self) -> bool {
        use TypeExpr::*;
        match (self, other) {
            (Any, Any) | (Null, Null) | (Bool, Bool) | (Int, Int) | (Float, Float) | (Str, Str) => true,
            (Record(a), Record(b)) => a.id() == b.id(),
            (List(a), List(b)) => a == b,
            (Map(ka, va), Map(kb, vb)) => ka == kb && va == vb,
            (Union(a), Union(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Any => f.write_str("any"),
            TypeExpr::Null => f.write_str("null"),
            TypeExpr::Bool => f.write_str("bool"),
            TypeExpr::Int => f.write_str("int"),
            TypeExpr::Float => f.write_str("float"),
            TypeExpr::Str => f.write_str("str"),
            TypeExpr::Record(ty) => f.write_str(ty.name()),
            TypeExpr::List(item) => write!(f, "list[{item}]"),
            TypeExpr::Map(key, value) => write!(f, "map[{key}, {value}]"),
            TypeExpr::Union(arms) => {
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    match arm {
                        TypeExpr::Union(_) => write!(f, "({arm})")?,
                        _ => write!(f, "{arm}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

// ------------------------------ Value kinds ------------------------------- //

/// Runtime type of a raw JSON value, recorded for preserved extra fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(n) if n.is_f64() => ValueKind::Float,
            Value::Number(_) => ValueKind::Int,
            Value::String(_) => ValueKind::Str,
            Value::Array(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Map,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "str",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
