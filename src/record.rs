//! Record declarations and record instances.
//!
//! A [`RecordType`] is the declared composite: a name and an ordered list of
//! typed fields, some with defaults. It is shared as a [`RecordRef`] and is
//! never mutated after [`RecordBuilder::build`]. Conversions produce an
//! [`Instance`]: either a plain [`Record`] or an [`Extended`] record that also
//! carries the extra input fields it was asked to keep.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::data::Data;
use crate::error::ConstructionError;
use crate::ty::{TypeExpr, ValueKind};

pub type RecordRef = Arc<RecordType>;

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a declared record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeExpr,
    pub default: Option<Data>,
}

#[derive(Debug)]
pub struct RecordType {
    id: RecordId,
    name: String,
    fields: IndexMap<String, FieldDef>, // declaration order
}

impl RecordType {
    pub fn builder(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = &FieldDef> {
        self.fields.values()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

pub struct RecordBuilder {
    name: String,
    fields: IndexMap<String, FieldDef>,
}

impl RecordBuilder {
    /// Redeclaring a field replaces its type and default but keeps its position.
    pub fn field(self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.push(name.into(), ty, None)
    }

    pub fn field_with_default(
        self,
        name: impl Into<String>,
        ty: TypeExpr,
        default: impl Into<Data>,
    ) -> Self {
        self.push(name.into(), ty, Some(default.into()))
    }

    fn push(mut self, name: String, ty: TypeExpr, default: Option<Data>) -> Self {
        self.fields.insert(name.clone(), FieldDef { name, ty, default });
        self
    }

    pub fn build(self) -> RecordRef {
        Arc::new(RecordType {
            id: RecordId(NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed)),
            name: self.name,
            fields: self.fields,
        })
    }
}

// -------------------------------- Records --------------------------------- //

#[derive(Debug, Clone)]
pub struct Record {
    ty: RecordRef,
    values: IndexMap<String, Data>, // one per declared field, declaration order
}

impl Record {
    /// Builds an instance from field values keyed by name.
    ///
    /// Absent fields take their declared default. Every missing field without
    /// a default is reported together; a name the type does not declare is
    /// rejected.
    pub fn construct(
        ty: &RecordRef,
        mut values: IndexMap<String, Data>,
    ) -> Result<Self, ConstructionError> {
        let mut out = IndexMap::with_capacity(ty.fields.len());
        let mut missing = Vec::new();
        for field in ty.fields() {
            match values.swap_remove(&field.name).or_else(|| field.default.clone()) {
                Some(value) => {
                    out.insert(field.name.clone(), value);
                }
                None => missing.push(field.name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(ConstructionError::MissingFields {
                record: ty.name.clone(),
                fields: missing,
            });
        }
        if let Some(field) = values.into_keys().next() {
            return Err(ConstructionError::UnknownField {
                record: ty.name.clone(),
                field,
            });
        }
        Ok(Record {
            ty: RecordRef::clone(ty),
            values: out,
        })
    }

    pub fn record_type(&self) -> &RecordRef {
        &self.ty
    }

    pub fn get(&self, name: &str) -> Option<&Data> {
        self.values.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Data)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_values(self) -> IndexMap<String, Data> {
        self.values
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ty.id == other.ty.id && self.values == other.values
    }
}

// ------------------------------- Extensions ------------------------------- //

/// A base record type plus extra fields that are not part of its declaration.
///
/// Extra fields never take part in construction; they are attached to an
/// already built [`Record`] through [`Extended`].
#[derive(Debug)]
pub struct ExtensionType {
    base: RecordRef,
    extra_fields: Vec<(String, ValueKind)>,
}

impl ExtensionType {
    pub(crate) fn new(base: &RecordRef, extra_fields: Vec<(String, ValueKind)>) -> Self {
        Self {
            base: RecordRef::clone(base),
            extra_fields,
        }
    }

    pub fn base(&self) -> &RecordRef {
        &self.base
    }

    pub fn extra_fields(&self) -> &[(String, ValueKind)] {
        &self.extra_fields
    }

    /// `Base_d-e` for a base type `Base` extended with `d` and `e`.
    pub fn name(&self) -> String {
        let names = self
            .extra_fields
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>();
        format!("{}_{}", self.base.name, names.join("-"))
    }
}

#[derive(Debug, Clone)]
pub struct Extended {
    base: Record,
    extension: Arc<ExtensionType>,
    extras: IndexMap<String, Data>,
}

impl Extended {
    pub(crate) fn new(
        base: Record,
        extension: Arc<ExtensionType>,
        extras: IndexMap<String, Data>,
    ) -> Self {
        Self {
            base,
            extension,
            extras,
        }
    }

    pub fn base(&self) -> &Record {
        &self.base
    }

    pub fn into_base(self) -> Record {
        self.base
    }

    pub fn extension(&self) -> &Arc<ExtensionType> {
        &self.extension
    }

    /// The `(name, kind)` pairs of the extension type, in extension order.
    pub fn extra_fields(&self) -> &[(String, ValueKind)] {
        self.extension.extra_fields()
    }

    pub fn extra(&self, name: &str) -> Option<&Data> {
        self.extras.get(name)
    }

    pub fn extras(&self) -> &IndexMap<String, Data> {
        &self.extras
    }

    /// Declared fields shadow extras.
    pub fn get(&self, name: &str) -> Option<&Data> {
        self.base.get(name).or_else(|| self.extras.get(name))
    }
}

impl PartialEq for Extended {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.extra_fields() == other.extra_fields()
            && self.extras == other.extras
    }
}

// ------------------------------- Instances -------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub enum Instance {
    Record(Record),
    Extended(Extended),
}

impl Instance {
    /// The underlying instance of the declared type.
    pub fn record(&self) -> &Record {
        match self {
            Instance::Record(record) => record,
            Instance::Extended(extended) => extended.base(),
        }
    }

    pub fn into_record(self) -> Record {
        match self {
            Instance::Record(record) => record,
            Instance::Extended(extended) => extended.into_base(),
        }
    }

    pub fn record_type(&self) -> &RecordRef {
        self.record().record_type()
    }

    /// True for plain and extended instances of `ty`.
    pub fn is_a(&self, ty: &RecordType) -> bool {
        self.record_type().id == ty.id
    }

    pub fn get(&self, name: &str) -> Option<&Data> {
        match self {
            Instance::Record(record) => record.get(name),
            Instance::Extended(extended) => extended.get(name),
        }
    }

    pub fn as_extended(&self) -> Option<&Extended> {
        match self {
            Instance::Extended(extended) => Some(extended),
            Instance::Record(_) => None,
        }
    }

    /// Empty for plain instances.
    pub fn extra_fields(&self) -> &[(String, ValueKind)] {
        match self {
            Instance::Record(_) => &[],
            Instance::Extended(extended) => extended.extra_fields(),
        }
    }
}

impl From<Record> for Instance {
    fn from(record: Record) -> Self {
        Instance::Record(record)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.ty.name)?;
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instance::Record(record) => write!(f, "{record}"),
            Instance::Extended(extended) => {
                write!(f, "{}(", extended.extension.name())?;
                let all = extended.base.values.iter().chain(extended.extras.iter());
                for (i, (name, value)) in all.enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                f.write_str(")")
            }
        }
    }
}
