//! The conversion engine.
//!
//! `Converter::convert` turns raw JSON (text, a value, or an object map) into
//! an [`Instance`] of a declared record type:
//!
//! - nested record fields recurse with the same options;
//! - sequence/mapping fields go through the collection coercer, which tries
//!   the field's candidate record types per element (first match wins);
//! - strict mode checks every coerced field against its declared type and
//!   reports all violations of one call together;
//! - with `ignore_extra` off, undeclared input keys are kept on an
//!   [`Extended`] instance whose extension type is cached per
//!   (record, sorted extra names).
pub mod collection;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::data::Data;
use crate::descriptor::FieldDescriptor;
use crate::error::ConvertError;
use crate::record::{Extended, Instance, Record, RecordRef};
use crate::registry::Registry;
use crate::ty::ValueKind;

// ------------------------------- Options --------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Reject values whose type disagrees with the declaration.
    pub strict: bool,
    /// Drop undeclared input keys instead of keeping them on the instance.
    pub ignore_extra: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            strict: false,
            ignore_extra: true,
        }
    }
}

/// Input accepted by [`Converter::convert`].
#[derive(Debug, Clone, Copy)]
pub enum RawData<'a> {
    Text(&'a str),
    Value(&'a Value),
    Object(&'a Map<String, Value>),
}

impl<'a> From<&'a str> for RawData<'a> {
    fn from(text: &'a str) -> Self {
        RawData::Text(text)
    }
}

impl<'a> From<&'a String> for RawData<'a> {
    fn from(text: &'a String) -> Self {
        RawData::Text(text)
    }
}

impl<'a> From<&'a Value> for RawData<'a> {
    fn from(value: &'a Value) -> Self {
        RawData::Value(value)
    }
}

impl<'a> From<&'a Map<String, Value>> for RawData<'a> {
    fn from(object: &'a Map<String, Value>) -> Self {
        RawData::Object(object)
    }
}

// ------------------------------- Converter -------------------------------- //

#[derive(Debug, Clone, Copy)]
pub struct Converter<'r> {
    registry: &'r Registry,
    options: ConvertOptions,
}

impl<'r> Converter<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_options(registry, ConvertOptions::default())
    }

    pub fn with_options(registry: &'r Registry, options: ConvertOptions) -> Self {
        Self { registry, options }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    pub fn ignore_extra(mut self, ignore_extra: bool) -> Self {
        self.options.ignore_extra = ignore_extra;
        self
    }

    pub fn options(&self) -> ConvertOptions {
        self.options
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn convert<'a>(
        &self,
        ty: &RecordRef,
        data: impl Into<RawData<'a>>,
    ) -> Result<Instance, ConvertError> {
        match data.into() {
            RawData::Text(text) => {
                let value: Value = serde_json::from_str(text)?;
                self.convert_value(ty, &value)
            }
            RawData::Value(value) => self.convert_value(ty, value),
            RawData::Object(object) => self.convert_object(ty, object),
        }
    }

    fn convert_value(&self, ty: &RecordRef, value: &Value) -> Result<Instance, ConvertError> {
        match value {
            Value::Object(object) => self.convert_object(ty, object),
            other => Err(ConvertError::NotAnObject {
                record: ty.name().to_owned(),
                found: ValueKind::of(other),
            }),
        }
    }

    fn convert_object(
        &self,
        ty: &RecordRef,
        data: &Map<String, Value>,
    ) -> Result<Instance, ConvertError> {
        let descriptors = self.registry.descriptors(ty);

        let mut values = IndexMap::with_capacity(descriptors.len());
        let mut mismatches = Vec::new();
        for descriptor in descriptors.iter() {
            let Some(raw) = data.get(&descriptor.name) else {
                continue; // left to the declared default
            };
            let value = match self.convert_field(descriptor, raw) {
                Ok(value) => value,
                // nested mismatches join the ones found on sibling fields
                Err(ConvertError::TypeMismatch(messages)) if self.options.strict => {
                    mismatches.extend(messages);
                    continue;
                }
                Err(error) => return Err(error),
            };
            if self.options.strict && !descriptor.declared.matches(&value) {
                mismatches.push(format!(
                    "field `{}.{}`: value {} does not match expected type {}",
                    ty.name(),
                    descriptor.name,
                    value,
                    descriptor.declared,
                ));
            }
            values.insert(descriptor.name.clone(), value);
        }

        if !mismatches.is_empty() {
            return Err(ConvertError::TypeMismatch(mismatches));
        }

        let record = Record::construct(ty, values)?;

        if self.options.ignore_extra {
            return Ok(Instance::Record(record));
        }
        let mut extra = data
            .iter()
            .filter(|(name, _)| !ty.has_field(name))
            .collect::<Vec<_>>();
        if extra.is_empty() {
            return Ok(Instance::Record(record));
        }
        extra.sort_by(|a, b| a.0.cmp(b.0));

        let kinds = extra
            .iter()
            .map(|(name, raw)| ((*name).clone(), ValueKind::of(raw)))
            .collect::<Vec<_>>();
        let extension = self.registry.extension_type(ty, &kinds);
        let extras = extra
            .into_iter()
            .map(|(name, raw)| (name.clone(), Data::from(raw)))
            .collect();
        Ok(Instance::Extended(Extended::new(record, extension, extras)))
    }

    fn convert_field(&self, descriptor: &FieldDescriptor, raw: &Value) -> Result<Data, ConvertError> {
        if let (Some(nested), Value::Object(object)) = (descriptor.nested_record(), raw) {
            return Ok(Data::from(self.convert_object(nested, object)?));
        }
        if descriptor.is_collection() {
            return self.coerce_collection(descriptor, raw);
        }
        Ok(Data::from(raw))
    }
}
