//! Convert untyped JSON into instances of declared record types.
//!
//! ```
//! use json_dataclass::{from_data, RecordType, TypeExpr};
//!
//! let child = RecordType::builder("Child")
//!     .field("a", TypeExpr::Int)
//!     .field("b", TypeExpr::optional(TypeExpr::Str))
//!     .build();
//! let parent = RecordType::builder("Parent")
//!     .field("children", TypeExpr::list(TypeExpr::optional(TypeExpr::record(&child))))
//!     .build();
//!
//! let out = from_data(&parent, r#"{"children": [{"a": 1, "b": "x"}, null]}"#).unwrap();
//! let children = out.get("children").and_then(|d| d.as_list()).unwrap();
//! assert!(children[0].as_instance().unwrap().is_a(&child));
//! assert!(children[1].is_null());
//! ```
//!
//! Field shapes are derived once per record type and cached in a
//! [`Registry`]; [`from_data`] uses the process-wide one.
pub mod convert;
pub mod data;
pub mod descriptor;
pub mod error;
pub mod record;
pub mod registry;
pub mod schema;
pub mod ty;

mod path_de;

pub use convert::{ConvertOptions, Converter, RawData};
pub use data::Data;
pub use descriptor::FieldDescriptor;
pub use error::{ConstructionError, ConvertError, SchemaError};
pub use record::{Extended, ExtensionType, FieldDef, Instance, Record, RecordId, RecordRef, RecordType};
pub use registry::Registry;
pub use schema::Schema;
pub use ty::{TypeExpr, ValueKind};

/// Lenient conversion that drops undeclared keys, using the global registry.
pub fn from_data<'a>(ty: &RecordRef, data: impl Into<RawData<'a>>) -> Result<Instance, ConvertError> {
    Converter::new(Registry::global()).convert(ty, data)
}

pub fn from_data_with<'a>(
    ty: &RecordRef,
    data: impl Into<RawData<'a>>,
    strict: bool,
    ignore_extra: bool,
) -> Result<Instance, ConvertError> {
    Converter::with_options(Registry::global(), ConvertOptions { strict, ignore_extra }).convert(ty, data)
}
