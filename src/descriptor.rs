//! Per-field shape metadata, derived once per record type.

use crate::record::{FieldDef, RecordRef};
use crate::ty::TypeExpr;

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub declared: TypeExpr,
    pub is_nullable: bool,
    pub is_sequence: bool,
    pub is_mapping: bool,
    /// Record types an element may be converted into, first-seen order.
    /// `None` unless the field is a sequence or a mapping.
    pub candidates: Option<Vec<RecordRef>>,
}

impl FieldDescriptor {
    pub fn derive(field: &FieldDef) -> Self {
        let declared = field.ty.clone();
        let is_nullable = matches!(&declared, TypeExpr::Union(arms) if arms.contains(&TypeExpr::Null));
        let is_sequence = declared.alternatives().any(|t| matches!(t, TypeExpr::List(_)));
        // `list[..] | map[..]` counts as a sequence only; an object given for
        // such a field is kept unconverted.
        let is_mapping =
            !is_sequence && declared.alternatives().any(|t| matches!(t, TypeExpr::Map(..)));

        let candidates = (is_sequence || is_mapping).then(|| {
            let mut found = Vec::new();
            collect_records(declared.args(), &mut found);
            found
        });

        Self {
            name: field.name.clone(),
            declared,
            is_nullable,
            is_sequence,
            is_mapping,
            candidates,
        }
    }

    /// The declared type when it is exactly a record type.
    pub fn nested_record(&self) -> Option<&RecordRef> {
        match &self.declared {
            TypeExpr::Record(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        self.is_sequence || self.is_mapping
    }
}

/// Record types are collected, not descended into.
fn collect_records<'a>(args: impl IntoIterator<Item = &'a TypeExpr>, found: &mut Vec<RecordRef>) {
    for arg in args {
        match arg {
            TypeExpr::Record(ty) => {
                if !found.iter().any(|seen| seen.id() == ty.id()) {
                    found.push(RecordRef::clone(ty));
                }
            }
            other => collect_records(other.args(), found),
        }
    }
}
