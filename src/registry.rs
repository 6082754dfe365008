//! Append-only caches for field descriptors and extension types.
//!
//! Entries are keyed by record identity and are never evicted. Lookups take
//! a read lock; a miss derives the entry outside any lock and then inserts it
//! under the write lock, keeping whichever entry landed first so every caller
//! sees the same `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::trace;

use crate::descriptor::FieldDescriptor;
use crate::record::{ExtensionType, RecordId, RecordRef};
use crate::ty::ValueKind;

/// (base record, extra field names in the order given)
type ExtensionKey = (RecordId, Vec<String>);

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

#[derive(Debug, Default)]
pub struct Registry {
    descriptors: RwLock<HashMap<RecordId, Arc<[FieldDescriptor]>>>,
    extensions: RwLock<HashMap<ExtensionKey, Arc<ExtensionType>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry behind [`crate::from_data`].
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Field descriptors of `ty` in declaration order.
    pub fn descriptors(&self, ty: &RecordRef) -> Arc<[FieldDescriptor]> {
        if let Some(found) = self.descriptors.read().get(&ty.id()) {
            return Arc::clone(found);
        }

        trace!(record = ty.name(), "deriving field descriptors");
        let derived: Arc<[FieldDescriptor]> = ty.fields().map(FieldDescriptor::derive).collect();

        let mut cache = self.descriptors.write();
        Arc::clone(cache.entry(ty.id()).or_insert(derived))
    }

    /// Pre-warms the descriptor cache. Idempotent.
    pub fn cache_metadata(&self, ty: &RecordRef) {
        let _ = self.descriptors(ty);
    }

    /// The extension of `base` with `extra_fields`, synthesized on first use.
    ///
    /// Only the names (and their order) form the key: a later call with the
    /// same names gets the kinds recorded by the first one.
    pub fn extension_type(
        &self,
        base: &RecordRef,
        extra_fields: &[(String, ValueKind)],
    ) -> Arc<ExtensionType> {
        let key: ExtensionKey = (
            base.id(),
            extra_fields.iter().map(|(name, _)| name.clone()).collect(),
        );
        if let Some(found) = self.extensions.read().get(&key) {
            return Arc::clone(found);
        }

        trace!(record = base.name(), extra = ?key.1, "synthesizing extension type");
        let synthesized = Arc::new(ExtensionType::new(base, extra_fields.to_vec()));

        let mut cache = self.extensions.write();
        Arc::clone(cache.entry(key).or_insert(synthesized))
    }

    pub fn descriptor_count(&self) -> usize {
        self.descriptors.read().len()
    }

    pub fn extension_count(&self) -> usize {
        self.extensions.read().len()
    }
}
