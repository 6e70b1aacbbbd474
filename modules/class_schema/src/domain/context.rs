//! Shared engine state passed to the table manager and the service

use super::events::FieldEvents;
use super::structure::StructureCache;
use super::types::DataTypeRegistry;
use std::sync::Arc;

/// Type registry, field observers and structure cache of one engine instance
#[derive(Clone, Default)]
pub struct SchemaContext {
    pub registry: Arc<DataTypeRegistry>,
    pub events: Arc<FieldEvents>,
    pub structures: Arc<StructureCache>,
}

impl SchemaContext {
    pub fn new(registry: DataTypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            events: Arc::new(FieldEvents::new()),
            structures: Arc::new(StructureCache::new()),
        }
    }
}
