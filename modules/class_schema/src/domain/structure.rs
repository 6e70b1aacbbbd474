//! Class structure cache
//!
//! Structures are derived once per class name and memoized. Any component
//! that alters a class definition or its physical table must invalidate the
//! entry. Every invalidation bumps a generation, and a load only publishes its
//! result when no invalidation happened since it started reading.

use super::reflection::{schema_from_definition, structure_from_schema};
use super::repository::{ClassRepository, SchemaIntrospector};
use super::types::DataTypeRegistry;
use crate::contract::{ClassStructure, SchemaError};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Class name → structure map, keyed case-insensitively
#[derive(Debug, Default)]
pub struct StructureCache {
    entries: DashMap<String, Arc<ClassStructure>>,
    /// Per-class invalidation counters
    generations: DashMap<String, u64>,
    /// Bumped by `clear`
    epoch: AtomicU64,
}

/// Snapshot of the invalidation state of one class, taken before a load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadToken {
    epoch: u64,
    generation: u64,
}

fn cache_key(class_name: &str) -> String {
    class_name.to_ascii_lowercase()
}

impl StructureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class_name: &str) -> Option<Arc<ClassStructure>> {
        self.entries
            .get(&cache_key(class_name))
            .map(|entry| entry.value().clone())
    }

    pub fn insert(&self, class_name: &str, structure: Arc<ClassStructure>) {
        self.entries.insert(cache_key(class_name), structure);
    }

    pub fn token(&self, class_name: &str) -> LoadToken {
        LoadToken {
            epoch: self.epoch.load(Ordering::SeqCst),
            generation: self
                .generations
                .get(&cache_key(class_name))
                .map(|g| *g.value())
                .unwrap_or(0),
        }
    }

    /// Cache a structure loaded under `token` unless the class was
    /// invalidated meanwhile; returns whether the entry was kept
    pub fn insert_if_current(
        &self,
        class_name: &str,
        structure: Arc<ClassStructure>,
        token: LoadToken,
    ) -> bool {
        if self.token(class_name) != token {
            return false;
        }
        let key = cache_key(class_name);
        self.entries.insert(key.clone(), structure.clone());

        // An invalidation between the check and the insert bumped the token
        // before removing, so re-checking here catches it
        if self.token(class_name) != token {
            self.entries
                .remove_if(&key, |_, cached| Arc::ptr_eq(cached, &structure));
            return false;
        }
        true
    }

    /// Invalidate one class; returns whether an entry was cached
    pub fn remove(&self, class_name: &str) -> bool {
        let key = cache_key(class_name);
        *self.generations.entry(key.clone()).or_insert(0) += 1;
        self.entries.remove(&key).is_some()
    }

    /// Invalidate all classes
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loads class structures through the cache
pub struct StructureProvider {
    cache: Arc<StructureCache>,
    classes: Arc<dyn ClassRepository>,
    introspector: Arc<dyn SchemaIntrospector>,
    registry: Arc<DataTypeRegistry>,
}

impl StructureProvider {
    pub fn new(
        cache: Arc<StructureCache>,
        classes: Arc<dyn ClassRepository>,
        introspector: Arc<dyn SchemaIntrospector>,
        registry: Arc<DataTypeRegistry>,
    ) -> Self {
        Self {
            cache,
            classes,
            introspector,
            registry,
        }
    }

    /// Structure of a class, `None` when the class is unknown
    pub async fn get_class_info(
        &self,
        class_name: &str,
    ) -> Result<Option<Arc<ClassStructure>>, SchemaError> {
        if let Some(hit) = self.cache.get(class_name) {
            return Ok(Some(hit));
        }

        let token = self.cache.token(class_name);
        let Some(class) = self.classes.find_by_name(class_name).await? else {
            return Ok(None);
        };

        let schema = match &class.structure {
            Some(schema) => schema.clone(),
            None => {
                schema_from_definition(&class.table_name, &class.definition, &self.registry)?
            }
        };
        let live_key = self
            .introspector
            .primary_key_columns(&class.table_name)
            .await?;

        let structure = Arc::new(structure_from_schema(
            &class.class_name,
            &class.table_name,
            &schema,
            &live_key,
        ));
        tracing::debug!(
            class = %class.class_name,
            columns = structure.column_definitions.len(),
            "class structure loaded"
        );
        if !self.cache.insert_if_current(class_name, structure.clone(), token) {
            tracing::debug!(class = %class.class_name, "class changed while loading, not cached");
        }
        Ok(Some(structure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ColumnDefinition, ColumnType};

    fn structure(name: &str) -> Arc<ClassStructure> {
        Arc::new(ClassStructure::new(
            name,
            "T",
            vec![ColumnDefinition::new("ID", ColumnType::Int32)],
            "ID",
        ))
    }

    #[test]
    fn test_cache_is_case_insensitive() {
        let cache = StructureCache::new();
        cache.insert("CMS.User", structure("CMS.User"));
        assert!(cache.get("cms.user").is_some());
        assert!(cache.remove("CMS.USER"));
        assert!(cache.get("cms.user").is_none());
        assert!(!cache.remove("cms.user"));
    }

    #[test]
    fn test_clear_drops_everything() {
        let cache = StructureCache::new();
        cache.insert("a.one", structure("a.one"));
        cache.insert("a.two", structure("a.two"));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_started_before_remove_is_not_cached() {
        let cache = StructureCache::new();
        let token = cache.token("cms.user");
        cache.remove("CMS.User");

        assert!(!cache.insert_if_current("cms.user", structure("cms.user"), token));
        assert!(cache.get("cms.user").is_none());

        let fresh = cache.token("cms.user");
        assert!(cache.insert_if_current("cms.user", structure("cms.user"), fresh));
        assert!(cache.get("cms.user").is_some());
    }

    #[test]
    fn test_load_started_before_clear_is_not_cached() {
        let cache = StructureCache::new();
        let token = cache.token("a.one");
        cache.clear();

        assert!(!cache.insert_if_current("a.one", structure("a.one"), token));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_other_classes_do_not_invalidate_a_load() {
        let cache = StructureCache::new();
        let token = cache.token("a.one");
        cache.remove("a.two");

        assert!(cache.insert_if_current("a.one", structure("a.one"), token));
    }
}
