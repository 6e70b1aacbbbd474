//! Field events for schema migrations
//!
//! Three notification points are raised once per field while a table is
//! created or migrated:
//! - Add: a field appears in the definition
//! - Remove: a field disappears from the definition
//! - Change: a field's physical shape changes
//!
//! Observers run synchronously, in registration order, before the DDL for the
//! field is issued. `after_apply` runs when the per-field unit finishes,
//! whether or not DDL was issued.

use crate::contract::{ClassIdentity, FieldInfo, SchemaError};
use parking_lot::RwLock;
use std::sync::Arc;

/// Per-field delta carried by events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    Added(FieldInfo),
    Removed(FieldInfo),
    Changed { old: FieldInfo, new: FieldInfo },
}

impl FieldChange {
    /// Name of the field after the change (before it, for removals)
    pub fn field_name(&self) -> &str {
        match self {
            Self::Added(field) | Self::Removed(field) => &field.name,
            Self::Changed { new, .. } => &new.name,
        }
    }
}

/// Verdict of an observer on a pending field operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverDecision {
    /// Proceed with the DDL for this field
    Continue,
    /// Leave the column untouched but keep migrating the other fields
    Skip,
    /// Stop the whole migration
    Abort(String),
}

/// Observer of field additions, removals and changes
///
/// Observers must not assume the DDL has already happened when a `before_*`
/// hook runs.
pub trait FieldObserver: Send + Sync {
    fn before_add(&self, _class: &ClassIdentity, _field: &FieldInfo) -> ObserverDecision {
        ObserverDecision::Continue
    }

    fn before_remove(&self, _class: &ClassIdentity, _field: &FieldInfo) -> ObserverDecision {
        ObserverDecision::Continue
    }

    fn before_change(
        &self,
        _class: &ClassIdentity,
        _old: &FieldInfo,
        _new: &FieldInfo,
    ) -> ObserverDecision {
        ObserverDecision::Continue
    }

    /// Called when the per-field unit finishes. `applied` is false when the
    /// DDL was skipped or failed.
    fn after_apply(&self, _class: &ClassIdentity, _change: &FieldChange, _applied: bool) {}
}

/// Observer that accepts everything
pub struct NoOpFieldObserver;

impl FieldObserver for NoOpFieldObserver {}

/// Registered field observers
#[derive(Default)]
pub struct FieldEvents {
    observers: RwLock<Vec<Arc<dyn FieldObserver>>>,
}

impl FieldEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer; it runs after all previously registered ones
    pub fn register(&self, observer: Arc<dyn FieldObserver>) {
        self.observers.write().push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Raise the `before_*` hooks for a change and open its event scope.
    ///
    /// The observer list is snapshotted so observers may register others
    /// without deadlocking. The first `Abort` stops the remaining observers.
    pub fn begin<'a>(
        &self,
        class: &'a ClassIdentity,
        change: FieldChange,
    ) -> Result<FieldEventScope<'a>, SchemaError> {
        let observers: Vec<Arc<dyn FieldObserver>> = self.observers.read().clone();
        let mut skip = false;

        for observer in &observers {
            let decision = match &change {
                FieldChange::Added(field) => observer.before_add(class, field),
                FieldChange::Removed(field) => observer.before_remove(class, field),
                FieldChange::Changed { old, new } => observer.before_change(class, old, new),
            };
            match decision {
                ObserverDecision::Continue => {}
                ObserverDecision::Skip => skip = true,
                ObserverDecision::Abort(reason) => {
                    tracing::warn!(
                        class = %class.class_name,
                        field = %change.field_name(),
                        %reason,
                        "field observer aborted migration"
                    );
                    return Err(SchemaError::Cancelled {
                        field: change.field_name().to_string(),
                        reason,
                    });
                }
            }
        }

        Ok(FieldEventScope {
            observers,
            class,
            change,
            skip,
            applied: false,
        })
    }
}

/// Unit of work around one field's DDL; finalizes observers on drop
pub struct FieldEventScope<'a> {
    observers: Vec<Arc<dyn FieldObserver>>,
    class: &'a ClassIdentity,
    change: FieldChange,
    skip: bool,
    applied: bool,
}

impl FieldEventScope<'_> {
    /// Whether the DDL for this field should be issued
    pub fn should_apply(&self) -> bool {
        !self.skip
    }

    pub fn change(&self) -> &FieldChange {
        &self.change
    }

    /// Mark the unit as successfully applied
    pub fn complete(mut self) {
        self.applied = !self.skip;
    }
}

impl Drop for FieldEventScope<'_> {
    fn drop(&mut self) {
        for observer in &self.observers {
            observer.after_apply(self.class, &self.change, self.applied);
        }
    }
}
