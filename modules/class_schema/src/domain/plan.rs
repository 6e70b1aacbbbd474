//! Migration planning
//!
//! A plan is computed from the old and new field lists without touching the
//! database, so definition and type-mapping errors surface before any DDL.

use super::comparison::is_database_change_necessary;
use super::defaults::get_field_default_value;
use super::matching::{match_fields, validate_unique};
use super::types::{ColumnSpec, DataTypeRegistry};
use crate::contract::{ClassDefinition, FieldInfo, SchemaError};
use std::collections::HashSet;

/// Knobs that shape a migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Rebuild the table once after variable-length columns were dropped
    pub reclaim_space_after_drop: bool,
    /// Permit removing or altering system fields
    pub allow_system_field_changes: bool,
    /// Prefix of primary key constraint names
    pub primary_key_prefix: String,
    /// Make a single integer primary key auto-increment
    pub identity_for_single_key: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            reclaim_space_after_drop: true,
            allow_system_field_changes: false,
            primary_key_prefix: "PK_".to_string(),
            identity_for_single_key: true,
        }
    }
}

impl MigrationOptions {
    pub fn constraint_name(&self, table: &str) -> String {
        format!("{}{}", self.primary_key_prefix, table)
    }
}

/// One step of the upsert pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertStep {
    /// Brand-new field; `column` is `None` for virtual fields
    Add {
        field: FieldInfo,
        column: Option<ColumnSpec>,
    },
    /// Existing field whose shape changed; `column` is `None` when both sides
    /// are virtual
    Change {
        old: FieldInfo,
        new: FieldInfo,
        column: Option<ColumnSpec>,
    },
    /// Virtual/materialized transition, applied as remove followed by add
    Rematerialize {
        old: FieldInfo,
        new: FieldInfo,
        column: Option<ColumnSpec>,
    },
}

/// Primary key constraint replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyChange {
    pub old: Vec<String>,
    /// Key columns in the new declared order
    pub new: Vec<String>,
}

/// Ordered set of operations reconciling a table with a new definition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationPlan {
    /// Old fields without counterpart, in old declaration order
    pub deletions: Vec<FieldInfo>,
    /// New or changed fields, in new declaration order
    pub upserts: Vec<UpsertStep>,
    pub primary_key: Option<PrimaryKeyChange>,
    /// A dropped column had a variable-length type
    pub drops_variable_length: bool,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.upserts.is_empty() && self.primary_key.is_none()
    }
}

/// Physical column for a materialized field
pub fn column_spec(
    field: &FieldInfo,
    registry: &DataTypeRegistry,
) -> Result<ColumnSpec, SchemaError> {
    let spec = registry
        .get(&field.data_type)
        .ok_or_else(|| SchemaError::UnknownDataType {
            field: field.name.clone(),
            data_type: field.data_type.clone(),
        })?;

    Ok(ColumnSpec {
        name: field.name.clone(),
        sql_type: spec.sql_type(field.size, field.precision),
        nullable: field.allow_empty && !field.primary_key,
        default_value: get_field_default_value(field, spec),
        auto_increment: false,
    })
}

fn materialized_column(
    field: &FieldInfo,
    registry: &DataTypeRegistry,
) -> Result<Option<ColumnSpec>, SchemaError> {
    if field.is_virtual() {
        return Ok(None);
    }
    column_spec(field, registry).map(Some)
}

/// Unknown types count as variable-length so the rebuild is not missed
pub(crate) fn drops_variable_length(field: &FieldInfo, registry: &DataTypeRegistry) -> bool {
    field.is_materialized()
        && registry
            .sql_type_for(field)
            .map_or(true, |ty| ty.is_variable_length())
}

fn guard_system(field: &FieldInfo, options: &MigrationOptions) -> Result<(), SchemaError> {
    if field.system && !options.allow_system_field_changes {
        return Err(SchemaError::SystemFieldProtected {
            field: field.name.clone(),
        });
    }
    Ok(())
}

fn same_key_set(old: &[String], new: &[String]) -> bool {
    let old: HashSet<String> = old.iter().map(|n| n.to_ascii_lowercase()).collect();
    let new: HashSet<String> = new.iter().map(|n| n.to_ascii_lowercase()).collect();
    old == new
}

/// Compute the plan that turns the `old` definition into the `new` one
pub fn plan_update(
    class_name: &str,
    old: &ClassDefinition,
    new: &ClassDefinition,
    registry: &DataTypeRegistry,
    options: &MigrationOptions,
) -> Result<MigrationPlan, SchemaError> {
    validate_unique(&new.fields)?;
    if new.primary_key_fields().is_empty() {
        return Err(SchemaError::NoPrimaryKey {
            class_name: class_name.to_string(),
        });
    }

    let matching = match_fields(&old.fields, &new.fields);
    let mut plan = MigrationPlan::default();

    for index in matching.unmatched_old() {
        let field = &old.fields[index];
        guard_system(field, options)?;
        plan.drops_variable_length |= drops_variable_length(field, registry);
        plan.deletions.push(field.clone());
    }

    for (index, new_field) in new.fields.iter().enumerate() {
        let Some(old_index) = matching.old_for(index) else {
            plan.upserts.push(UpsertStep::Add {
                field: new_field.clone(),
                column: materialized_column(new_field, registry)?,
            });
            continue;
        };
        let old_field = &old.fields[old_index];

        if old_field.is_virtual() != new_field.is_virtual() {
            guard_system(old_field, options)?;
            plan.drops_variable_length |= drops_variable_length(old_field, registry);
            plan.upserts.push(UpsertStep::Rematerialize {
                old: old_field.clone(),
                new: new_field.clone(),
                column: materialized_column(new_field, registry)?,
            });
            continue;
        }

        if !is_database_change_necessary(old_field, new_field, registry)? {
            continue;
        }

        if new_field.is_materialized() && old_field.primary_key && new_field.primary_key {
            if old_field.name != new_field.name {
                return Err(SchemaError::PrimaryKeyRenamed {
                    old: old_field.name.clone(),
                    new: new_field.name.clone(),
                });
            }
            tracing::debug!(
                class = class_name,
                field = %new_field.name,
                "primary key column is not altered in place"
            );
            continue;
        }

        guard_system(old_field, options)?;
        plan.upserts.push(UpsertStep::Change {
            old: old_field.clone(),
            new: new_field.clone(),
            column: materialized_column(new_field, registry)?,
        });
    }

    let old_key = old.primary_key_names();
    let new_key = new.primary_key_names();
    if !same_key_set(&old_key, &new_key) {
        plan.primary_key = Some(PrimaryKeyChange {
            old: old_key,
            new: new_key,
        });
    }

    Ok(plan)
}
