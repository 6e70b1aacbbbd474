//! Structural reflection
//!
//! Conversions between field definitions, stored schema descriptions, live
//! column metadata and the read-only `ClassStructure` model.

use super::defaults::normalize_introspected_default;
use super::repository::IntrospectedColumn;
use super::types::{DataTypeRegistry, SqlType};
use crate::contract::{
    ClassDefinition, ClassStructure, ColumnDefinition, ColumnType, FieldInfo, SchemaColumn,
    SchemaError, StructureSchema,
};
use tracing::warn;
use uuid::Uuid;

/// Derive the structure of a class from its schema description.
///
/// The primary key comes from the live constraint when the database reports
/// one, and from the declared key otherwise.
pub fn structure_from_schema(
    class_name: &str,
    table_name: &str,
    schema: &StructureSchema,
    live_primary_key: &[String],
) -> ClassStructure {
    let columns = schema
        .columns
        .iter()
        .map(|column| {
            let column_type = ColumnType::from_xsd(&column.xsd_type).unwrap_or_else(|| {
                warn!(
                    class = class_name,
                    column = %column.name,
                    xsd_type = %column.xsd_type,
                    "unknown schema type, reflecting column as string"
                );
                ColumnType::String
            });
            ColumnDefinition::new(column.name.clone(), column_type)
        })
        .collect();

    let id_column = if live_primary_key.is_empty() {
        schema.primary_key.join(";")
    } else {
        live_primary_key.join(";")
    };

    ClassStructure::new(class_name, table_name, columns, id_column)
}

/// Regenerate the schema description of a table from its definition
pub fn schema_from_definition(
    table_name: &str,
    definition: &ClassDefinition,
    registry: &DataTypeRegistry,
) -> Result<StructureSchema, SchemaError> {
    let mut columns = Vec::new();
    for field in definition.materialized_fields() {
        let spec = registry
            .get(&field.data_type)
            .ok_or_else(|| SchemaError::UnknownDataType {
                field: field.name.clone(),
                data_type: field.data_type.clone(),
            })?;
        let max_length = match spec.sql_type(field.size, field.precision) {
            SqlType::NVarChar(n) => Some(n),
            _ => None,
        };
        columns.push(SchemaColumn {
            name: field.name.clone(),
            xsd_type: spec.column_type.xsd_name().to_string(),
            max_length,
        });
    }

    Ok(StructureSchema {
        table: table_name.to_string(),
        columns,
        primary_key: definition.primary_key_names(),
    })
}

/// Build the "old" field set of a table from live column metadata.
///
/// Physical types without a registered logical type keep the physical name as
/// their tag, so comparing them fails with a missing-type error instead of
/// silently guessing.
pub fn fields_from_columns(
    columns: &[IntrospectedColumn],
    primary_key: &[String],
    registry: &DataTypeRegistry,
) -> ClassDefinition {
    let fields = columns
        .iter()
        .map(|column| {
            let is_key = primary_key
                .iter()
                .any(|k| k.eq_ignore_ascii_case(&column.name));
            let spec = registry.resolve_physical(&column.data_type);

            let (data_type, size, precision) = match spec {
                Some(spec) => match spec.sql_type {
                    SqlType::NVarChar(_) => (spec.tag.clone(), column.max_length, None),
                    SqlType::Decimal { .. } => (
                        spec.tag.clone(),
                        column.numeric_precision,
                        column.numeric_scale,
                    ),
                    _ => (spec.tag.clone(), None, None),
                },
                None => (column.data_type.clone(), None, None),
            };

            FieldInfo {
                name: column.name.clone(),
                guid: Uuid::nil(),
                data_type,
                size,
                precision,
                allow_empty: column.nullable,
                primary_key: is_key,
                default_value: column
                    .default_value
                    .as_deref()
                    .and_then(normalize_introspected_default),
                system: false,
                external: false,
                is_dummy_field: false,
                reference: None,
                properties: Default::default(),
            }
        })
        .collect();

    ClassDefinition::new(fields)
}
