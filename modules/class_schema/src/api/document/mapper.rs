//! Conversions between document DTOs and contract models
//!
//! Documents are parsed leniently where the markup is (property scalars,
//! `-1` dimensions) and strictly where a wrong value would reach DDL.

use super::dto::*;
use crate::contract::{
    ClassDefinition, FieldInfo, FieldProperties, PropertyValue, ReferenceInfo, ReferenceType,
    SchemaColumn, SchemaError, StructureSchema,
};
use uuid::Uuid;

fn invalid(message: impl Into<String>) -> SchemaError {
    SchemaError::InvalidDocument {
        message: message.into(),
    }
}

fn dimension(field: &str, key: &str, raw: Option<i64>) -> Result<Option<u32>, SchemaError> {
    match raw {
        None => Ok(None),
        Some(n) if n < 0 => Ok(None),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| invalid(format!("{key} of field '{field}' is out of range: {n}"))),
    }
}

// ===== Reference conversions =====

impl From<ReferenceTypeDocument> for ReferenceType {
    fn from(dto: ReferenceTypeDocument) -> Self {
        match dto {
            ReferenceTypeDocument::Binding => Self::Binding,
            ReferenceTypeDocument::Required => Self::Required,
            ReferenceTypeDocument::NotRequired => Self::NotRequired,
        }
    }
}

impl From<ReferenceType> for ReferenceTypeDocument {
    fn from(value: ReferenceType) -> Self {
        match value {
            ReferenceType::Binding => Self::Binding,
            ReferenceType::Required => Self::Required,
            ReferenceType::NotRequired => Self::NotRequired,
        }
    }
}

// ===== Property conversions =====

impl From<PropertyDocument> for PropertyValue {
    fn from(dto: PropertyDocument) -> Self {
        match dto {
            PropertyDocument::Text(value) => Self::literal(value),
            PropertyDocument::Bool(value) => Self::literal(value.to_string()),
            PropertyDocument::Int(value) => Self::literal(value.to_string()),
            PropertyDocument::Float(value) => Self::literal(value.to_string()),
            PropertyDocument::Flagged { value, is_macro } => Self { value, is_macro },
        }
    }
}

impl From<PropertyValue> for PropertyDocument {
    fn from(value: PropertyValue) -> Self {
        if value.is_macro {
            Self::Flagged {
                value: value.value,
                is_macro: true,
            }
        } else {
            Self::Text(value.value)
        }
    }
}

// ===== Field conversions =====

impl TryFrom<FieldDocument> for FieldInfo {
    type Error = SchemaError;

    fn try_from(dto: FieldDocument) -> Result<Self, Self::Error> {
        if dto.column.trim().is_empty() {
            return Err(invalid("field without column name"));
        }
        if dto.columntype.trim().is_empty() {
            return Err(invalid(format!("field '{}' has no columntype", dto.column)));
        }

        let size = dimension(&dto.column, "columnsize", dto.columnsize)?;
        let precision = dimension(&dto.column, "columnprecision", dto.columnprecision)?;

        let mut properties = FieldProperties::default();
        for (key, value) in dto.properties {
            properties.set(&key, value.into());
        }

        Ok(Self {
            name: dto.column,
            guid: dto.guid.unwrap_or_else(Uuid::nil),
            data_type: dto.columntype,
            size,
            precision,
            allow_empty: dto.allowempty && !dto.is_pk,
            primary_key: dto.is_pk,
            default_value: dto.default,
            system: dto.system,
            external: dto.external,
            is_dummy_field: dto.dummy,
            reference: dto.reference.map(|r| ReferenceInfo {
                object_type: r.object_type,
                reference_type: r.reference_type.into(),
            }),
            properties,
        })
    }
}

impl From<&FieldInfo> for FieldDocument {
    fn from(field: &FieldInfo) -> Self {
        Self {
            column: field.name.clone(),
            guid: (!field.guid.is_nil()).then_some(field.guid),
            columntype: field.data_type.clone(),
            columnsize: field.size.map(i64::from),
            columnprecision: field.precision.map(i64::from),
            allowempty: field.allow_empty,
            is_pk: field.primary_key,
            system: field.system,
            external: field.external,
            dummy: field.is_dummy_field,
            default: field.default_value.clone(),
            reference: field.reference.as_ref().map(|r| ReferenceDocument {
                object_type: r.object_type.clone(),
                reference_type: r.reference_type.into(),
            }),
            properties: field
                .properties
                .entries()
                .into_iter()
                .map(|(key, value)| (key, value.into()))
                .collect(),
        }
    }
}

// ===== Definition conversions =====

impl TryFrom<DefinitionDocument> for ClassDefinition {
    type Error = SchemaError;

    fn try_from(dto: DefinitionDocument) -> Result<Self, Self::Error> {
        let fields = dto
            .fields
            .into_iter()
            .map(FieldInfo::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(fields))
    }
}

impl From<&ClassDefinition> for DefinitionDocument {
    fn from(definition: &ClassDefinition) -> Self {
        Self {
            fields: definition.fields.iter().map(FieldDocument::from).collect(),
        }
    }
}

// ===== Structure schema conversions =====

impl TryFrom<StructureDocument> for StructureSchema {
    type Error = SchemaError;

    fn try_from(dto: StructureDocument) -> Result<Self, Self::Error> {
        let columns = dto
            .columns
            .into_iter()
            .map(|column| {
                let xsd_type = column.xsd_type.or(column.base).ok_or_else(|| {
                    invalid(format!("schema column '{}' has neither type nor base", column.name))
                })?;
                Ok(SchemaColumn {
                    name: column.name,
                    xsd_type,
                    max_length: column.max_length,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        Ok(Self {
            table: dto.table,
            columns,
            primary_key: dto.primary_key,
        })
    }
}

impl From<&StructureSchema> for StructureDocument {
    fn from(schema: &StructureSchema) -> Self {
        Self {
            table: schema.table.clone(),
            columns: schema
                .columns
                .iter()
                .map(|column| match column.max_length {
                    Some(max_length) => SchemaColumnDocument {
                        name: column.name.clone(),
                        xsd_type: None,
                        base: Some(column.xsd_type.clone()),
                        max_length: Some(max_length),
                    },
                    None => SchemaColumnDocument {
                        name: column.name.clone(),
                        xsd_type: Some(column.xsd_type.clone()),
                        base: None,
                        max_length: None,
                    },
                })
                .collect(),
            primary_key: schema.primary_key.clone(),
        }
    }
}
