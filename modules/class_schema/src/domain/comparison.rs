//! Per-column change detection

use super::defaults::{get_field_default_value, unmapped_default_value};
use super::types::DataTypeRegistry;
use crate::contract::{FieldInfo, SchemaError};

/// Physical shape of one side of a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnShape {
    physical_type: String,
    default_value: Option<String>,
}

/// Physical type string of a field, or the raw tag for virtual fields whose
/// type is not registered
fn shape(field: &FieldInfo, registry: &DataTypeRegistry) -> Option<ColumnShape> {
    match registry.get(&field.data_type) {
        Some(spec) => Some(ColumnShape {
            physical_type: spec.sql_type(field.size, field.precision).to_string(),
            default_value: get_field_default_value(field, spec),
        }),
        None if field.is_virtual() => Some(ColumnShape {
            physical_type: field.data_type.to_ascii_lowercase(),
            default_value: unmapped_default_value(field),
        }),
        None => None,
    }
}

/// Whether moving from `old` to `new` requires touching the column.
///
/// Compares nullability, physical type (type + size + precision), resolved
/// default, name and the external flag. Primary-key membership is reconciled
/// separately and is not part of this check.
pub fn is_database_change_necessary(
    old: &FieldInfo,
    new: &FieldInfo,
    registry: &DataTypeRegistry,
) -> Result<bool, SchemaError> {
    let new_shape = match shape(new, registry) {
        Some(shape) => shape,
        None => {
            return Err(SchemaError::UnknownDataType {
                field: new.name.clone(),
                data_type: new.data_type.clone(),
            })
        }
    };
    let old_shape = shape(old, registry).ok_or_else(|| SchemaError::MissingSqlType {
        field: old.name.clone(),
        data_type: old.data_type.clone(),
        new_type: new_shape.physical_type.clone(),
    })?;

    Ok(old.allow_empty != new.allow_empty
        || old_shape != new_shape
        || old.name != new.name
        || old.external != new.external)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DataTypeRegistry {
        DataTypeRegistry::with_defaults()
    }

    #[test]
    fn test_identical_fields_need_no_change() {
        let field = FieldInfo::new("Title", "text").with_size(200);
        assert!(!is_database_change_necessary(&field, &field.clone(), &registry()).unwrap());
    }

    #[test]
    fn test_size_change_is_detected() {
        let old = FieldInfo::new("Title", "text").with_size(200);
        let new = old.clone().with_size(400);
        assert!(is_database_change_necessary(&old, &new, &registry()).unwrap());
    }

    #[test]
    fn test_rename_is_detected() {
        let old = FieldInfo::new("Title", "text");
        let mut new = old.clone();
        new.name = "Heading".to_string();
        assert!(is_database_change_necessary(&old, &new, &registry()).unwrap());
    }

    #[test]
    fn test_primary_key_flag_alone_is_not_a_change() {
        let old = FieldInfo::new("Code", "integer").with_allow_empty(false);
        let mut new = old.clone();
        new.primary_key = true;
        assert!(!is_database_change_necessary(&old, &new, &registry()).unwrap());
    }

    #[test]
    fn test_macro_default_equals_intrinsic_default() {
        let old = FieldInfo::new("Owner", "integer").with_default("0");
        let new = old.clone().with_default("{%CurrentUser.UserID%}");
        assert!(!is_database_change_necessary(&old, &new, &registry()).unwrap());
    }

    #[test]
    fn test_unmapped_old_type_is_fatal() {
        let old = FieldInfo::new("Price", "money");
        let new = FieldInfo::new("Price", "decimal").with_size(10).with_precision(2);
        match is_database_change_necessary(&old, &new, &registry()) {
            Err(SchemaError::MissingSqlType {
                field,
                data_type,
                new_type,
            }) => {
                assert_eq!(field, "Price");
                assert_eq!(data_type, "money");
                assert_eq!(new_type, "decimal(10,2)");
            }
            other => panic!("Expected MissingSqlType, got {:?}", other),
        }
    }

    #[test]
    fn test_unmapped_type_on_virtual_fields_compares_tags() {
        let old = FieldInfo::new("Joined", "computed").as_external();
        assert!(!is_database_change_necessary(&old, &old.clone(), &registry()).unwrap());
    }
}
