//! Contract error types for the class schema engine
//!
//! These errors are transport-agnostic and used for inter-module communication.

use thiserror::Error;

/// Class schema domain errors
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A table cannot be created without a materialized primary key field
    #[error("class '{class_name}' has no primary key field")]
    NoPrimaryKey { class_name: String },

    /// The old side of a comparison carries a type tag the registry cannot map.
    /// The stored definition and the database have drifted apart.
    #[error(
        "missing SQL type for field '{field}': data type '{data_type}' is not registered (new definition maps to '{new_type}')"
    )]
    MissingSqlType {
        field: String,
        data_type: String,
        new_type: String,
    },

    /// A field to be materialized has an unregistered type tag
    #[error("unknown data type '{data_type}' on field '{field}'")]
    UnknownDataType { field: String, data_type: String },

    /// Destructive edit of a framework-owned field without override
    #[error("system field '{field}' cannot be removed or altered")]
    SystemFieldProtected { field: String },

    /// A retained primary key column cannot be renamed; its constraint would
    /// be rebuilt over a column that does not exist
    #[error("primary key field '{old}' cannot be renamed to '{new}'")]
    PrimaryKeyRenamed { old: String, new: String },

    /// Two fields of one definition share a name or GUID
    #[error("duplicate field '{field}' in class definition")]
    DuplicateField { field: String },

    /// A field observer aborted the migration
    #[error("migration cancelled at field '{field}': {reason}")]
    Cancelled { field: String, reason: String },

    #[error("class not found: {class_name}")]
    ClassNotFound { class_name: String },

    #[error("class already exists: {class_name}")]
    ClassExists { class_name: String },

    /// Field definition or schema description could not be read
    #[error("invalid document: {message}")]
    InvalidDocument { message: String },

    /// Failure reported by the database layer, passed through unchanged
    #[error(transparent)]
    Execution(#[from] anyhow::Error),
}

impl SchemaError {
    /// Definition and type-mapping errors are raised before any DDL is issued
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::NoPrimaryKey { .. }
                | Self::MissingSqlType { .. }
                | Self::UnknownDataType { .. }
                | Self::SystemFieldProtected { .. }
                | Self::DuplicateField { .. }
                | Self::PrimaryKeyRenamed { .. }
                | Self::InvalidDocument { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sql_type_message_carries_both_types() {
        let err = SchemaError::MissingSqlType {
            field: "Price".to_string(),
            data_type: "money".to_string(),
            new_type: "decimal(19,4)".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Price"));
        assert!(message.contains("money"));
        assert!(message.contains("decimal(19,4)"));
        assert!(err.is_definition_error());
    }

    #[test]
    fn test_execution_error_is_transparent() {
        let err: SchemaError = anyhow::anyhow!("column \"x\" does not exist").into();
        assert_eq!(err.to_string(), "column \"x\" does not exist");
        assert!(!err.is_definition_error());
    }
}
