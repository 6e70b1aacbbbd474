//! Field definition and structure schema documents
//!
//! Both documents are accepted as JSON or YAML. Stored definitions are always
//! written back as JSON.

pub mod dto;
pub mod mapper;

use crate::contract::{ClassDefinition, SchemaError, StructureSchema};
use dto::{DefinitionDocument, StructureDocument};
use serde::de::DeserializeOwned;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Guess the format from the first significant character
    pub fn detect(text: &str) -> Self {
        match text.trim_start().chars().next() {
            Some('{') | Some('[') => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// Format implied by a file extension, if any
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

fn decode<T: DeserializeOwned>(text: &str, format: DocumentFormat) -> Result<T, SchemaError> {
    let result = match format {
        DocumentFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
    };
    result.map_err(|message| SchemaError::InvalidDocument { message })
}

/// Parse a field definition document, detecting its format
pub fn parse_definition(text: &str) -> Result<ClassDefinition, SchemaError> {
    parse_definition_as(text, DocumentFormat::detect(text))
}

pub fn parse_definition_as(
    text: &str,
    format: DocumentFormat,
) -> Result<ClassDefinition, SchemaError> {
    let document: DefinitionDocument = decode(text, format)?;
    ClassDefinition::try_from(document)
}

/// Read a field definition document from a file
pub fn read_definition(path: &Path) -> Result<ClassDefinition, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|e| SchemaError::InvalidDocument {
        message: format!("{}: {e}", path.display()),
    })?;
    let format = DocumentFormat::from_path(path).unwrap_or_else(|| DocumentFormat::detect(&text));
    parse_definition_as(&text, format)
}

pub fn definition_to_value(definition: &ClassDefinition) -> Result<serde_json::Value, SchemaError> {
    serde_json::to_value(DefinitionDocument::from(definition))
        .map_err(|e| SchemaError::Execution(e.into()))
}

pub fn definition_from_value(value: serde_json::Value) -> Result<ClassDefinition, SchemaError> {
    let document: DefinitionDocument =
        serde_json::from_value(value).map_err(|e| SchemaError::InvalidDocument {
            message: e.to_string(),
        })?;
    ClassDefinition::try_from(document)
}

pub fn definition_to_json(definition: &ClassDefinition) -> Result<String, SchemaError> {
    serde_json::to_string_pretty(&DefinitionDocument::from(definition))
        .map_err(|e| SchemaError::Execution(e.into()))
}

/// Parse a structured schema description, detecting its format
pub fn parse_structure_schema(text: &str) -> Result<StructureSchema, SchemaError> {
    let document: StructureDocument = decode(text, DocumentFormat::detect(text))?;
    StructureSchema::try_from(document)
}

pub fn structure_schema_to_value(
    schema: &StructureSchema,
) -> Result<serde_json::Value, SchemaError> {
    serde_json::to_value(StructureDocument::from(schema))
        .map_err(|e| SchemaError::Execution(e.into()))
}

pub fn structure_schema_from_value(
    value: serde_json::Value,
) -> Result<StructureSchema, SchemaError> {
    let document: StructureDocument =
        serde_json::from_value(value).map_err(|e| SchemaError::InvalidDocument {
            message: e.to_string(),
        })?;
    StructureSchema::try_from(document)
}
