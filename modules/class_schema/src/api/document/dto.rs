//! Serde DTOs for the field definition document and the structured schema
//! description. Key names follow the attribute names of the markup formats.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ===== Field definition document =====

/// Ordered list of field nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefinitionDocument {
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
}

/// One field node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDocument {
    pub column: String,

    /// Absent for fields that were never assigned an identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Uuid>,

    pub columntype: String,

    /// `-1` or absent means unspecified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columnsize: Option<i64>,

    /// `-1` or absent means unspecified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columnprecision: Option<i64>,

    #[serde(default = "default_true")]
    pub allowempty: bool,

    #[serde(rename = "isPK", default, skip_serializing_if = "is_false")]
    pub is_pk: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub system: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub dummy: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceDocument>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, PropertyDocument>,
}

fn default_true() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Link to another object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceDocument {
    #[serde(rename = "objectType")]
    pub object_type: String,

    #[serde(rename = "type", default)]
    pub reference_type: ReferenceTypeDocument,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceTypeDocument {
    Binding,
    Required,
    #[default]
    NotRequired,
}

/// Property value: a plain scalar, or a value with its macro flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyDocument {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Flagged {
        value: String,
        #[serde(rename = "macro", default)]
        is_macro: bool,
    },
}

// ===== Structured schema description =====

/// Column list of a class table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureDocument {
    pub table: String,

    #[serde(default)]
    pub columns: Vec<SchemaColumnDocument>,

    #[serde(rename = "primaryKey", default, skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,
}

/// Column entry: either `type`, or a restricted `base` with `maxLength`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaColumnDocument {
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub xsd_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(rename = "maxLength", default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}
