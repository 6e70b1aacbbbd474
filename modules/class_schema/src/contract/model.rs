//! Contract models for the class schema engine
//!
//! These models are transport-agnostic and used for inter-module communication.
//! NO serde derives - document formats live in `api::document`.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

// ===== Structural (derived) schema =====

/// Runtime type of a reflected column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Boolean,
    Int32,
    Int64,
    Double,
    Decimal,
    DateTime,
    TimeSpan,
    Guid,
    String,
    Binary,
}

impl ColumnType {
    /// Resolve an XSD type name (`xs:int`, `msdata:Guid`, ...) to a column type
    pub fn from_xsd(name: &str) -> Option<Self> {
        let local = name.rsplit(':').next().unwrap_or(name);
        let ty = match local.to_ascii_lowercase().as_str() {
            "boolean" => Self::Boolean,
            "int" | "short" | "byte" | "unsignedbyte" => Self::Int32,
            "long" => Self::Int64,
            "double" | "float" => Self::Double,
            "decimal" => Self::Decimal,
            "datetime" | "date" => Self::DateTime,
            "duration" | "time" => Self::TimeSpan,
            "guid" => Self::Guid,
            "string" => Self::String,
            "base64binary" | "hexbinary" => Self::Binary,
            _ => return None,
        };
        Some(ty)
    }

    /// Canonical XSD type name
    pub fn xsd_name(&self) -> &'static str {
        match self {
            Self::Boolean => "xs:boolean",
            Self::Int32 => "xs:int",
            Self::Int64 => "xs:long",
            Self::Double => "xs:double",
            Self::Decimal => "xs:decimal",
            Self::DateTime => "xs:dateTime",
            Self::TimeSpan => "xs:duration",
            Self::Guid => "msdata:Guid",
            Self::String => "xs:string",
            Self::Binary => "xs:base64Binary",
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }
}

/// Immutable (name, runtime type) pair of a structural schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Reflected structure of a class: ordered columns plus key and column subsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassStructure {
    /// Class name the structure was derived for
    pub class_name: String,
    /// Physical table name
    pub table_name: String,
    /// Columns in declaration order
    pub column_definitions: Vec<ColumnDefinition>,
    /// Primary key column name(s), `;`-joined when composite
    pub id_column: String,
    /// Names of binary columns
    pub binary_columns: Vec<String>,
    /// Names of string columns
    pub string_columns: Vec<String>,
}

impl ClassStructure {
    /// Build a structure, deriving the binary/string column subsets
    pub fn new(
        class_name: impl Into<String>,
        table_name: impl Into<String>,
        column_definitions: Vec<ColumnDefinition>,
        id_column: impl Into<String>,
    ) -> Self {
        let binary_columns = column_definitions
            .iter()
            .filter(|c| c.column_type.is_binary())
            .map(|c| c.name.clone())
            .collect();
        let string_columns = column_definitions
            .iter()
            .filter(|c| c.column_type.is_string())
            .map(|c| c.name.clone())
            .collect();

        Self {
            class_name: class_name.into(),
            table_name: table_name.into(),
            column_definitions,
            id_column: id_column.into(),
            binary_columns,
            string_columns,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.column_definitions
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Find a column by name (case-insensitive)
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.column_definitions
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Primary key column names split out of `id_column`
    pub fn id_columns(&self) -> Vec<&str> {
        self.id_column
            .split(';')
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Merge several structures into one by concatenating their columns in
    /// argument order. Duplicate column names are kept as separate entries.
    /// Names and key are taken from the first structure.
    pub fn combine(structures: &[&ClassStructure]) -> Option<ClassStructure> {
        let first = structures.first()?;
        let columns = structures
            .iter()
            .flat_map(|s| s.column_definitions.iter().cloned())
            .collect();

        Some(ClassStructure::new(
            first.class_name.clone(),
            first.table_name.clone(),
            columns,
            first.id_column.clone(),
        ))
    }
}

/// One column entry of a structured schema description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaColumn {
    pub name: String,
    /// XSD type name, e.g. `xs:string`
    pub xsd_type: String,
    pub max_length: Option<u32>,
}

/// Stored structured schema description of a class table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructureSchema {
    pub table: String,
    pub columns: Vec<SchemaColumn>,
    /// Declared primary key; the live constraint wins when they diverge
    pub primary_key: Vec<String>,
}

// ===== Editable field definitions =====

/// Kind of link to another object type; informational only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceType {
    Binding,
    Required,
    NotRequired,
}

/// Foreign-entity linkage metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceInfo {
    pub object_type: String,
    pub reference_type: ReferenceType,
}

/// Property bag value with its macro flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue {
    pub value: String,
    pub is_macro: bool,
}

impl PropertyValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_macro: false,
        }
    }

    pub fn macro_expr(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            is_macro: true,
        }
    }
}

/// Field UI/behavioral metadata: known hints plus a residual extension map
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldProperties {
    pub caption: Option<PropertyValue>,
    pub description: Option<PropertyValue>,
    pub explanation_text: Option<PropertyValue>,
    pub control_name: Option<String>,
    pub visible: Option<bool>,
    pub enabled: Option<bool>,
    /// Unknown keys in document order
    pub extra: IndexMap<String, PropertyValue>,
}

impl FieldProperties {
    pub const CAPTION: &'static str = "fieldcaption";
    pub const DESCRIPTION: &'static str = "fielddescription";
    pub const EXPLANATION_TEXT: &'static str = "explanationtext";
    pub const CONTROL_NAME: &'static str = "controlname";
    pub const VISIBLE: &'static str = "visible";
    pub const ENABLED: &'static str = "enabled";

    /// Look a property up by its document key (case-insensitive)
    pub fn get(&self, key: &str) -> Option<PropertyValue> {
        let key = key.to_ascii_lowercase();
        match key.as_str() {
            Self::CAPTION => self.caption.clone(),
            Self::DESCRIPTION => self.description.clone(),
            Self::EXPLANATION_TEXT => self.explanation_text.clone(),
            Self::CONTROL_NAME => self.control_name.clone().map(PropertyValue::literal),
            Self::VISIBLE if self.visible.is_some() => {
                self.visible.map(|v| PropertyValue::literal(v.to_string()))
            }
            Self::ENABLED if self.enabled.is_some() => {
                self.enabled.map(|v| PropertyValue::literal(v.to_string()))
            }
            _ => self.extra.get(&key).cloned(),
        }
    }

    /// Set a property by its document key.
    ///
    /// Boolean hints holding a macro expression cannot be typed and are kept
    /// in the residual map.
    pub fn set(&mut self, key: &str, value: PropertyValue) {
        let key = key.to_ascii_lowercase();
        match key.as_str() {
            Self::CAPTION => self.caption = Some(value),
            Self::DESCRIPTION => self.description = Some(value),
            Self::EXPLANATION_TEXT => self.explanation_text = Some(value),
            Self::CONTROL_NAME if !value.is_macro => self.control_name = Some(value.value),
            Self::VISIBLE | Self::ENABLED if !value.is_macro => {
                match parse_bool(&value.value) {
                    Some(flag) if key == Self::VISIBLE => self.visible = Some(flag),
                    Some(flag) => self.enabled = Some(flag),
                    None => {
                        self.extra.insert(key, value);
                    }
                }
            }
            _ => {
                self.extra.insert(key, value);
            }
        }
    }

    /// All properties as (key, value) pairs, known keys first
    pub fn entries(&self) -> Vec<(String, PropertyValue)> {
        let mut out = Vec::new();
        for key in [
            Self::CAPTION,
            Self::DESCRIPTION,
            Self::EXPLANATION_TEXT,
            Self::CONTROL_NAME,
            Self::VISIBLE,
            Self::ENABLED,
        ] {
            let typed = match key {
                Self::VISIBLE => self.visible.map(|v| PropertyValue::literal(v.to_string())),
                Self::ENABLED => self.enabled.map(|v| PropertyValue::literal(v.to_string())),
                Self::CONTROL_NAME => self.control_name.clone().map(PropertyValue::literal),
                Self::CAPTION => self.caption.clone(),
                Self::DESCRIPTION => self.description.clone(),
                _ => self.explanation_text.clone(),
            };
            if let Some(value) = typed {
                out.push((key.to_string(), value));
            }
        }
        out.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// One editable entry of a class definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Column name, unique within a class (case-insensitive)
    pub name: String,
    /// Stable identity that survives renames
    pub guid: Uuid,
    /// Logical type tag, e.g. "text", "integer"
    pub data_type: String,
    pub size: Option<u32>,
    pub precision: Option<u32>,
    pub allow_empty: bool,
    pub primary_key: bool,
    /// Declared default; may be a macro expression
    pub default_value: Option<String>,
    /// Framework-owned field
    pub system: bool,
    /// Part of the entity but not a physical column
    pub external: bool,
    /// Form-only field without storage
    pub is_dummy_field: bool,
    pub reference: Option<ReferenceInfo>,
    pub properties: FieldProperties,
}

impl FieldInfo {
    /// New nullable field with a fresh GUID
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guid: Uuid::new_v4(),
            data_type: data_type.into(),
            size: None,
            precision: None,
            allow_empty: true,
            primary_key: false,
            default_value: None,
            system: false,
            external: false,
            is_dummy_field: false,
            reference: None,
            properties: FieldProperties::default(),
        }
    }

    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = guid;
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Mark as primary key; key columns never allow empty values
    pub fn as_primary_key(mut self) -> Self {
        self.primary_key = true;
        self.allow_empty = false;
        self
    }

    pub fn as_system(mut self) -> Self {
        self.system = true;
        self
    }

    pub fn as_external(mut self) -> Self {
        self.external = true;
        self
    }

    pub fn as_dummy(mut self) -> Self {
        self.is_dummy_field = true;
        self
    }

    pub fn with_reference(
        mut self,
        object_type: impl Into<String>,
        reference_type: ReferenceType,
    ) -> Self {
        self.reference = Some(ReferenceInfo {
            object_type: object_type.into(),
            reference_type,
        });
        self
    }

    /// External and dummy fields never own a physical column
    pub fn is_virtual(&self) -> bool {
        self.external || self.is_dummy_field
    }

    pub fn is_materialized(&self) -> bool {
        !self.is_virtual()
    }
}

/// Ordered field list of a class (the "form definition")
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassDefinition {
    pub fields: Vec<FieldInfo>,
}

impl ClassDefinition {
    pub fn new(fields: Vec<FieldInfo>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Find a field by name (case-insensitive)
    pub fn get_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn get_field_by_guid(&self, guid: Uuid) -> Option<&FieldInfo> {
        if guid.is_nil() {
            return None;
        }
        self.fields.iter().find(|f| f.guid == guid)
    }

    pub fn add_field(&mut self, field: FieldInfo) {
        self.fields.push(field);
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldInfo> {
        let index = self
            .fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))?;
        Some(self.fields.remove(index))
    }

    /// Materialized primary key fields in declared order
    pub fn primary_key_fields(&self) -> Vec<&FieldInfo> {
        self.fields
            .iter()
            .filter(|f| f.primary_key && f.is_materialized())
            .collect()
    }

    pub fn primary_key_names(&self) -> Vec<String> {
        self.primary_key_fields()
            .into_iter()
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn materialized_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(|f| f.is_materialized())
    }
}

// ===== Classes =====

/// Owning class of a table, carried by field events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIdentity {
    pub class_name: String,
    pub table_name: String,
}

impl ClassIdentity {
    pub fn new(class_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            table_name: table_name.into(),
        }
    }
}

/// Data class: owns the field definition and the table it is materialized in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataClass {
    pub class_name: String,
    pub table_name: String,
    /// Source of truth for the table structure
    pub definition: ClassDefinition,
    /// Structured schema description regenerated after each migration
    pub structure: Option<StructureSchema>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DataClass {
    pub fn identity(&self) -> ClassIdentity {
        ClassIdentity::new(self.class_name.clone(), self.table_name.clone())
    }
}
