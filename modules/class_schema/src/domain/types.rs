//! Logical data type registry
//!
//! Maps the logical type tags used in field definitions ("text", "integer",
//! ...) to physical column types, structural column types and intrinsic
//! defaults. The reverse direction resolves introspected physical types back
//! to a logical tag.

use crate::contract::{ColumnType, FieldInfo};
use indexmap::IndexMap;
use std::fmt;

/// Canonical physical column type.
///
/// Rendering to a concrete SQL dialect is done by the DDL executor; the
/// `Display` form is only used to compare physical types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    NVarChar(u32),
    NVarCharMax,
    Int,
    BigInt,
    Float,
    Decimal { precision: u32, scale: u32 },
    Bit,
    DateTime2(u32),
    Date,
    Time(u32),
    UniqueIdentifier,
    VarBinaryMax,
}

/// Longest string column that is still stored inline
pub const MAX_INLINE_TEXT: u32 = 4000;

impl SqlType {
    /// Substitute declared size/precision into this type template
    pub fn with_dimensions(self, size: Option<u32>, precision: Option<u32>) -> Self {
        match self {
            Self::NVarChar(default) => match size.unwrap_or(default) {
                0 => Self::NVarCharMax,
                n if n > MAX_INLINE_TEXT => Self::NVarCharMax,
                n => Self::NVarChar(n),
            },
            Self::Decimal {
                precision: default_precision,
                scale: default_scale,
            } => Self::Decimal {
                precision: size.unwrap_or(default_precision),
                scale: precision.unwrap_or(default_scale),
            },
            Self::DateTime2(default) => Self::DateTime2(precision.unwrap_or(default)),
            Self::Time(default) => Self::Time(precision.unwrap_or(default)),
            other => other,
        }
    }

    /// Dropping a column of this type leaves space behind until the table is rebuilt
    pub fn is_variable_length(&self) -> bool {
        matches!(self, Self::NVarChar(_) | Self::NVarCharMax | Self::VarBinaryMax)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int | Self::BigInt)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NVarChar(n) => write!(f, "nvarchar({})", n),
            Self::NVarCharMax => write!(f, "nvarchar(max)"),
            Self::Int => write!(f, "int"),
            Self::BigInt => write!(f, "bigint"),
            Self::Float => write!(f, "float"),
            Self::Decimal { precision, scale } => write!(f, "decimal({},{})", precision, scale),
            Self::Bit => write!(f, "bit"),
            Self::DateTime2(p) => write!(f, "datetime2({})", p),
            Self::Date => write!(f, "date"),
            Self::Time(p) => write!(f, "time({})", p),
            Self::UniqueIdentifier => write!(f, "uniqueidentifier"),
            Self::VarBinaryMax => write!(f, "varbinary(max)"),
        }
    }
}

/// Physical column as handed to the DDL executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    /// Literal default; never a macro expression
    pub default_value: Option<String>,
    pub auto_increment: bool,
}

/// Registration of one logical data type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTypeSpec {
    /// Logical tag, matched case-insensitively
    pub tag: String,
    /// Physical type template; size/precision of a field are substituted in
    pub sql_type: SqlType,
    pub column_type: ColumnType,
    /// Literal used when a database default is required but none is declared
    pub intrinsic_default: Option<String>,
    /// Lower-case physical type names that reflect back to this tag
    pub physical_aliases: Vec<String>,
}

impl DataTypeSpec {
    pub fn new(tag: impl Into<String>, sql_type: SqlType, column_type: ColumnType) -> Self {
        Self {
            tag: tag.into(),
            sql_type,
            column_type,
            intrinsic_default: None,
            physical_aliases: Vec::new(),
        }
    }

    pub fn with_intrinsic_default(mut self, value: impl Into<String>) -> Self {
        self.intrinsic_default = Some(value.into());
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.physical_aliases = aliases.iter().map(|a| a.to_ascii_lowercase()).collect();
        self
    }

    pub fn sql_type(&self, size: Option<u32>, precision: Option<u32>) -> SqlType {
        self.sql_type.with_dimensions(size, precision)
    }
}

/// Registry of logical data types
#[derive(Debug, Clone)]
pub struct DataTypeRegistry {
    types: IndexMap<String, DataTypeSpec>,
}

pub const NIL_GUID: &str = "00000000-0000-0000-0000-000000000000";

impl Default for DataTypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl DataTypeRegistry {
    pub fn empty() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Registry with the built-in logical types
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(
            DataTypeSpec::new("text", SqlType::NVarChar(200), ColumnType::String)
                .with_intrinsic_default("")
                .with_aliases(&["character varying", "varchar", "nvarchar", "char", "character"]),
        );
        registry.register(
            DataTypeSpec::new("longtext", SqlType::NVarCharMax, ColumnType::String)
                .with_intrinsic_default("")
                .with_aliases(&["text", "longtext", "mediumtext", "ntext"]),
        );
        registry.register(
            DataTypeSpec::new("integer", SqlType::Int, ColumnType::Int32)
                .with_intrinsic_default("0")
                .with_aliases(&["integer", "int", "int4", "smallint", "mediumint"]),
        );
        registry.register(
            DataTypeSpec::new("longinteger", SqlType::BigInt, ColumnType::Int64)
                .with_intrinsic_default("0")
                .with_aliases(&["bigint", "int8"]),
        );
        registry.register(
            DataTypeSpec::new("double", SqlType::Float, ColumnType::Double)
                .with_intrinsic_default("0")
                .with_aliases(&["double precision", "double", "float", "float8", "real"]),
        );
        registry.register(
            DataTypeSpec::new(
                "decimal",
                SqlType::Decimal {
                    precision: 19,
                    scale: 4,
                },
                ColumnType::Decimal,
            )
            .with_intrinsic_default("0")
            .with_aliases(&["numeric", "decimal"]),
        );
        registry.register(
            DataTypeSpec::new("boolean", SqlType::Bit, ColumnType::Boolean)
                .with_intrinsic_default("false")
                .with_aliases(&["boolean", "bool", "bit", "tinyint"]),
        );
        registry.register(
            DataTypeSpec::new("datetime", SqlType::DateTime2(7), ColumnType::DateTime)
                .with_intrinsic_default("1970-01-01 00:00:00")
                .with_aliases(&[
                    "timestamp without time zone",
                    "timestamp with time zone",
                    "timestamp",
                    "datetime",
                    "datetime2",
                ]),
        );
        registry.register(
            DataTypeSpec::new("date", SqlType::Date, ColumnType::DateTime)
                .with_intrinsic_default("1970-01-01")
                .with_aliases(&["date"]),
        );
        registry.register(
            DataTypeSpec::new("timespan", SqlType::Time(7), ColumnType::TimeSpan)
                .with_intrinsic_default("00:00:00")
                .with_aliases(&["time without time zone", "time", "interval"]),
        );
        registry.register(
            DataTypeSpec::new("guid", SqlType::UniqueIdentifier, ColumnType::Guid)
                .with_intrinsic_default(NIL_GUID)
                .with_aliases(&["uuid", "uniqueidentifier"]),
        );
        registry.register(
            DataTypeSpec::new("binary", SqlType::VarBinaryMax, ColumnType::Binary)
                .with_aliases(&["bytea", "blob", "longblob", "mediumblob", "varbinary", "binary"]),
        );
        registry.register(
            DataTypeSpec::new("file", SqlType::UniqueIdentifier, ColumnType::Guid)
                .with_intrinsic_default(NIL_GUID),
        );
        registry
    }

    /// Register or replace a logical type
    pub fn register(&mut self, spec: DataTypeSpec) {
        self.types.insert(spec.tag.to_ascii_lowercase(), spec);
    }

    pub fn get(&self, tag: &str) -> Option<&DataTypeSpec> {
        self.types.get(&tag.to_ascii_lowercase())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.types.values().map(|s| s.tag.as_str())
    }

    /// Physical type of a field, `None` when its tag is not registered
    pub fn sql_type_for(&self, field: &FieldInfo) -> Option<SqlType> {
        self.get(&field.data_type)
            .map(|spec| spec.sql_type(field.size, field.precision))
    }

    /// First registered type whose aliases contain the physical type name
    pub fn resolve_physical(&self, physical: &str) -> Option<&DataTypeSpec> {
        let physical = physical.trim().to_ascii_lowercase();
        self.types
            .values()
            .find(|spec| spec.physical_aliases.iter().any(|a| *a == physical))
    }
}
