//! Configuration for the class schema engine

use crate::domain::MigrationOptions;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `CLASS_SCHEMA_DATABASE_URL`
pub const ENV_PREFIX: &str = "CLASS_SCHEMA_";

/// Class schema engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Rebuild a table once after variable-length columns were dropped
    #[serde(default = "default_true")]
    pub reclaim_space_after_drop: bool,

    /// Permit removing or altering system fields
    #[serde(default)]
    pub allow_system_field_changes: bool,

    /// Prefix of primary key constraint names
    #[serde(default = "default_primary_key_prefix")]
    pub primary_key_prefix: String,

    /// Make a single integer primary key auto-increment
    #[serde(default = "default_true")]
    pub identity_for_single_key: bool,

    /// Connection string used by the CLI
    #[serde(default)]
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reclaim_space_after_drop: true,
            allow_system_field_changes: false,
            primary_key_prefix: default_primary_key_prefix(),
            identity_for_single_key: true,
            database_url: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_primary_key_prefix() -> String {
    "PK_".to_string()
}

impl Config {
    /// Layer defaults, an optional YAML file and `CLASS_SCHEMA_*` variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        Ok(config)
    }
}

impl From<&Config> for MigrationOptions {
    fn from(config: &Config) -> Self {
        Self {
            reclaim_space_after_drop: config.reclaim_space_after_drop,
            allow_system_field_changes: config.allow_system_field_changes,
            primary_key_prefix: config.primary_key_prefix.clone(),
            identity_for_single_key: config.identity_for_single_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_keys_use_defaults() {
        let config: Config = serde_yaml::from_str("allow_system_field_changes: true").unwrap();
        assert!(config.allow_system_field_changes);
        assert!(config.reclaim_space_after_drop);
        assert_eq!(config.primary_key_prefix, "PK_");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result: Result<Config, _> = serde_yaml::from_str("reclaim_space: false");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_merges_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "primary_key_prefix: \"PK_CMS_\"").unwrap();
        writeln!(file, "reclaim_space_after_drop: false").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.primary_key_prefix, "PK_CMS_");

        let options = MigrationOptions::from(&config);
        assert!(!options.reclaim_space_after_drop);
        assert_eq!(options.constraint_name("CMS_User"), "PK_CMS_CMS_User");
    }
}
