//! Sync configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid:
//!
//! ```toml
//! users_collection = "users"
//! patients_collection = "patients"
//! order_by = "name"
//! suggestion_limit = 8
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::CollectionPath;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where patient documents live and how they are listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Top-level collection holding one document per caregiver
    pub users_collection: String,
    /// Per-caregiver subcollection of patient documents
    pub patients_collection: String,
    /// Field the subscription orders by
    pub order_by: String,
    /// Maximum medicine suggestions returned
    pub suggestion_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            users_collection: "users".into(),
            patients_collection: "patients".into(),
            order_by: "name".into(),
            suggestion_limit: 8,
        }
    }
}

impl SyncConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("users_collection", &self.users_collection),
            ("patients_collection", &self.patients_collection),
            ("order_by", &self.order_by),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
            if value.contains('/') {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a single path segment, got {:?}",
                    field, value
                )));
            }
        }

        if self.suggestion_limit == 0 {
            return Err(ConfigError::Invalid(
                "suggestion_limit must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Patient collection for a caregiver: `{users}/{uid}/{patients}`.
    pub fn patients_path(&self, uid: &str) -> CollectionPath {
        CollectionPath::new(&[&self.users_collection, uid, &self.patients_collection])
    }
}
