//! # Configuration
//!
//! `fieldbox.toml` settings for the command-line tool.
//!
//! ```toml
//! workspace = "fieldbox-workspace"
//! document = "{{workspace}}document.field2"
//! persisted = ["color"]
//!
//! [[filespec]]
//! name = "code"
//! suffix = ".js"
//! language = "javascript"
//! ```
//!
//! Every key is optional. A relative `workspace` is taken relative to the
//! directory holding the config file.

use fieldbox_core::{FieldboxError, PersistenceEngine};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Looked up in the current directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "fieldbox.toml";

/// Default workspace directory.
pub const DEFAULT_WORKSPACE: &str = "fieldbox-workspace";

/// Default document path.
pub const DEFAULT_DOCUMENT: &str = "{{workspace}}document.field2";

/// One `[[filespec]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilespecEntry {
    pub name: String,
    /// File suffix including the dot, or `{{execution}}` to let each box decide.
    pub suffix: String,
    #[serde(default)]
    pub language: String,
}

/// Tool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub workspace: PathBuf,
    pub document: String,
    pub persisted: Vec<String>,
    #[serde(rename = "filespec")]
    pub filespecs: Vec<FilespecEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            document: DEFAULT_DOCUMENT.to_string(),
            filespecs: vec![FilespecEntry {
                name: "code".to_string(),
                suffix: ".js".to_string(),
                language: "javascript".to_string(),
            }],
            persisted: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, FieldboxError> {
        toml::from_str(text).map_err(|e| FieldboxError::ConfigError(e.to_string()))
    }

    /// Load the config at `path`, or `fieldbox.toml` in the current
    /// directory, or the defaults if neither exists.
    ///
    /// An explicit `path` that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, FieldboxError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| {
            FieldboxError::ConfigError(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml_str(&text)?;

        if config.workspace.is_relative() {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                config.workspace = dir.join(&config.workspace);
            }
        }
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Build an engine with this config's workspace and registrations.
    pub fn engine(&self) -> Result<PersistenceEngine, FieldboxError> {
        let mut engine = PersistenceEngine::new(&self.workspace)?;
        for spec in &self.filespecs {
            engine.register_filespec(spec.name.clone(), spec.suffix.clone(), spec.language.clone());
        }
        for name in &self.persisted {
            engine.register_persisted_property(name.clone());
        }
        Ok(engine)
    }

    /// The config file `init` writes for this config.
    pub fn to_toml(&self) -> Result<String, FieldboxError> {
        toml::to_string_pretty(self).map_err(|e| FieldboxError::ConfigError(e.to_string()))
    }
}
