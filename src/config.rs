//! `.argus.yaml` project configuration
//!
//! # Recognised keys
//!
//! - `output`: generator ids (`claude`, `claude-code`, `cursor`, `copilot`,
//!   `continue`, or `all`)
//! - `ignore`: gitignore-style patterns added to the default excludes
//! - `custom_conventions`: free-form conventions appended to every analysis
//! - `overrides`: `project_name`, `framework`, `language`, `description`
//! - `claude_code`: `commands` and `architecture` toggles
//! - `ai`: enrichment endpoint settings

use crate::ai::ollama::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::generators::{parse_formats, ClaudeCodeOptions, GeneratorId};
use crate::pipeline::{AnalysisOverrides, EngineOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".argus.yaml";

pub const MAX_CUSTOM_CONVENTIONS: usize = 50;

pub const MAX_CONVENTION_LENGTH: usize = 500;

pub const OVERRIDE_KEYS: &[&str] = &["project_name", "framework", "language", "description"];

const CONFIG_HEADER: &str = "# argus configuration\n# Regenerate context files with `argus sync`.\n";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("{0} already exists (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("No configuration found at {0} (run `argus init` first)")]
    NotFound(PathBuf),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

/// Enrichment endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgusConfig {
    pub output: Vec<String>,
    pub ignore: Vec<String>,
    pub custom_conventions: Vec<String>,
    pub overrides: BTreeMap<String, String>,
    pub claude_code: ClaudeCodeOptions,
    pub ai: AiConfig,
}

impl Default for ArgusConfig {
    fn default() -> Self {
        Self {
            output: vec![
                GeneratorId::Claude.as_str().to_string(),
                GeneratorId::Cursor.as_str().to_string(),
                GeneratorId::Copilot.as_str().to_string(),
            ],
            ignore: Vec::new(),
            custom_conventions: Vec::new(),
            overrides: BTreeMap::new(),
            claude_code: ClaudeCodeOptions::default(),
            ai: AiConfig::default(),
        }
    }
}

impl ArgusConfig {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }

    /// Parses a YAML document; an empty document yields the defaults
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads and validates `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let config = Self::parse(&content, path)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `dir/.argus.yaml` when present
    pub fn load_optional(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let path = Self::path_in(dir);
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_formats(&self.output).map_err(|e| ConfigError::ValidationFailed(e.to_string()))?;
        if self.output.iter().any(|o| o.trim() == GeneratorId::Json.as_str()) {
            return Err(ConfigError::ValidationFailed(
                "'json' is only available from the command line".to_string(),
            ));
        }

        if self.custom_conventions.len() > MAX_CUSTOM_CONVENTIONS {
            return Err(ConfigError::ValidationFailed(format!(
                "At most {} custom conventions are allowed, found {}",
                MAX_CUSTOM_CONVENTIONS,
                self.custom_conventions.len()
            )));
        }
        if let Some((idx, _)) = self
            .custom_conventions
            .iter()
            .enumerate()
            .find(|(_, c)| c.chars().count() > MAX_CONVENTION_LENGTH)
        {
            return Err(ConfigError::ValidationFailed(format!(
                "custom_conventions[{}] exceeds {} characters",
                idx, MAX_CONVENTION_LENGTH
            )));
        }

        if let Some(key) = self.overrides.keys().find(|k| !OVERRIDE_KEYS.contains(&k.as_str())) {
            return Err(ConfigError::ValidationFailed(format!(
                "Unknown override '{}'. Valid keys: {}",
                key,
                OVERRIDE_KEYS.join(", ")
            )));
        }

        if self.ai.timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed("ai.timeout_secs must be at least 1".to_string()));
        }

        Ok(())
    }

    /// Output formats with `all` expanded
    pub fn formats(&self) -> Result<Vec<GeneratorId>, ConfigError> {
        parse_formats(&self.output).map_err(|e| ConfigError::ValidationFailed(e.to_string()))
    }

    pub fn overrides(&self) -> AnalysisOverrides {
        let get = |key: &str| {
            self.overrides
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        AnalysisOverrides {
            project_name: get("project_name"),
            description: get("description"),
            language: get("language"),
            framework: get("framework"),
        }
    }

    /// Engine options carrying this configuration's ignores, conventions and
    /// overrides
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            extra_ignores: self.ignore.clone(),
            custom_conventions: self
                .custom_conventions
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            overrides: self.overrides(),
            ..EngineOptions::default()
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        let body = serde_yaml::to_string(self).map_err(ConfigError::Serialize)?;
        Ok(format!("{}{}", CONFIG_HEADER, body))
    }

    /// Writes the default configuration into `dir`
    pub fn write_default(dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
        let path = Self::path_in(dir);
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path));
        }
        let content = Self::default().to_yaml()?;
        fs::write(&path, content).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_round_trips_through_yaml() {
        let yaml = ArgusConfig::default().to_yaml().unwrap();
        assert!(yaml.starts_with("# argus configuration"));
        let parsed = ArgusConfig::parse(&yaml, Path::new(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(parsed, ArgusConfig::default());
        parsed.validate().unwrap();
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let yaml = "output: [all]\noverrides:\n  project_name: shop\nclaude_code:\n  commands: false\n";
        let config = ArgusConfig::parse(yaml, Path::new(CONFIG_FILE_NAME)).unwrap();

        config.validate().unwrap();
        assert_eq!(config.formats().unwrap().len(), 5);
        assert!(!config.claude_code.commands);
        assert!(config.claude_code.architecture);
        assert_eq!(config.ai.timeout_secs, 120);
        assert_eq!(config.overrides().project_name.as_deref(), Some("shop"));
    }

    #[test]
    fn test_rejects_unknown_output() {
        let config = ArgusConfig {
            output: vec!["windsurf".to_string()],
            ..ArgusConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_rejects_unknown_override_key() {
        let mut config = ArgusConfig::default();
        config.overrides.insert("version".to_string(), "2".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown override 'version'"));
    }

    #[test]
    fn test_custom_convention_limits() {
        let too_many = ArgusConfig {
            custom_conventions: vec!["x".to_string(); MAX_CUSTOM_CONVENTIONS + 1],
            ..ArgusConfig::default()
        };
        assert!(too_many.validate().is_err());

        let too_long = ArgusConfig {
            custom_conventions: vec!["y".repeat(MAX_CONVENTION_LENGTH + 1)],
            ..ArgusConfig::default()
        };
        assert!(too_long.validate().unwrap_err().to_string().contains("custom_conventions[0]"));

        let at_limit = ArgusConfig {
            custom_conventions: vec!["z".repeat(MAX_CONVENTION_LENGTH); MAX_CUSTOM_CONVENTIONS],
            ..ArgusConfig::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_write_default_respects_force() {
        let dir = TempDir::new().unwrap();
        let path = ArgusConfig::write_default(dir.path(), false).unwrap();
        assert!(path.ends_with(CONFIG_FILE_NAME));

        let err = ArgusConfig::write_default(dir.path(), false).unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists(_)));

        ArgusConfig::write_default(dir.path(), true).unwrap();
        assert!(ArgusConfig::load(&path).is_ok());
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = ArgusConfig::load(&ArgusConfig::path_in(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(ArgusConfig::load_optional(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_engine_options_carry_settings() {
        let config = ArgusConfig {
            ignore: vec!["fixtures/".to_string()],
            custom_conventions: vec!["  Use zod for validation ".to_string(), " ".to_string()],
            ..ArgusConfig::default()
        };
        let options = config.engine_options();
        assert_eq!(options.extra_ignores, vec!["fixtures/"]);
        assert_eq!(options.custom_conventions, vec!["Use zod for validation"]);
        assert_eq!(options.monorepo_concurrency, 4);
    }
}
