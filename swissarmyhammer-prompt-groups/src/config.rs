//! Engine configuration loaded through figment
//!
//! Precedence (later overrides earlier):
//! 1. Built-in defaults
//! 2. `prompt-groups.{toml,yaml,yml,json}` in each configured directory, in order
//! 3. Environment variables prefixed `PROMPT_GROUPS_`

use crate::error::Result;
use crate::mode::PresentationMode;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Base name of configuration files
pub const CONFIG_FILE_STEM: &str = "prompt-groups";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PROMPT_GROUPS_";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupsConfig {
    /// Presentation mode applied on initialize
    pub default_mode: PresentationMode,
    /// Maximum number of mutation records kept
    pub activity_capacity: usize,
    /// Display label of the TopLevel group
    pub top_level_name: String,
    /// Default tracing filter directive; `RUST_LOG` wins when set
    pub log_filter: String,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            default_mode: PresentationMode::Off,
            activity_capacity: 256,
            top_level_name: "Ungrouped".to_string(),
            log_filter: "warn".to_string(),
        }
    }
}

impl GroupsConfig {
    /// Load with the default loader (current directory, default env prefix)
    pub fn load() -> Result<Self> {
        ConfigLoader::new().with_dir(".").load()
    }
}

/// Builds the figment for [`GroupsConfig`]
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    dirs: Vec<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Loader with no directories and the default env prefix
    pub fn new() -> Self {
        Self {
            dirs: Vec::new(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Search `dir` for config files; later directories override earlier ones
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Extract the configuration from every source
    pub fn load(&self) -> Result<GroupsConfig> {
        let config: GroupsConfig = self.figment().extract()?;
        debug!(
            mode = %config.default_mode,
            capacity = config.activity_capacity,
            "loaded prompt groups configuration"
        );
        Ok(config)
    }

    /// Build the figment with all sources in precedence order
    pub fn figment(&self) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(GroupsConfig::default()));
        for dir in &self.dirs {
            figment = figment.merge(Self::files_in(dir));
        }
        figment.merge(Env::prefixed(&self.env_prefix))
    }

    fn files_in(dir: &Path) -> Figment {
        let mut figment = Figment::new();
        for ext in ["toml", "yaml", "yml", "json"] {
            let path = dir.join(format!("{}.{}", CONFIG_FILE_STEM, ext));
            if !path.is_file() {
                continue;
            }
            trace!("Loading config file: {}", path.display());
            figment = match ext {
                "toml" => figment.merge(Toml::file(&path)),
                "json" => figment.merge(Json::file(&path)),
                _ => figment.merge(Yaml::file(&path)),
            };
        }
        figment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GroupError;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    const PREFIX: &str = "PROMPT_GROUPS_UNIT_";

    #[test]
    #[serial]
    fn test_defaults() {
        let config = ConfigLoader::new().with_env_prefix(PREFIX).load().unwrap();
        assert_eq!(config, GroupsConfig::default());
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("prompt-groups.toml"),
            "default_mode = \"tray\"\nactivity_capacity = 8\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_dir(dir.path())
            .with_env_prefix(PREFIX)
            .load()
            .unwrap();
        assert_eq!(config.default_mode, PresentationMode::Tray);
        assert_eq!(config.activity_capacity, 8);
        assert_eq!(config.top_level_name, "Ungrouped");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("prompt-groups.yaml"),
            "default_mode: tray\ntop_level_name: Loose\n",
        )
        .unwrap();
        std::env::set_var("PROMPT_GROUPS_UNIT_DEFAULT_MODE", "accordion");

        let result = ConfigLoader::new()
            .with_dir(dir.path())
            .with_env_prefix(PREFIX)
            .load();
        std::env::remove_var("PROMPT_GROUPS_UNIT_DEFAULT_MODE");

        let config = result.unwrap();
        assert_eq!(config.default_mode, PresentationMode::Accordion);
        assert_eq!(config.top_level_name, "Loose");
    }

    #[test]
    fn test_bad_value_is_config_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("prompt-groups.json"),
            r#"{"default_mode": "sideways"}"#,
        )
        .unwrap();

        let err = ConfigLoader::new()
            .with_dir(dir.path())
            .with_env_prefix(PREFIX)
            .load()
            .unwrap_err();
        assert!(matches!(err, GroupError::Config(_)));
        assert!(!err.is_recoverable());
    }
}
