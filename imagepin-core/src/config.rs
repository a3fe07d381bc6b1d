//! `.imagepin.yaml` resolver configuration.
//!
//! # File layout
//!
//! ```yaml
//! builder:
//!   kind: command
//!   command: ["ko", "build", "--push=false", "{import_path}"]
//! publisher:
//!   kind: local
//!   repository: ko.local
//! pins:
//!   ko://github.com/acme/app/cmd/server: gcr.io/acme/server@sha256:…
//! ```
//!
//! # API pattern
//!
//! - `fn_at(dir: &Path, …)`: explicit directory; used in tests with `TempDir`
//! - `fn(…)`: uses the current working directory, delegates to `_at`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

pub const CONFIG_FILE_NAME: &str = ".imagepin.yaml";

/// Repository used by the local publisher when none is configured.
pub const DEFAULT_LOCAL_REPOSITORY: &str = "ko.local";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Root of `.imagepin.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResolverConfig {
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    /// Canonical reference → published image reference.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub pins: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BuilderConfig {
    /// Look references up in `pins`.
    #[default]
    Pinned,
    /// Run an external build command per reference.
    Command(CommandConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PublisherConfig {
    /// Return the pinned reference unchanged.
    #[default]
    Pinned,
    /// Run an external publish command per artifact.
    Command(CommandConfig),
    /// Content-address file artifacts without uploading them.
    Local {
        #[serde(default = "default_local_repository")]
        repository: String,
    },
}

/// An external command. `command[0]` is the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

fn default_local_repository() -> String {
    DEFAULT_LOCAL_REPOSITORY.to_owned()
}

impl ResolverConfig {
    /// Reject configurations no backend could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let BuilderConfig::Command(cmd) = &self.builder {
            validate_command("builder", cmd)?;
        }
        match &self.publisher {
            PublisherConfig::Command(cmd) => validate_command("publisher", cmd)?,
            PublisherConfig::Local { repository } if repository.trim().is_empty() => {
                return Err(ConfigError::Invalid(
                    "publisher.repository must not be empty".to_owned(),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

fn validate_command(section: &str, cmd: &CommandConfig) -> Result<(), ConfigError> {
    match cmd.command.first() {
        Some(program) if !program.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::Invalid(format!(
            "{section}.command must name a program"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<dir>/.imagepin.yaml`: pure, no I/O.
pub fn config_path_at(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load and validate a config file at an explicit path.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path)
/// if malformed.
pub fn load(path: &Path) -> Result<ResolverConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: ResolverConfig = serde_yaml::from_str(&contents).map_err(|e| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `<dir>/.imagepin.yaml`.
pub fn load_at(dir: &Path) -> Result<ResolverConfig, ConfigError> {
    load(&config_path_at(dir))
}

// ---------------------------------------------------------------------------
// Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `<dir>/.imagepin.yaml`.
///
/// Write flow: serialize → `.imagepin.yaml.tmp` sibling → `rename`.
pub fn save_at(dir: &Path, config: &ResolverConfig) -> Result<PathBuf, ConfigError> {
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let path = config_path_at(dir);
    let tmp_path = path.with_file_name(format!("{CONFIG_FILE_NAME}.tmp"));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    if let Err(e) = std::fs::rename(&tmp_path, &path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(&path, e));
    }
    Ok(path)
}

/// `load_at` convenience wrapper for the current directory.
pub fn load_current() -> Result<ResolverConfig, ConfigError> {
    load_at(&current_dir()?)
}

fn current_dir() -> Result<PathBuf, ConfigError> {
    std::env::current_dir().map_err(|e| io_err(".", e))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_pinned_and_valid() {
        let config = ResolverConfig::default();
        assert_eq!(config.builder, BuilderConfig::Pinned);
        assert_eq!(config.publisher, PublisherConfig::Pinned);
        config.validate().expect("valid");
    }

    #[test]
    fn empty_command_is_invalid() {
        let config = ResolverConfig {
            builder: BuilderConfig::Command(CommandConfig {
                command: vec![],
                env: BTreeMap::new(),
                working_dir: None,
            }),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("builder.command"), "got: {err}");
    }

    #[test]
    fn local_repository_defaults_to_ko_local() {
        let config: ResolverConfig =
            serde_yaml::from_str("publisher:\n  kind: local\n").expect("parse");
        assert_eq!(
            config.publisher,
            PublisherConfig::Local {
                repository: "ko.local".into()
            }
        );
    }

    #[test]
    fn save_cleans_up_tmp() {
        let dir = TempDir::new().expect("tempdir");
        save_at(dir.path(), &ResolverConfig::default()).expect("save");
        assert!(config_path_at(dir.path()).exists());
        assert!(!dir.path().join(".imagepin.yaml.tmp").exists());
    }

    #[test]
    fn load_missing_returns_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_at(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
