//! Configuration management for agora.
//!
//! Loads configuration from ${AGORA_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the discussion-board backend.
    pub base_url: String,
    /// Page size for post/comment listings.
    pub page_size: u32,
    /// Per-request timeout in seconds. 0 disables the timeout.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            page_size: Self::DEFAULT_PAGE_SIZE,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
pub fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

impl Config {
    const DEFAULT_BASE_URL: &str = "http://localhost:8080";
    const DEFAULT_PAGE_SIZE: u32 = 20;
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Initializes a config file at the given path with default contents.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        // Atomic write to avoid a torn config on interruption.
        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })
    }

    /// Resolves the effective base URL with precedence: env > config.
    ///
    /// `AGORA_BASE_URL` overrides the config file value. Trailing slashes
    /// are stripped so path joining stays predictable.
    ///
    /// # Errors
    /// Returns an error if the resolved URL is not well-formed.
    pub fn resolve_base_url(&self) -> Result<String> {
        let raw = match std::env::var("AGORA_BASE_URL") {
            Ok(env_url) if !env_url.trim().is_empty() => env_url.trim().to_string(),
            _ => self.base_url.trim().to_string(),
        };
        url::Url::parse(&raw).with_context(|| format!("Invalid base URL: {raw}"))?;
        Ok(raw.trim_end_matches('/').to_string())
    }
}

pub mod paths {
    //! Path resolution for agora configuration and session data.
    //!
    //! AGORA_HOME resolution order:
    //! 1. AGORA_HOME environment variable (if set)
    //! 2. ~/.config/agora (default)

    use std::path::PathBuf;

    /// Returns the agora home directory.
    ///
    /// Checks AGORA_HOME env var first, falls back to ~/.config/agora
    pub fn agora_home() -> PathBuf {
        if let Ok(home) = std::env::var("AGORA_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("agora"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        agora_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        agora_home().join("session.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"https://boards.example.com\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url, "https://boards.example.com");
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = [not toml").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(config.base_url, Config::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_init_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# existing\n").unwrap();

        let err = Config::init(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_init_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::init(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("base_url"));
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let config = Config {
            base_url: "http://localhost:9090/".to_string(),
            ..Config::default()
        };
        // Note: env override is exercised at the CLI layer; avoid mutating
        // process env in unit tests.
        assert_eq!(config.resolve_base_url().unwrap(), "http://localhost:9090");
    }
}
