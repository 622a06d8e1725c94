//! Configuration Management
//!
//! Handles persistent configuration storage for aznuke.

use crate::azure::client::{DEFAULT_MANAGEMENT_ENDPOINT, DEFAULT_POLL_INTERVAL};
use crate::engine::DEFAULT_SIMULATED_DELAY;
use crate::resource::filter::DEFAULT_EXCLUSIONS_FILE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the ARM endpoint
pub const MANAGEMENT_ENDPOINT_ENV: &str = "AZURE_MANAGEMENT_ENDPOINT";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Exclusion rules file used when `--config` is not given
    #[serde(default)]
    pub exclusions_path: Option<PathBuf>,
    /// Subscriptions `delete` never touches
    #[serde(default)]
    pub protected_subscriptions: Vec<String>,
    #[serde(default)]
    pub management_endpoint: Option<String>,
    /// Pause per simulated call during a dry run
    #[serde(default)]
    pub simulated_delay_ms: Option<u64>,
    /// Fallback interval between long-running operation polls
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

impl Config {
    /// Directory holding the config file, the log and the default exclusions
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("aznuke"))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a specific file, falling back to defaults when it is
    /// missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective exclusions file (CLI > config > default name)
    pub fn effective_exclusions(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.exclusions_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXCLUSIONS_FILE))
    }

    /// Get effective ARM endpoint (CLI > environment > config > public cloud)
    pub fn effective_endpoint(&self, cli: Option<&str>) -> String {
        self.resolve_endpoint(cli, std::env::var(MANAGEMENT_ENDPOINT_ENV).ok())
    }

    fn resolve_endpoint(&self, cli: Option<&str>, env: Option<String>) -> String {
        cli.map(str::to_string)
            .or(env.filter(|v| !v.trim().is_empty()))
            .or_else(|| self.management_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_MANAGEMENT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn effective_simulated_delay(&self) -> Duration {
        self.simulated_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SIMULATED_DELAY)
    }

    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    /// Configured protected subscriptions plus the ones given on the command line
    pub fn effective_protected(&self, cli: &[String]) -> Vec<String> {
        let mut protected = self.protected_subscriptions.clone();
        for id in cli {
            if !protected.iter().any(|p| p.eq_ignore_ascii_case(id)) {
                protected.push(id.clone());
            }
        }
        protected
    }

    /// Add a protected subscription. Returns false if it was already there.
    pub fn protect(&mut self, subscription_id: &str) -> bool {
        if self
            .protected_subscriptions
            .iter()
            .any(|p| p.eq_ignore_ascii_case(subscription_id))
        {
            return false;
        }
        self.protected_subscriptions.push(subscription_id.to_string());
        true
    }

    /// Remove a protected subscription. Returns false if it was not there.
    pub fn unprotect(&mut self, subscription_id: &str) -> bool {
        let before = self.protected_subscriptions.len();
        self.protected_subscriptions
            .retain(|p| !p.eq_ignore_ascii_case(subscription_id));
        self.protected_subscriptions.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config {
            exclusions_path: Some(PathBuf::from("/etc/aznuke/keep.yaml")),
            simulated_delay_ms: Some(0),
            ..Config::default()
        };
        config.protect("prod-sub");

        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_missing_or_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load_from(&dir.path().join("nope.json")), Config::default());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert_eq!(Config::load_from(&bad), Config::default());
    }

    #[test]
    fn test_endpoint_precedence() {
        let config = Config {
            management_endpoint: Some("https://config.example/".to_string()),
            ..Config::default()
        };

        assert_eq!(
            config.resolve_endpoint(Some("https://cli.example"), Some("https://env.example".into())),
            "https://cli.example"
        );
        assert_eq!(
            config.resolve_endpoint(None, Some("https://env.example".into())),
            "https://env.example"
        );
        assert_eq!(config.resolve_endpoint(None, Some("  ".into())), "https://config.example");
        assert_eq!(
            Config::default().resolve_endpoint(None, None),
            DEFAULT_MANAGEMENT_ENDPOINT
        );
    }

    #[test]
    fn test_exclusions_precedence() {
        let config = Config {
            exclusions_path: Some(PathBuf::from("from-config.yaml")),
            ..Config::default()
        };
        assert_eq!(
            config.effective_exclusions(Some(Path::new("cli.yaml"))),
            PathBuf::from("cli.yaml")
        );
        assert_eq!(config.effective_exclusions(None), PathBuf::from("from-config.yaml"));
        assert_eq!(
            Config::default().effective_exclusions(None),
            PathBuf::from(DEFAULT_EXCLUSIONS_FILE)
        );
    }

    #[test]
    fn test_protect_and_unprotect() {
        let mut config = Config::default();
        assert!(config.protect("A"));
        assert!(!config.protect("a"));
        assert_eq!(
            config.effective_protected(&["a".to_string(), "b".to_string()]),
            vec!["A".to_string(), "b".to_string()]
        );
        assert!(config.unprotect("a"));
        assert!(!config.unprotect("a"));
        assert!(config.protected_subscriptions.is_empty());
    }
}
