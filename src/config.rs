use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::controller::{ControllerOptions, SessionPolicy};
use crate::auth::providers::MockVerifierConfig;
use crate::auth::storage::DEFAULT_STORAGE_KEY;
use crate::common::retry::RetryPolicy;

// Default configuration values
const DEFAULT_STORE_PATH: &str = "relatara.storage.json";
const DEFAULT_VERIFIER_DELAY_MS: u64 = 1000;
const DEFAULT_PERSIST_ATTEMPTS: usize = 2;
const PERSIST_RETRY_BASE_MS: u64 = 100;
const PERSIST_RETRY_MAX_MS: u64 = 2000;

// Environment variables that override file settings
pub const ENV_STORE_PATH: &str = "RELATARA_STORE_PATH";
pub const ENV_STORE_KEY: &str = "RELATARA_STORE_KEY";
pub const ENV_VERIFIER_DELAY_MS: &str = "RELATARA_VERIFIER_DELAY_MS";
pub const ENV_SESSION_POLICY: &str = "RELATARA_SESSION_POLICY";
pub const ENV_PERSIST_ATTEMPTS: &str = "RELATARA_PERSIST_ATTEMPTS";

/// Main configuration for the session core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Where the session record lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key-value JSON file holding the record
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Key of the record inside the file
    #[serde(default = "default_store_key")]
    pub key: String,
}

/// Mock identity provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Simulated latency in milliseconds
    #[serde(default = "default_verifier_delay")]
    pub delay_ms: u64,
    /// Passwords the verifier always rejects
    #[serde(default)]
    pub rejected_passwords: Vec<String>,
    /// Whether "Continue with Google" succeeds
    #[serde(default = "default_true")]
    pub provider_enabled: bool,
}

/// Lifecycle controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Handling of overlapping operations
    #[serde(default)]
    pub policy: SessionPolicy,
    /// Attempts for each record write or removal
    #[serde(default = "default_persist_attempts")]
    pub persist_attempts: usize,
}

// Default functions
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

fn default_store_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_verifier_delay() -> u64 {
    DEFAULT_VERIFIER_DELAY_MS
}

fn default_true() -> bool {
    true
}

fn default_persist_attempts() -> usize {
    DEFAULT_PERSIST_ATTEMPTS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            key: default_store_key(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_verifier_delay(),
            rejected_passwords: Vec::new(),
            provider_enabled: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: SessionPolicy::default(),
            persist_attempts: default_persist_attempts(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file (defaults when it does not exist), then apply
    /// environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a JSON file without looking at the environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse configuration in {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Check values serde cannot rule out on its own
    pub fn validate(&self) -> Result<()> {
        if self.storage.key.trim().is_empty() {
            return Err(anyhow!("storage.key must not be empty"));
        }
        if self.session.persist_attempts == 0 {
            return Err(anyhow!("session.persist_attempts must be at least 1"));
        }
        Ok(())
    }

    /// Apply overrides from a variable lookup such as `std::env::var`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_STORE_PATH) {
            self.storage.path = PathBuf::from(path);
        }

        if let Some(key) = lookup(ENV_STORE_KEY) {
            if key.trim().is_empty() {
                return Err(anyhow!("{} must not be empty", ENV_STORE_KEY));
            }
            self.storage.key = key;
        }

        if let Some(delay) = lookup(ENV_VERIFIER_DELAY_MS) {
            self.verifier.delay_ms = delay.trim().parse().map_err(|e| {
                anyhow!("Invalid {} value '{}': {}", ENV_VERIFIER_DELAY_MS, delay, e)
            })?;
        }

        if let Some(policy) = lookup(ENV_SESSION_POLICY) {
            self.session.policy = match policy.trim().to_ascii_lowercase().as_str() {
                "queue" => SessionPolicy::Queue,
                "reject" => SessionPolicy::Reject,
                other => {
                    return Err(anyhow!(
                        "Invalid {} value '{}': expected 'queue' or 'reject'",
                        ENV_SESSION_POLICY,
                        other
                    ))
                }
            };
        }

        if let Some(attempts) = lookup(ENV_PERSIST_ATTEMPTS) {
            let attempts: usize = attempts.trim().parse().map_err(|e| {
                anyhow!("Invalid {} value '{}': {}", ENV_PERSIST_ATTEMPTS, attempts, e)
            })?;
            if attempts == 0 {
                return Err(anyhow!("{} must be at least 1", ENV_PERSIST_ATTEMPTS));
            }
            self.session.persist_attempts = attempts;
        }

        Ok(())
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            policy: self.session.policy,
            persist_retry: RetryPolicy::exponential(
                self.session.persist_attempts,
                Duration::from_millis(PERSIST_RETRY_BASE_MS),
                Duration::from_millis(PERSIST_RETRY_MAX_MS),
            ),
        }
    }

    pub fn verifier_config(&self) -> MockVerifierConfig {
        MockVerifierConfig {
            delay: Duration::from_millis(self.verifier.delay_ms),
            rejected_passwords: self.verifier.rejected_passwords.clone(),
            provider_enabled: self.verifier.provider_enabled,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.storage.path, PathBuf::from(DEFAULT_STORE_PATH));
        assert_eq!(config.storage.key, "relatara_user");
        assert_eq!(config.verifier.delay_ms, 1000);
        assert!(config.verifier.provider_enabled);
        assert_eq!(config.session.policy, SessionPolicy::Queue);
        assert_eq!(config.controller_options().persist_retry.max_attempts, 2);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relatara.json");
        std::fs::write(
            &path,
            r#"{"session":{"policy":"reject"},"verifier":{"rejected_passwords":["hunter2"]}}"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.session.policy, SessionPolicy::Reject);
        assert_eq!(config.session.persist_attempts, 2);
        assert_eq!(config.verifier.rejected_passwords, vec!["hunter2".to_string()]);
        assert_eq!(config.verifier.delay_ms, 1000);
        assert_eq!(config.storage.key, "relatara_user");
    }

    #[test]
    fn test_missing_file_is_default_and_bad_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::from_file(dir.path().join("absent.json")).is_ok());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{").unwrap();
        assert!(AppConfig::from_file(&bad).is_err());
    }

    #[test]
    fn test_file_values_are_validated() {
        let dir = tempfile::tempdir().unwrap();

        for contents in [
            r#"{"session":{"persist_attempts":0}}"#,
            r#"{"storage":{"key":""}}"#,
        ] {
            let path = dir.path().join("relatara.json");
            std::fs::write(&path, contents).unwrap();
            assert!(AppConfig::from_file(&path).is_err(), "{}", contents);
        }

        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup(&[
                (ENV_STORE_PATH, "/tmp/session.json"),
                (ENV_VERIFIER_DELAY_MS, "0"),
                (ENV_SESSION_POLICY, "Reject"),
                (ENV_PERSIST_ATTEMPTS, "4"),
            ]))
            .unwrap();

        assert_eq!(config.storage.path, PathBuf::from("/tmp/session.json"));
        assert_eq!(config.verifier_config().delay, Duration::ZERO);
        assert_eq!(config.session.policy, SessionPolicy::Reject);
        assert_eq!(config.controller_options().persist_retry.max_attempts, 4);
    }

    #[test]
    fn test_invalid_overrides_are_errors() {
        for vars in [
            [(ENV_SESSION_POLICY, "sometimes")],
            [(ENV_VERIFIER_DELAY_MS, "soon")],
            [(ENV_PERSIST_ATTEMPTS, "0")],
            [(ENV_STORE_KEY, " ")],
        ] {
            let mut config = AppConfig::default();
            assert!(config.apply_overrides(lookup(&vars)).is_err(), "{:?}", vars);
        }
    }
}
