//! API key management.
//!
//! Loads keys from `secure_config/api_keys.env` (one `KEY=value` per
//! line), exports them into the process environment so config-declared
//! env-var references resolve, and tightens file permissions on Unix.
//! Placeholder values (`your_...`) are skipped so a template file can
//! ship in the repo without poisoning lookups.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// Default secrets file location, relative to the working directory.
pub const DEFAULT_SECRETS_FILE: &str = "secure_config/api_keys.env";

/// Loads and serves API keys.
pub struct SecretsManager {
    path: PathBuf,
}

impl SecretsManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Self {
        Self::new(DEFAULT_SECRETS_FILE)
    }

    /// Load keys from the secrets file into the process environment.
    /// Returns the number of keys loaded; a missing file is not an
    /// error (env-only operation is supported).
    pub fn load(&self) -> Result<usize> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No secrets file found, relying on process env");
            return Ok(0);
        }

        self.tighten_permissions();

        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read secrets file: {}", self.path.display()))?;

        let keys = parse_env_lines(&contents);
        for (key, value) in &keys {
            std::env::set_var(key, value);
        }

        info!(count = keys.len(), path = %self.path.display(), "API keys loaded");
        Ok(keys.len())
    }

    /// Fetch one key: process env first, then the secrets file.
    /// Placeholders count as absent.
    pub fn get(&self, key_name: &str) -> Option<SecretString> {
        if let Ok(value) = std::env::var(key_name) {
            if !is_placeholder(&value) {
                return Some(SecretString::new(value));
            }
        }

        let contents = std::fs::read_to_string(&self.path).ok()?;
        parse_env_lines(&contents)
            .remove(key_name)
            .map(SecretString::new)
    }

    /// Restrict the secrets directory and file to the owner (Unix).
    fn tighten_permissions(&self) {
        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;

            if let Some(dir) = self.path.parent() {
                if let Err(e) = std::fs::set_permissions(dir, Permissions::from_mode(0o700)) {
                    warn!(error = %e, "Could not restrict secrets directory permissions");
                }
            }
            if let Err(e) = std::fs::set_permissions(&self.path, Permissions::from_mode(0o600)) {
                warn!(error = %e, "Could not restrict secrets file permissions");
            }
        }
    }
}

/// Parse `KEY=value` lines, skipping comments, blanks, and
/// placeholder values.
fn parse_env_lines(contents: &str) -> HashMap<String, String> {
    let mut keys = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || is_placeholder(value) {
            continue;
        }
        keys.insert(key.to_string(), value.to_string());
    }
    keys
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || value.starts_with("your_") || value == "your_key_here"
}

/// Resolve an API key by the env-var name a config section declares.
/// Convenience over a default-located manager.
pub fn api_key(env_name: &str) -> Option<SecretString> {
    if env_name.is_empty() {
        return None;
    }
    SecretsManager::default_location().get(env_name)
}

/// Check whether a secrets file or env var makes a key available.
pub fn has_key(env_name: &str) -> bool {
    api_key(env_name).is_some()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
