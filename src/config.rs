//! Settings for talking to the control plane.
//!
//! # Resolution
//!
//! Later sources override earlier ones:
//! 1. Built-in defaults
//! 2. Settings file: `$ECDEPLOY_CONFIG`, else `$XDG_CONFIG_HOME/ecdeploy/config.toml`,
//!    else `~/.config/ecdeploy/config.toml`
//! 3. Environment: `EC_API_ENDPOINT`, `EC_API_KEY`
//! 4. Command-line flags
//!
//! Environment and flags are merged by clap before they reach
//! [`Settings::with_overrides`].

use anyhow::{Context, Result};
use cloudapi::backend::http::DEFAULT_API_BASE;
use cloudapi::{PollConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable for the settings file location
pub const ENV_CONFIG: &str = "ECDEPLOY_CONFIG";

const APP_DIR: &str = "ecdeploy";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub api_endpoint: String,
    pub api_key: Option<String>,
    /// Overall bound for waiting on a change
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Extra attempts for a failed read while polling
    pub max_retries: u32,
    /// Delay after the first failed read; later retries wait longer linearly
    pub retry_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_BASE.to_string(),
            api_key: None,
            timeout_secs: 40 * 60,
            poll_interval_secs: 10,
            max_retries: 3,
            retry_delay_ms: 2000,
        }
    }
}

impl Settings {
    /// Load from the settings file if there is one, else defaults.
    pub fn load() -> Result<Self> {
        match settings_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                log::debug!("No settings file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse a settings file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply environment and command-line values.
    pub fn with_overrides(
        mut self,
        api_endpoint: Option<String>,
        api_key: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        if let Some(endpoint) = api_endpoint.filter(|e| !e.is_empty()) {
            self.api_endpoint = endpoint;
        }
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(timeout) = timeout_secs {
            self.timeout_secs = timeout;
        }
        self
    }

    /// Timing policy for the poller.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            retry: RetryConfig {
                max_attempts: self.max_retries.saturating_add(1),
                base_delay: Duration::from_millis(self.retry_delay_ms),
                ..RetryConfig::default()
            },
        }
    }
}

/// Location of the settings file, whether or not it exists.
pub fn settings_path() -> Option<PathBuf> {
    resolve_settings_path(
        std::env::var(ENV_CONFIG).ok().as_deref(),
        std::env::var("XDG_CONFIG_HOME").ok().as_deref(),
        dirs::home_dir(),
    )
}

fn resolve_settings_path(
    explicit: Option<&str>,
    xdg_config_home: Option<&str>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(shellexpand::tilde(path).as_ref()));
    }
    if let Some(xdg) = xdg_config_home.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(xdg).join(APP_DIR).join(CONFIG_FILE));
    }
    home.map(|home| home.join(".config").join(APP_DIR).join(CONFIG_FILE))
}

// ============================================================================
// Tests
// ============================================================================
