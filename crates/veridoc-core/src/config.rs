//! Configuration for verification runs
//!
//! Loaded from a TOML file (`veridoc.toml` by convention). Every field has a
//! default so an empty file is a valid configuration; portal credentials are
//! the only settings with no usable default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, VeridocError};

/// Run-level configuration shared by the dispatcher and the adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VeridocConfig {
    /// Base delay budget in milliseconds for post-submit outcome waits.
    /// Individual portals may extend this (the gov.kr viewer is slower).
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Run Chrome headless
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Browser window size
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Size of concurrent verification groups (clamped to at least 1).
    /// Kept small so neither the browser host nor the portals are flooded.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Chamber-of-commerce portal login (required by that adapter only)
    #[serde(default)]
    pub korcham: Option<PortalLogin>,

    /// Requester identity demanded by the data-industry portal's form
    #[serde(default)]
    pub requester: RequesterInfo,
}

/// Username/password pair for portals gated behind a member login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalLogin {
    pub id: String,
    pub password: String,
}

/// Organization identity filled into portals that ask who is checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequesterInfo {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub phone: String,
}

impl Default for RequesterInfo {
    fn default() -> Self {
        Self {
            organization: String::new(),
            contact_name: String::new(),
            phone: String::new(),
        }
    }
}

impl Default for VeridocConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            concurrency: default_concurrency(),
            korcham: None,
            requester: RequesterInfo::default(),
        }
    }
}

impl VeridocConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| VeridocError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Effective concurrency, never zero.
    pub fn worker_group_size(&self) -> usize {
        self.concurrency.max(1)
    }
}

fn default_delay_ms() -> u64 {
    3000
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_concurrency() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = VeridocConfig::default();
        assert_eq!(config.delay_ms, 3000);
        assert!(config.headless);
        assert_eq!(config.worker_group_size(), 3);
        assert!(config.korcham.is_none());
    }

    #[test]
    fn test_empty_file_is_valid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "").unwrap();
        let config = VeridocConfig::load(file.path()).unwrap();
        assert_eq!(config.delay_ms, 3000);
    }

    #[test]
    fn test_load_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
delay_ms = 500
concurrency = 0

[korcham]
id = "member"
password = "secret"
"#
        )
        .unwrap();
        let config = VeridocConfig::load(file.path()).unwrap();
        assert_eq!(config.delay_ms, 500);
        // zero is clamped at the point of use
        assert_eq!(config.worker_group_size(), 1);
        assert_eq!(config.korcham.unwrap().id, "member");
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "delay_ms = \"not a number\"").unwrap();
        assert!(matches!(
            VeridocConfig::load(file.path()),
            Err(VeridocError::Config(_))
        ));
    }
}
