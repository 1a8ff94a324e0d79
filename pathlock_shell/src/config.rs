//! # Lock Configuration File
//!
//! Optional TOML file holding a default safety level, bundles and rules:
//!
//! ```toml
//! safety = "only-available"
//! bundles = ["shared", "stdio"]
//! rules = ["d:rw:/tmp", "f:x:/bin/cat"]
//! ```
//!
//! Unknown keys are rejected so a misspelt key cannot silently widen or
//! narrow a lock.

use anyhow::{Context, Result};
use pathlock::{Bundle, PathRule, Safety};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub safety: Option<String>,
    #[serde(default)]
    pub bundles: Vec<String>,
    #[serde(default)]
    pub rules: Vec<String>,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid pathlock config")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    /// `config.toml` in the user's config directory.
    pub fn default_path() -> Option<PathBuf> {
        crate::logging::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load `explicit` if given (it must exist), else `default` if it exists,
    /// else an empty config.
    pub fn resolve(explicit: Option<&Path>, default: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        match default {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading default config");
                Self::load_from_file(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn safety(&self) -> Result<Option<Safety>> {
        self.safety
            .as_deref()
            .map(|s| s.parse::<Safety>())
            .transpose()
            .context("invalid safety in config")
    }

    pub fn path_rules(&self) -> Result<Vec<PathRule>> {
        self.rules
            .iter()
            .map(|rule| {
                rule.parse::<PathRule>()
                    .with_context(|| format!("invalid rule '{rule}' in config"))
            })
            .collect()
    }

    pub fn bundles(&self) -> Result<Vec<Bundle>> {
        self.bundles
            .iter()
            .map(|name| name.parse::<Bundle>().context("invalid bundle in config"))
            .collect()
    }
}
