// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine configuration.
//!
//! Supports both programmatic and file-based (TOML) configuration.
//!
//! ```toml
//! scanning_enabled = true
//! mapping_path = "mappings.srg"
//! resource_roots = ["assets", "/opt/game/resources"]
//! scheduler_name = "unicore"
//!
//! [exclusions]
//! packages = ["jdk", "com.sun", "*.mixin.*"]
//! markers = ["mixin"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnicoreConfig {
    /// Master switch for type scanning. When off, every index read is empty.
    #[serde(default = "default_true")]
    pub scanning_enabled: bool,

    /// Mapping resource, resolved against `resource_roots`.
    /// `None` (an empty string in TOML) disables mapping data entirely.
    #[serde(default = "default_mapping_path", with = "optional_path")]
    pub mapping_path: Option<PathBuf>,

    /// Directories searched in order for relative resource paths.
    /// Empty means the current working directory.
    #[serde(default)]
    pub resource_roots: Vec<PathBuf>,

    /// Name of the scheduler used for background scans.
    #[serde(default = "default_scheduler_name")]
    pub scheduler_name: String,

    /// Types skipped during a scan.
    #[serde(default)]
    pub exclusions: ExclusionConfig,
}

/// Packages and name markers excluded from the type index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionConfig {
    /// Package globs (`*` and `?` wildcards). A pattern also covers its
    /// sub-packages, so `jdk` excludes `jdk.internal.misc`.
    #[serde(default = "default_excluded_packages")]
    pub packages: Vec<String>,

    /// Case-insensitive substrings marking injected/patched types.
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_mapping_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_MAPPING_PATH))
}

fn default_scheduler_name() -> String {
    DEFAULT_SCHEDULER_NAME.to_string()
}

fn default_excluded_packages() -> Vec<String> {
    DEFAULT_EXCLUDED_PACKAGES
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_markers() -> Vec<String> {
    vec!["mixin".to_string()]
}

/// Default mapping resource name.
pub const DEFAULT_MAPPING_PATH: &str = "mappings.srg";

/// Default scheduler name for background scans.
pub const DEFAULT_SCHEDULER_NAME: &str = "unicore";

/// Runtime internals and vendor shims that only add noise to the index.
pub const DEFAULT_EXCLUDED_PACKAGES: &[&str] = &[
    "net.java",
    "com.sun",
    "com.jcraft",
    "com.intellij",
    "jdk",
    "akka",
    "ibxm",
    "scala",
    "*.mixin.*",
    "*.mixins.*",
    "*.jetty.*",
];

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            packages: default_excluded_packages(),
            markers: default_markers(),
        }
    }
}

impl ExclusionConfig {
    /// No exclusions at all.
    pub fn none() -> Self {
        Self {
            packages: Vec::new(),
            markers: Vec::new(),
        }
    }
}

impl Default for UnicoreConfig {
    fn default() -> Self {
        Self {
            scanning_enabled: true,
            mapping_path: default_mapping_path(),
            resource_roots: Vec::new(),
            scheduler_name: default_scheduler_name(),
            exclusions: ExclusionConfig::default(),
        }
    }
}

impl UnicoreConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Configuration with no mapping resource and no exclusions.
    ///
    /// Handy for embedding and for tests that supply their own data.
    pub fn bare() -> Self {
        Self {
            mapping_path: None,
            exclusions: ExclusionConfig::none(),
            ..Default::default()
        }
    }

    /// Set the mapping resource path.
    pub fn mapping_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mapping_path = Some(path.into());
        self
    }

    /// Append a resource search root.
    pub fn resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_roots.push(root.into());
        self
    }

    /// Enable or disable scanning.
    pub fn scanning_enabled(mut self, enabled: bool) -> Self {
        self.scanning_enabled = enabled;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler_name.trim().is_empty() {
            return Err(ConfigError::Invalid("scheduler_name is empty".into()));
        }

        for (i, pattern) in self.exclusions.packages.iter().enumerate() {
            if pattern.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "exclusions.packages[{}] is empty",
                    i
                )));
            }
        }

        for (i, marker) in self.exclusions.markers.iter().enumerate() {
            if marker.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "exclusions.markers[{}] is empty",
                    i
                )));
            }
        }

        Ok(())
    }
}

/// TOML has no null, so a disabled mapping path is spelled `""`.
mod optional_path {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::path::PathBuf;

    pub fn serialize<S: Serializer>(path: &Option<PathBuf>, ser: S) -> Result<S::Ok, S::Error> {
        match path {
            Some(p) => ser.serialize_str(&p.to_string_lossy()),
            None => ser.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<PathBuf>, D::Error> {
        let raw = String::deserialize(de)?;
        if raw.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(raw)))
        }
    }
}
