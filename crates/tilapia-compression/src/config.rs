//! Configuration for compression middleware

use crate::policy::ContentTypePolicy;
use crate::types::CompressionOptions;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tilapia_core::{Error, Result};

/// Environment variable holding the global on/off switch
pub const ENABLED_ENV_VAR: &str = "COMPRESSION_ENABLED";

/// Compression configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Enable compression
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Options handed to the engine
    #[serde(default)]
    pub options: CompressionOptions,

    /// Minimum serialized response size the buffered path will consider (in bytes)
    #[serde(default = "default_min_response_size")]
    pub min_response_size: usize,

    /// A result is applied only when its ratio is below this value
    #[serde(default = "default_max_ratio")]
    pub max_ratio: f64,

    /// Which content types are compressed
    #[serde(default)]
    pub content_types: ContentTypePolicy,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            options: CompressionOptions::default(),
            min_response_size: default_min_response_size(),
            max_ratio: default_max_ratio(),
            content_types: ContentTypePolicy::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_min_response_size() -> usize {
    1024
}

fn default_max_ratio() -> f64 {
    0.9
}

/// Interpret the raw value of [`ENABLED_ENV_VAR`].
///
/// Anything other than the literal `false`, including an unset variable,
/// enables compression.
pub fn enabled_from_value(value: Option<&str>) -> bool {
    value != Some("false")
}

impl CompressionConfig {
    /// Default configuration with the switch read from the environment
    pub fn from_env() -> Self {
        Self::default().with_env_override()
    }

    /// Apply the environment switch on top of this configuration
    pub fn with_env_override(mut self) -> Self {
        self.enabled = enabled_from_value(env::var(ENABLED_ENV_VAR).ok().as_deref());
        self
    }

    /// Disabled configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        self.options.validate()?;
        if !(self.max_ratio > 0.0 && self.max_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "max_ratio must be in (0, 1], got {}",
                self.max_ratio
            )));
        }
        Ok(())
    }

    /// Load configuration from a file, picking the format from its extension
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

        Self::load_from_str(&content, ConfigFormat::from_path(path)?)
    }

    /// Load configuration from a string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Self> {
        let expanded = expand_env_vars(content)?;

        let config: Self = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(&expanded)
                .map_err(|e| Error::Config(format!("Failed to parse YAML: {e}")))?,
            ConfigFormat::Toml => toml::from_str(&expanded)
                .map_err(|e| Error::Config(format!("Failed to parse TOML: {e}")))?,
            ConfigFormat::Json => serde_json::from_str(&expanded)
                .map_err(|e| Error::Config(format!("Failed to parse JSON: {e}")))?,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML
    Yaml,
    /// TOML
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Detect format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            other => Err(Error::Config(format!(
                "Unsupported config file extension: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references
fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| Error::Config(format!("Invalid regex: {e}")))?;

    let mut result = String::with_capacity(content.len());
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let default_value = cap.get(3).map(|m| m.as_str());

        let value = match (env::var(var_name.as_str()), default_value) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => default.to_string(),
            (Err(_), None) => {
                return Err(Error::Config(format!(
                    "Environment variable '{}' not set and no default provided",
                    var_name.as_str()
                )));
            }
        };

        result.push_str(&content[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&content[last_match..]);
    Ok(result)
}
