//! Configuration for structured-data tooling
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (structured-data.toml)
//! - Environment variables (SD__*)
//!
//! ## Example config file (structured-data.toml):
//! ```toml
//! [validation]
//! date_year_window = 10
//!
//! [output]
//! format = "pretty"
//!
//! [reconcile]
//! drop_unknown_fields = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::node::TextRules;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SdConfig {
    /// Text validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Payload loading and migration settings
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Accepted distance, in years, between a date value and the current year
    #[serde(default = "default_year_window")]
    pub date_year_window: i32,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn is_pretty(self) -> bool {
        self == OutputFormat::Pretty
    }
}

/// Reconcile configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Drop payload nodes the data definition no longer declares instead
    /// of rejecting the payload
    #[serde(default)]
    pub drop_unknown_fields: bool,
}

fn default_year_window() -> i32 {
    TextRules::default().date_year_window
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            date_year_window: default_year_window(),
        }
    }
}

impl SdConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "structured-data.toml",
            ".structured-data.toml",
            "config/structured-data.toml",
        ];
        for location in config_locations {
            builder = builder.add_source(File::from(Path::new(location)).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "cascade", "structured-data") {
            let xdg_config = dirs.config_dir().join("structured-data.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // SD__VALIDATION__DATE_YEAR_WINDOW=5
        builder = builder.add_source(
            Environment::with_prefix("SD")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Validation rules for trees built under this configuration
    pub fn text_rules(&self) -> TextRules {
        TextRules {
            date_year_window: self.validation.date_year_window,
            ..TextRules::default()
        }
    }
}
