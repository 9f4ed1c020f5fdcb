//! Configuration module.
//!
//! Handles loading and validating `rasterkit.toml`. Every key is optional;
//! missing keys take the stock defaults and unknown keys are rejected to catch
//! typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! driver = "rust"              # Raster driver ("rust", alias "image")
//! image_directory = "upload"   # Default save directory
//!
//! [output]
//! quality = 100                # JPEG quality, clamped to 1-100
//!
//! [watermark]
//! opacity = 100                # Watermark opacity, clamped to 1-100
//! ```
//!
//! Quality and opacity are never rejected: like every other numeric input
//! they are clamped at the point of use.

use crate::imaging::{DEFAULT_IMAGE_DIRECTORY, Driver};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "rasterkit.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `rasterkit.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RasterConfig {
    /// Name of the raster driver.
    pub driver: String,
    /// Where images are saved when no directory is given.
    pub image_directory: PathBuf,
    pub output: OutputConfig,
    pub watermark: WatermarkConfig,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            driver: "rust".to_string(),
            image_directory: PathBuf::from(DEFAULT_IMAGE_DIRECTORY),
            output: OutputConfig::default(),
            watermark: WatermarkConfig::default(),
        }
    }
}

impl RasterConfig {
    /// Reject values that cannot be corrected by clamping.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.parse::<Driver>().is_err() {
            return Err(ConfigError::Validation(format!(
                "unknown driver '{}'",
                self.driver
            )));
        }
        if self.image_directory.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "image_directory must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub quality: i64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { quality: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    pub opacity: i64,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self { opacity: 100 }
    }
}

// =============================================================================
// Config loading
// =============================================================================

/// Parse and validate a config file.
pub fn load_config(path: &Path) -> Result<RasterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: RasterConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load `rasterkit.toml` from `dir`, or the defaults if there is none.
pub fn load_config_or_default(dir: &Path) -> Result<RasterConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(RasterConfig::default());
    }
    load_config(&path)
}

/// Returns a fully-commented stock `rasterkit.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# rasterkit configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Raster driver. "rust" (alias "image") is the pure Rust backend.
driver = "rust"

# Directory images are saved into when no directory is given.
# Must exist and be writable at save time.
image_directory = "upload"

[output]
# JPEG quality. Out-of-range values are clamped to 1-100.
# PNG always uses maximum (lossless) compression; GIF has no quality.
quality = 100

[watermark]
# Watermark opacity. Out-of-range values are clamped to 1-100.
opacity = 100
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = RasterConfig::default();
        assert_eq!(config.driver, "rust");
        assert_eq!(config.image_directory, PathBuf::from("upload"));
        assert_eq!(config.output.quality, 100);
        assert_eq!(config.watermark.opacity, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
image_directory = "out"

[output]
quality = 80
"#;
        let config: RasterConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.image_directory, PathBuf::from("out"));
        assert_eq!(config.output.quality, 80);
        // Unspecified defaults preserved
        assert_eq!(config.driver, "rust");
        assert_eq!(config.watermark.opacity, 100);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<RasterConfig, _> = toml::from_str("image_dirctory = \"x\"");
        assert!(result.is_err());

        let result: Result<RasterConfig, _> = toml::from_str("[output]\ncompression = 9");
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_numbers_are_accepted() {
        let config: RasterConfig =
            toml::from_str("[output]\nquality = 500\n[watermark]\nopacity = -3").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_driver() {
        let config = RasterConfig {
            driver: "imagick".into(),
            ..RasterConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_empty_directory() {
        let config = RasterConfig {
            image_directory: PathBuf::new(),
            ..RasterConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_or_default_without_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_or_default(tmp.path()).unwrap();
        assert_eq!(config, RasterConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "driver = \"image\"\n[watermark]\nopacity = 40\n",
        )
        .unwrap();

        let config = load_config_or_default(tmp.path()).unwrap();
        assert_eq!(config.driver, "image");
        assert_eq!(config.watermark.opacity, 40);
    }

    #[test]
    fn load_config_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(&tmp.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "this is not valid toml [[[").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "driver = \"gd\"").unwrap();

        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: RasterConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, RasterConfig::default());
    }
}
