//! Session configuration
//!
//! Read from JSON with per-field defaults, then overridden by command-line
//! flags, then validated.

use crate::error::{LabError, LabResult};
use crate::request::MAX_WHOLE;
use crate::runtime::DEFAULT_SEED;
use crate::style::{default_dpi, validate_dpi, Context, GridStyle, Palette, StyleOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabConfig {
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub context: Context,
    #[serde(default)]
    pub grid: GridStyle,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default = "default_dpi")]
    pub export_dpi: u32,
    #[serde(default = "default_seed")]
    pub sample_seed: u64,
    /// None keeps every saved chart
    #[serde(default)]
    pub gallery_capacity: Option<usize>,
    /// Extra CSV files served next to the built-in datasets
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            context: Context::default(),
            grid: GridStyle::default(),
            dark_mode: false,
            export_dpi: default_dpi(),
            sample_seed: default_seed(),
            gallery_capacity: None,
            data_dir: None,
        }
    }
}

impl LabConfig {
    pub fn from_json_str(text: &str) -> LabResult<Self> {
        let config: LabConfig =
            serde_json::from_str(text).map_err(|err| LabError::config("config", err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> LabResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> LabResult<()> {
        validate_dpi(self.export_dpi)?;
        if self.gallery_capacity == Some(0) {
            return Err(LabError::config("gallery_capacity", "must be at least 1 when set"));
        }
        // listings carry the seed as a number literal
        if self.sample_seed > MAX_WHOLE {
            return Err(LabError::config("sample_seed", format!("must be at most {}", MAX_WHOLE)));
        }
        Ok(())
    }

    /// Style applied to every render of the session
    pub fn style(&self) -> StyleOptions {
        StyleOptions {
            palette: self.palette,
            context: self.context,
            grid: self.grid,
            dark_mode: self.dark_mode,
            dpi: self.export_dpi,
        }
    }

    pub fn set_style(&mut self, style: &StyleOptions) {
        self.palette = style.palette;
        self.context = style.context;
        self.grid = style.grid;
        self.dark_mode = style.dark_mode;
        self.export_dpi = style.dpi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = LabConfig::from_json_str("{}").unwrap();
        assert_eq!(config, LabConfig::default());
        assert_eq!(config.export_dpi, 300);
        assert_eq!(config.sample_seed, 42);
        assert_eq!(config.style(), StyleOptions::default());
    }

    #[test]
    fn test_partial_config() {
        let config = LabConfig::from_json_str(
            r#"{"palette": "Set2", "context": "poster", "grid": "ticks", "dark_mode": true, "gallery_capacity": 5}"#,
        )
        .unwrap();
        assert_eq!(config.palette, Palette::Set2);
        assert_eq!(config.context, Context::Poster);
        assert_eq!(config.grid, GridStyle::Ticks);
        assert!(config.dark_mode);
        assert_eq!(config.gallery_capacity, Some(5));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(LabConfig::from_json_str(r#"{"export_dpi": 1200}"#).unwrap_err().is_configuration());
        assert!(LabConfig::from_json_str(r#"{"gallery_capacity": 0}"#).is_err());
        assert!(LabConfig::from_json_str(r#"{"palette": "neon"}"#).is_err());
        assert!(LabConfig::from_json_str(r#"{"colour": "red"}"#).is_err());
    }
}
