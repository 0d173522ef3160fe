//! Runtime configuration loaded from an optional TOML file.
//!
//! ```toml
//! # ev-forecast.toml
//! [data]
//! equations = "static/data/equation.xlsx"
//! infrastructure_summary = "static/data/supercharger_by_county_summary.xlsx"
//! charts_dir = "static/charts"
//! maps_dir = "static/maps"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub server: ServerConfig,
}

/// Locations of the reference tables and image directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Per-county equation table (.xlsx or .csv)
    pub equations: PathBuf,
    /// Known charging-site counts per county, with a `Total` row
    pub infrastructure_summary: PathBuf,
    pub charts_dir: PathBuf,
    pub maps_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            equations: PathBuf::from("static/data/equation.xlsx"),
            infrastructure_summary: PathBuf::from(
                "static/data/supercharger_by_county_summary.xlsx",
            ),
            charts_dir: PathBuf::from("static/charts"),
            maps_dir: PathBuf::from("static/maps"),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ForecastError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ForecastError::ConfigurationMissing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ForecastError> {
        match path {
            Some(p) => Self::from_toml_file(p),
            None => Ok(Self::default()),
        }
    }
}
