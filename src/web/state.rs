use std::path::PathBuf;

use crate::config::DataConfig;
use crate::error::ForecastError;
use crate::models::ReferenceTables;

/// Shared, read-only server state. Loaded once before the server binds.
pub struct AppState {
    pub tables: ReferenceTables,
    pub charts_dir: PathBuf,
    pub maps_dir: PathBuf,
}

impl AppState {
    pub fn new(tables: ReferenceTables, data: &DataConfig) -> Self {
        Self {
            tables,
            charts_dir: data.charts_dir.clone(),
            maps_dir: data.maps_dir.clone(),
        }
    }

    /// Load both reference tables named by `data`.
    pub fn load(data: &DataConfig) -> Result<Self, ForecastError> {
        let tables = ReferenceTables::load(&data.equations, &data.infrastructure_summary)?;
        Ok(Self::new(tables, data))
    }
}
