use std::path::Path;

use crate::error::ForecastError;
use crate::models::RegionForecast;

/// Write a forecast series to a JSON file.
pub fn write_forecasts_json(
    forecasts: &[RegionForecast],
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), ForecastError> {
    let content = if pretty {
        serde_json::to_string_pretty(forecasts)?
    } else {
        serde_json::to_string(forecasts)?
    };
    std::fs::write(path.as_ref(), content)?;
    Ok(())
}
