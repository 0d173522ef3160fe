use std::path::PathBuf;

use thiserror::Error;

use crate::forecast::{MAX_YEAR, MIN_YEAR};

/// Errors that can occur while loading reference data or producing a forecast.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Please enter a county name")]
    EmptyRegion,

    #[error("Year {0} is outside the supported range {min}-{max}", min = MIN_YEAR, max = MAX_YEAR)]
    YearOutOfRange(i32),

    #[error("County '{0}' not found")]
    RegionNotFound(String),

    /// The expression text is kept for operator logs and is never part of the
    /// displayed message.
    #[error("Could not evaluate equations for this county")]
    ModelEvaluationFailed { expression: String, reason: String },

    #[error("Missing reference data: {}", .0.display())]
    ConfigurationMissing(PathBuf),
}

impl From<calamine::Error> for ForecastError {
    fn from(e: calamine::Error) -> Self {
        ForecastError::Excel(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ForecastError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ForecastError::Excel(e.to_string())
    }
}

impl ForecastError {
    /// True for failures caused by a single request's input or model row, as
    /// opposed to I/O or configuration problems.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ForecastError::EmptyRegion
                | ForecastError::YearOutOfRange(_)
                | ForecastError::RegionNotFound(_)
                | ForecastError::ModelEvaluationFailed { .. }
        )
    }
}
