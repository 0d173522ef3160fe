pub mod config;
pub mod error;
pub mod forecast;
pub mod io;
pub mod models;
pub mod visualization;

#[cfg(feature = "web")]
pub mod web;

pub use config::AppConfig;
pub use error::ForecastError;
pub use forecast::{evaluate, forecast_statewide, normalize, Forecaster};
pub use io::{ForecastWriter, TableReader};
pub use models::{
    ForecastRequest, ForecastResult, InfrastructureSummaryRecord, ReferenceTables, RegionForecast,
    RegionRecord,
};
