use serde::{Deserialize, Serialize};

/// Which of a region's two equations a value or issue refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquationKind {
    Infrastructure,
    Adoption,
}

impl std::fmt::Display for EquationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquationKind::Infrastructure => write!(f, "infrastructure"),
            EquationKind::Adoption => write!(f, "adoption"),
        }
    }
}

/// A single forecast request as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// Free-text region; `None` asks for the statewide forecast
    pub region: Option<String>,
    pub year: i32,
}

/// Forecast for one region and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub year: i32,
    /// Projected charging-site count
    pub infrastructure_forecast: f64,
    /// Share of the baseline population with an EV, always within [0, 1]
    pub adoption_rate: f64,
    pub projected_adopters: f64,
    /// Currently known charging-site count, when the summary table has one
    pub existing_infrastructure_count: Option<u64>,
}

/// A forecast together with the region it was matched to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionForecast {
    /// Display name from the reference table
    pub region: String,
    pub region_key: String,
    #[serde(flatten)]
    pub result: ForecastResult,
}

/// Display name used for statewide forecasts.
pub const STATEWIDE_NAME: &str = "Statewide";
pub const STATEWIDE_KEY: &str = "statewide";

impl RegionForecast {
    pub fn statewide(result: ForecastResult) -> Self {
        Self {
            region: STATEWIDE_NAME.to_string(),
            region_key: STATEWIDE_KEY.to_string(),
            result,
        }
    }
}

/// A model problem found by auditing the reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelIssue {
    pub region: String,
    /// `None` when the issue is not tied to an equation (missing population)
    pub equation: Option<EquationKind>,
    pub year: Option<i32>,
    pub message: String,
}
