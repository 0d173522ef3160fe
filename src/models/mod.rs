mod forecast;
mod reference;
mod region;

pub use forecast::{
    EquationKind, ForecastRequest, ForecastResult, ModelIssue, RegionForecast, STATEWIDE_KEY,
    STATEWIDE_NAME,
};
pub use reference::ReferenceTables;
pub use region::{
    find_count_column, InfrastructureSummaryRecord, RegionRecord, ADOPTION_EQUATION_COLUMN,
    COUNTY_COLUMN, COUNT_COLUMN, INFRASTRUCTURE_EQUATION_COLUMN, POPULATION_COLUMN,
    STATEWIDE_TOTAL_KEY,
};
