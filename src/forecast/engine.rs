use tracing::{debug, warn};

use crate::error::ForecastError;
use crate::models::{
    EquationKind, ForecastRequest, ForecastResult, ModelIssue, ReferenceTables, RegionForecast,
    RegionRecord,
};

use super::expression::{evaluate, Equation};
use super::{
    forecast_statewide, normalize, validate_year, validate_year_range, MAX_YEAR, MIN_YEAR,
};

/// Clamp a modelled adoption fraction into [0, 1].
///
/// Values outside the interval are extrapolation artifacts of the fitted
/// curves; they are clamped without being reported to the caller.
pub fn clamp_adoption(rate: f64) -> f64 {
    if !(0.0..=1.0).contains(&rate) {
        debug!(rate, "clamping adoption rate");
    }
    rate.clamp(0.0, 1.0)
}

/// Forecast API over a set of loaded reference tables.
pub struct Forecaster<'a> {
    tables: &'a ReferenceTables,
}

impl<'a> Forecaster<'a> {
    /// Create a new Forecaster borrowing the given tables.
    pub fn new(tables: &'a ReferenceTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &'a ReferenceTables {
        self.tables
    }

    /// Forecast one county for one year.
    pub fn forecast_region(
        &self,
        region: &str,
        year: i32,
    ) -> Result<ForecastResult, ForecastError> {
        self.region_forecast(region, year).map(|f| f.result)
    }

    /// Same as [`Self::forecast_region`], also returning the matched region's
    /// display name and key.
    pub fn region_forecast(
        &self,
        region: &str,
        year: i32,
    ) -> Result<RegionForecast, ForecastError> {
        let key = region_key(region)?;
        validate_year(year)?;
        let record = self.lookup(&key, region)?;
        self.forecast_record(record, year)
    }

    /// Statewide forecast, with the known statewide site count attached when
    /// the summary table has a `Total` row.
    pub fn forecast_statewide(&self, year: i32) -> Result<ForecastResult, ForecastError> {
        let mut result = forecast_statewide(year)?;
        result.existing_infrastructure_count = self.tables.statewide_infrastructure_count();
        Ok(result)
    }

    /// Dispatch a request: no region means statewide.
    pub fn forecast(&self, request: &ForecastRequest) -> Result<RegionForecast, ForecastError> {
        match &request.region {
            Some(region) => self.region_forecast(region, request.year),
            None => self
                .forecast_statewide(request.year)
                .map(RegionForecast::statewide),
        }
    }

    /// One forecast per year of `from..=to` for a county.
    pub fn project_region(
        &self,
        region: &str,
        from: i32,
        to: i32,
    ) -> Result<Vec<RegionForecast>, ForecastError> {
        let key = region_key(region)?;
        validate_year_range(from, to)?;
        let record = self.lookup(&key, region)?;
        (from..=to)
            .map(|year| self.forecast_record(record, year))
            .collect()
    }

    /// One statewide forecast per year of `from..=to`.
    pub fn project_statewide(
        &self,
        from: i32,
        to: i32,
    ) -> Result<Vec<RegionForecast>, ForecastError> {
        validate_year_range(from, to)?;
        (from..=to)
            .map(|year| self.forecast_statewide(year).map(RegionForecast::statewide))
            .collect()
    }

    /// Check every region row's equations at both ends of the forecast range.
    pub fn audit_models(&self) -> Vec<ModelIssue> {
        let mut issues = Vec::new();

        for (row, record) in self.tables.regions().iter().enumerate() {
            if record.normalized_key.is_empty() {
                continue;
            }
            let indexed = self.tables.region(&record.normalized_key);
            if indexed.is_some_and(|first| !std::ptr::eq(first, record)) {
                issues.push(ModelIssue {
                    region: record.raw_name.clone(),
                    equation: None,
                    year: None,
                    message: format!(
                        "row {} duplicates an earlier county and is never used",
                        row + 1
                    ),
                });
                continue;
            }

            if record.population.is_none() {
                issues.push(ModelIssue {
                    region: record.raw_name.clone(),
                    equation: None,
                    year: None,
                    message: "population is missing".to_string(),
                });
            }

            for kind in [EquationKind::Infrastructure, EquationKind::Adoption] {
                audit_equation(record, kind, &mut issues);
            }
        }

        issues
    }

    fn lookup(&self, key: &str, region: &str) -> Result<&'a RegionRecord, ForecastError> {
        self.tables
            .region(key)
            .ok_or_else(|| ForecastError::RegionNotFound(region.trim().to_string()))
    }

    fn forecast_record(
        &self,
        record: &RegionRecord,
        year: i32,
    ) -> Result<RegionForecast, ForecastError> {
        let infrastructure_forecast =
            evaluate_equation(record, EquationKind::Infrastructure, year)?;
        let raw_adoption = evaluate_equation(record, EquationKind::Adoption, year)?;
        let population = record.population.ok_or_else(|| {
            warn!(region = %record.raw_name, "population is missing");
            ForecastError::ModelEvaluationFailed {
                expression: String::new(),
                reason: "population is missing".to_string(),
            }
        })?;

        let adoption_rate = clamp_adoption(raw_adoption);
        let existing_infrastructure_count = self
            .tables
            .summary(&record.normalized_key)
            .and_then(|s| s.current_count);

        Ok(RegionForecast {
            region: record.raw_name.clone(),
            region_key: record.normalized_key.clone(),
            result: ForecastResult {
                year,
                infrastructure_forecast,
                adoption_rate,
                projected_adopters: adoption_rate * population,
                existing_infrastructure_count,
            },
        })
    }
}

fn region_key(region: &str) -> Result<String, ForecastError> {
    let key = normalize(region);
    if key.is_empty() {
        return Err(ForecastError::EmptyRegion);
    }
    Ok(key)
}

fn equation_text(record: &RegionRecord, kind: EquationKind) -> Option<&str> {
    match kind {
        EquationKind::Infrastructure => record.infrastructure_equation.as_deref(),
        EquationKind::Adoption => record.adoption_equation.as_deref(),
    }
}

fn evaluate_equation(
    record: &RegionRecord,
    kind: EquationKind,
    year: i32,
) -> Result<f64, ForecastError> {
    let Some(text) = equation_text(record, kind) else {
        warn!(region = %record.raw_name, equation = %kind, "equation is missing");
        return Err(ForecastError::ModelEvaluationFailed {
            expression: String::new(),
            reason: format!("{kind} equation is missing"),
        });
    };

    evaluate(text, f64::from(year)).map_err(|e| {
        if let ForecastError::ModelEvaluationFailed { expression, reason } = &e {
            warn!(
                region = %record.raw_name,
                equation = %kind,
                year,
                expression = %expression,
                reason = %reason,
                "equation evaluation failed"
            );
        }
        e
    })
}

fn audit_equation(record: &RegionRecord, kind: EquationKind, issues: &mut Vec<ModelIssue>) {
    let issue = |year: Option<i32>, message: String| ModelIssue {
        region: record.raw_name.clone(),
        equation: Some(kind),
        year,
        message,
    };

    let Some(text) = equation_text(record, kind) else {
        issues.push(issue(None, "equation is missing".to_string()));
        return;
    };

    let equation = match Equation::parse(text) {
        Ok(eq) => eq,
        Err(e) => {
            issues.push(issue(None, e.to_string()));
            return;
        }
    };

    for year in [MIN_YEAR, MAX_YEAR] {
        match equation.eval(f64::from(year)) {
            Ok(value) if kind == EquationKind::Infrastructure && value < 0.0 => {
                issues.push(issue(Some(year), format!("negative site count {value:.1}")));
            }
            Ok(_) => {}
            Err(e) => issues.push(issue(Some(year), e.to_string())),
        }
    }
}
