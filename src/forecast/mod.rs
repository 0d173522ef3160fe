mod engine;
mod expression;
mod normalize;
mod statewide;

pub use engine::{clamp_adoption, Forecaster};
pub use expression::{
    evaluate, parse_expression, sigmoid, BinaryOp, Equation, Expr, ExpressionError, Function,
    L_VALUE,
};
pub use normalize::{image_key, normalize};
pub use statewide::{forecast_statewide, STATEWIDE_EV_BASE};

use crate::error::ForecastError;

/// First forecastable year; also `t = 0` of the statewide polynomials.
pub const MIN_YEAR: i32 = 2024;
/// Last forecastable year.
pub const MAX_YEAR: i32 = 2050;

/// Reject years outside `MIN_YEAR..=MAX_YEAR`.
pub fn validate_year(year: i32) -> Result<(), ForecastError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(ForecastError::YearOutOfRange(year))
    }
}

/// Validate an inclusive year range for projections.
pub fn validate_year_range(from: i32, to: i32) -> Result<(), ForecastError> {
    validate_year(from)?;
    validate_year(to)?;
    if from > to {
        return Err(ForecastError::YearOutOfRange(from));
    }
    Ok(())
}
