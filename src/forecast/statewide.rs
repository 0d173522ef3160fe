use tracing::debug;

use crate::error::ForecastError;
use crate::models::ForecastResult;

use super::engine::clamp_adoption;
use super::{validate_year, MIN_YEAR};

/// Registered EVs statewide in the base year; the adoption rate is applied
/// to this figure.
pub const STATEWIDE_EV_BASE: f64 = 3_777_493.0;

/// Charging sites, ascending powers of `t = year - 2024`.
const INFRASTRUCTURE_COEFFICIENTS: [f64; 4] =
    [5.000000e+01, 1.325427e+02, -6.879041e+00, 1.428264e-01];

/// Adoption fraction, ascending powers of `t`.
const ADOPTION_COEFFICIENTS: [f64; 3] = [5.271194e-02, 4.740971e-02, -5.999758e-04];

fn polynomial(coefficients: &[f64], t: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * t + c)
}

/// Closed-form statewide forecast. Fails only on an out-of-range year.
///
/// # Examples
///
/// ```
/// use ev_forecast::forecast::forecast_statewide;
///
/// let r = forecast_statewide(2024).unwrap();
/// assert_eq!(r.infrastructure_forecast, 50.0);
/// assert!((r.adoption_rate - 0.05271194).abs() < 1e-12);
/// ```
pub fn forecast_statewide(year: i32) -> Result<ForecastResult, ForecastError> {
    validate_year(year)?;
    let t = f64::from(year - MIN_YEAR);

    let infrastructure_forecast = polynomial(&INFRASTRUCTURE_COEFFICIENTS, t);
    let adoption_rate = clamp_adoption(polynomial(&ADOPTION_COEFFICIENTS, t));
    let projected_adopters = adoption_rate * STATEWIDE_EV_BASE;

    debug!(year, infrastructure_forecast, adoption_rate, "statewide forecast");

    Ok(ForecastResult {
        year,
        infrastructure_forecast,
        adoption_rate,
        projected_adopters,
        existing_infrastructure_count: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_base_year_is_constant_terms() {
        let r = forecast_statewide(2024).unwrap();
        assert_approx_eq!(r.infrastructure_forecast, 50.0, 1e-9);
        assert_approx_eq!(r.adoption_rate, 0.05271194, 1e-12);
        assert_approx_eq!(r.projected_adopters, 0.05271194 * 3_777_493.0, 1e-6);
        assert!((r.projected_adopters - 199_119.0).abs() < 1.0);
        assert_eq!(r.existing_infrastructure_count, None);
    }

    #[test]
    fn test_matches_expanded_polynomials() {
        for year in MIN_YEAR..=2050 {
            let t = f64::from(year - 2024);
            let sc =
                1.428264e-01 * t.powi(3) - 6.879041e+00 * t.powi(2) + 1.325427e+02 * t + 5.0e+01;
            let adopt = -5.999758e-04 * t.powi(2) + 4.740971e-02 * t + 5.271194e-02;
            let r = forecast_statewide(year).unwrap();
            assert_approx_eq!(r.infrastructure_forecast, sc, 1e-6);
            assert_approx_eq!(r.adoption_rate, adopt.clamp(0.0, 1.0), 1e-12);
        }
    }

    #[test]
    fn test_year_2030() {
        // t = 6: 30.8505 - 247.6455 + 795.2562 + 50
        let r = forecast_statewide(2030).unwrap();
        assert_approx_eq!(r.infrastructure_forecast, 628.4612, 1e-3);
        assert_approx_eq!(r.adoption_rate, 0.31557107, 1e-6);
    }

    #[test]
    fn test_out_of_range_years() {
        assert!(matches!(forecast_statewide(2023), Err(ForecastError::YearOutOfRange(2023))));
        assert!(matches!(forecast_statewide(2051), Err(ForecastError::YearOutOfRange(2051))));
    }

    #[test]
    fn test_adoption_stays_in_unit_interval() {
        for year in MIN_YEAR..=2050 {
            let r = forecast_statewide(year).unwrap();
            assert!((0.0..=1.0).contains(&r.adoption_rate));
        }
    }
}
