use colored::Colorize;

use crate::models::RegionForecast;

const BAR_WIDTH: usize = 40;

/// Format a text bar chart of adoption rate per year.
///
/// Bars are scaled to the full [0, 1] adoption range, not to the series
/// maximum, so charts for different counties are comparable.
pub fn format_adoption_chart(forecasts: &[RegionForecast]) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "EV Adoption Trajectory".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    if forecasts.is_empty() {
        output.push_str("  No data available.\n");
        return output;
    }

    output.push_str(&format!(
        "  {:>6}  {:>9}  {:>8}  Adoption\n",
        "Year", "Adoption", "Sites"
    ));
    output.push_str(&format!("  {}\n", "-".repeat(70)));

    for f in forecasts {
        let rate = f.result.adoption_rate;
        let bar_len = (rate * BAR_WIDTH as f64).round() as usize;
        let bar = "\u{2588}".repeat(bar_len.min(BAR_WIDTH));

        output.push_str(&format!(
            "  {:>6}  {:>8.2}%  {:>8.0}  {}\n",
            f.result.year,
            rate * 100.0,
            f.result.infrastructure_forecast,
            bar.green()
        ));
    }

    output.push('\n');
    output
}

/// Print a text bar chart of adoption rate per year.
pub fn print_adoption_chart(forecasts: &[RegionForecast]) {
    print!("{}", format_adoption_chart(forecasts));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ForecastResult;

    fn forecast(year: i32, adoption_rate: f64) -> RegionForecast {
        RegionForecast::statewide(ForecastResult {
            year,
            infrastructure_forecast: 50.0,
            adoption_rate,
            projected_adopters: adoption_rate * 1000.0,
            existing_infrastructure_count: None,
        })
    }

    #[test]
    fn test_format_chart_empty() {
        let output = format_adoption_chart(&[]);
        assert!(output.contains("No data available."));
        assert!(output.contains("EV Adoption Trajectory"));
    }

    #[test]
    fn test_format_chart_with_data() {
        let output = format_adoption_chart(&[forecast(2024, 0.05), forecast(2025, 0.1)]);
        assert!(output.contains("Year"));
        assert!(output.contains("2024"));
        assert!(output.contains("5.00%"));
        assert!(output.contains("10.00%"));
    }

    #[test]
    fn test_full_adoption_fills_bar() {
        let output = format_adoption_chart(&[forecast(2050, 1.0)]);
        assert!(output.contains(&"\u{2588}".repeat(BAR_WIDTH)));
    }

    #[test]
    fn test_zero_adoption_has_no_bar() {
        let output = format_adoption_chart(&[forecast(2024, 0.0)]);
        assert!(!output.contains('\u{2588}'));
    }
}
