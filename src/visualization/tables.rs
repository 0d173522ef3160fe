use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::models::{ModelIssue, ReferenceTables, RegionForecast};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn format_count(count: Option<u64>) -> String {
    count.map_or_else(|| "-".to_string(), |c| c.to_string())
}

/// Format a single forecast as a metric/value table.
pub fn format_forecast(forecast: &RegionForecast) -> String {
    let result = &forecast.result;
    let mut output = String::new();
    output.push_str(&format!(
        "\n{}\n",
        format!("{} Forecast: {}", forecast.region, result.year)
            .bold()
            .green()
    ));
    output.push_str(&format!("{}\n", "=".repeat(50)));

    let mut table = new_table(vec!["Metric", "Value", "Unit"]);
    table.add_row(vec![
        Cell::new("Charging Sites (forecast)"),
        Cell::new(format!("{:.0}", result.infrastructure_forecast)),
        Cell::new("sites"),
    ]);
    table.add_row(vec![
        Cell::new("Charging Sites (known)"),
        Cell::new(format_count(result.existing_infrastructure_count)),
        Cell::new("sites"),
    ]);
    table.add_row(vec![
        Cell::new("Adoption Rate"),
        Cell::new(format!("{:.2}", result.adoption_rate * 100.0)),
        Cell::new("%"),
    ]);
    table.add_row(vec![
        Cell::new("Projected EV Owners"),
        Cell::new(format!("{:.0}", result.projected_adopters)),
        Cell::new("people"),
    ]);

    output.push_str(&format!("{table}"));
    output
}

/// Print a single forecast.
pub fn print_forecast(forecast: &RegionForecast) {
    println!("{}", format_forecast(forecast));
}

/// Format a year-by-year projection as a string.
pub fn format_projection_table(forecasts: &[RegionForecast]) -> String {
    let mut output = String::new();
    let title = match forecasts.first() {
        Some(f) => format!("Projection: {}", f.region),
        None => "Projection".to_string(),
    };
    output.push_str(&format!("\n{}\n", title.bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    let mut table = new_table(vec!["Year", "Sites", "Adoption %", "EV Owners"]);
    for f in forecasts {
        table.add_row(vec![
            Cell::new(f.result.year),
            Cell::new(format!("{:.0}", f.result.infrastructure_forecast)),
            Cell::new(format!("{:.2}", f.result.adoption_rate * 100.0)),
            Cell::new(format!("{:.0}", f.result.projected_adopters)),
        ]);
    }

    output.push_str(&format!("{table}"));
    output
}

/// Print a year-by-year projection.
pub fn print_projection_table(forecasts: &[RegionForecast]) {
    println!("{}", format_projection_table(forecasts));
}

/// Format the loaded regions with their population and known site count.
pub fn format_region_list(tables: &ReferenceTables) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Regions".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(50)));

    let mut table = new_table(vec!["County", "Key", "Population", "Known Sites"]);
    for record in tables.regions() {
        // Shadowed duplicates are reported by `check`, not listed here.
        if tables
            .region(&record.normalized_key)
            .is_some_and(|first| !std::ptr::eq(first, record))
        {
            continue;
        }
        let known = tables
            .summary(&record.normalized_key)
            .and_then(|s| s.current_count);
        table.add_row(vec![
            Cell::new(&record.raw_name),
            Cell::new(&record.normalized_key),
            Cell::new(
                record
                    .population
                    .map_or_else(|| "-".to_string(), |p| format!("{p:.0}")),
            ),
            Cell::new(format_count(known)),
        ]);
    }

    output.push_str(&format!("{table}"));
    if let Some(total) = tables.statewide_infrastructure_count() {
        output.push_str(&format!("\n  Statewide known sites: {total}\n"));
    }
    output
}

/// Print the loaded regions.
pub fn print_region_list(tables: &ReferenceTables) {
    print!("{}", format_region_list(tables));
}

/// Format model audit findings as a string.
pub fn format_model_issues(issues: &[ModelIssue]) -> String {
    let mut output = String::new();
    output.push_str(&format!("\n{}\n", "Model Check".bold().green()));
    output.push_str(&format!("{}\n", "=".repeat(60)));

    if issues.is_empty() {
        output.push_str(&format!("  {}\n", "All equations evaluate cleanly.".green()));
        return output;
    }

    let mut table = new_table(vec!["County", "Equation", "Year", "Problem"]);
    for issue in issues {
        table.add_row(vec![
            Cell::new(&issue.region),
            Cell::new(issue.equation.map_or_else(|| "-".to_string(), |k| k.to_string())),
            Cell::new(issue.year.map_or_else(|| "-".to_string(), |y| y.to_string())),
            Cell::new(&issue.message),
        ]);
    }

    output.push_str(&format!("{table}\n"));
    output.push_str(&format!(
        "  {}\n",
        format!("{} issue(s) found", issues.len()).yellow()
    ));
    output
}

/// Print model audit findings.
pub fn print_model_issues(issues: &[ModelIssue]) {
    print!("{}", format_model_issues(issues));
}
