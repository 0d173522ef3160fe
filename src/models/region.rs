use serde::{Deserialize, Serialize};

use crate::forecast::normalize;
use crate::io::TableRow;

/// Column holding the region name in both reference tables.
pub const COUNTY_COLUMN: &str = "County";
pub const POPULATION_COLUMN: &str = "Population";
pub const INFRASTRUCTURE_EQUATION_COLUMN: &str = "Supercharger_Equation";
pub const ADOPTION_EQUATION_COLUMN: &str = "Adoption_Equation";
pub const COUNT_COLUMN: &str = "Supercharger_Count";

/// Normalized name of the aggregate row in the infrastructure summary.
pub const STATEWIDE_TOTAL_KEY: &str = "total";

/// One county's fitted models and baseline population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Name as written in the reference table
    pub raw_name: String,
    /// Join key, see [`normalize`]
    pub normalized_key: String,
    /// Baseline population the adoption rate is applied to
    pub population: Option<f64>,
    /// `label = expression` text for the charging-site count
    pub infrastructure_equation: Option<String>,
    /// `label = expression` text for the adoption fraction
    pub adoption_equation: Option<String>,
}

impl RegionRecord {
    pub fn new(
        raw_name: impl Into<String>,
        population: Option<f64>,
        infrastructure_equation: Option<String>,
        adoption_equation: Option<String>,
    ) -> Self {
        let raw_name = raw_name.into();
        Self {
            normalized_key: normalize(&raw_name),
            raw_name,
            population,
            infrastructure_equation,
            adoption_equation,
        }
    }

    /// Build a record from a table row. Missing cells stay `None`; they are
    /// reported when the region is forecast, not here.
    pub fn from_row(row: &TableRow) -> Self {
        Self::new(
            row.text(COUNTY_COLUMN).unwrap_or_default(),
            row.number(POPULATION_COLUMN),
            row.text(INFRASTRUCTURE_EQUATION_COLUMN),
            row.text(ADOPTION_EQUATION_COLUMN),
        )
    }
}

/// Currently known charging-site count for a county (or the statewide total).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureSummaryRecord {
    pub raw_name: String,
    pub normalized_key: String,
    pub current_count: Option<u64>,
}

impl InfrastructureSummaryRecord {
    pub fn new(raw_name: impl Into<String>, current_count: Option<u64>) -> Self {
        let raw_name = raw_name.into();
        Self {
            normalized_key: normalize(&raw_name),
            raw_name,
            current_count,
        }
    }

    pub fn from_row(row: &TableRow, count_column: &str) -> Self {
        let count = row
            .number(count_column)
            .filter(|v| *v >= 0.0)
            .map(|v| v.round() as u64);
        Self::new(row.text(COUNTY_COLUMN).unwrap_or_default(), count)
    }

    /// True for the aggregate row that carries the statewide total.
    pub fn is_statewide_total(&self) -> bool {
        self.normalized_key == STATEWIDE_TOTAL_KEY
    }
}

/// Pick the count column of a summary table: the canonical header if present,
/// otherwise the first header mentioning "super" or "charger".
pub fn find_count_column(headers: &[String]) -> Option<&str> {
    if let Some(h) = headers.iter().find(|h| h.trim() == COUNT_COLUMN) {
        return Some(h.as_str());
    }
    headers
        .iter()
        .find(|h| {
            let lower = h.to_lowercase();
            lower.contains("super") || lower.contains("charger")
        })
        .map(|h| h.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CellValue;

    fn row(cells: &[(&str, CellValue)]) -> TableRow {
        let mut row = TableRow::new(0);
        for (k, v) in cells {
            row.insert(*k, v.clone());
        }
        row
    }

    #[test]
    fn test_region_from_row() {
        let r = RegionRecord::from_row(&row(&[
            ("County", CellValue::Text("Alameda County".to_string())),
            ("Population", CellValue::Number(1_650_000.0)),
            ("Supercharger_Equation", CellValue::Text("y = 2*x".to_string())),
            ("Adoption_Equation", CellValue::Text("y = sigmoid(x)".to_string())),
        ]));
        assert_eq!(r.raw_name, "Alameda County");
        assert_eq!(r.normalized_key, "alameda");
        assert_eq!(r.population, Some(1_650_000.0));
        assert_eq!(r.infrastructure_equation.as_deref(), Some("y = 2*x"));
    }

    #[test]
    fn test_region_from_row_missing_fields() {
        let r = RegionRecord::from_row(&row(&[(
            "County",
            CellValue::Text("Inyo".to_string()),
        )]));
        assert_eq!(r.normalized_key, "inyo");
        assert!(r.population.is_none());
        assert!(r.adoption_equation.is_none());
    }

    #[test]
    fn test_summary_total_row() {
        let s = InfrastructureSummaryRecord::from_row(
            &row(&[
                ("County", CellValue::Text(" TOTAL ".to_string())),
                ("Supercharger_Count", CellValue::Number(1432.0)),
            ]),
            COUNT_COLUMN,
        );
        assert!(s.is_statewide_total());
        assert_eq!(s.current_count, Some(1432));
    }

    #[test]
    fn test_summary_negative_count_is_dropped() {
        let s = InfrastructureSummaryRecord::from_row(
            &row(&[
                ("County", CellValue::Text("Kern".to_string())),
                ("Supercharger_Count", CellValue::Number(-3.0)),
            ]),
            COUNT_COLUMN,
        );
        assert_eq!(s.current_count, None);
    }

    #[test]
    fn test_find_count_column() {
        let canonical = vec!["County".to_string(), "Supercharger_Count".to_string()];
        assert_eq!(find_count_column(&canonical), Some("Supercharger_Count"));

        let loose = vec!["County".to_string(), "Charger Sites".to_string()];
        assert_eq!(find_count_column(&loose), Some("Charger Sites"));

        let none = vec!["County".to_string(), "Population".to_string()];
        assert_eq!(find_count_column(&none), None);
    }
}
