mod csv_io;
mod excel_io;
mod images;
mod json_io;

use std::collections::HashMap;
use std::path::Path;

use crate::error::ForecastError;
use tracing::warn;

use crate::models::{
    find_count_column, InfrastructureSummaryRecord, RegionForecast, RegionRecord, COUNTY_COLUMN,
};

pub use csv_io::{read_csv_table, read_csv_table_from_bytes, write_forecasts_csv};
pub use excel_io::{read_excel_table, write_forecasts_excel};
pub use images::find_image_for_region;
pub use json_io::write_forecasts_json;

/// A single cell of a reference table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

/// One data row, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    /// Zero-based position below the header row
    pub index: usize,
    cells: HashMap<String, CellValue>,
}

impl TableRow {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            cells: HashMap::new(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.cells.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Trimmed text of a cell; numbers are rendered, blanks are `None`.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.cells.get(column)? {
            CellValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            CellValue::Number(v) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Numeric value of a cell. Text such as `"1,234"` is accepted.
    pub fn number(&self, column: &str) -> Option<f64> {
        let value: Option<f64> = match self.cells.get(column)? {
            CellValue::Number(v) => Some(*v),
            CellValue::Text(s) => s.trim().replace(',', "").parse().ok(),
            CellValue::Empty => None,
        };
        value.filter(|v| v.is_finite())
    }
}

/// A parsed reference table: header names in column order plus data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// Trait for reading a tabular reference source from a file.
pub trait TableReader {
    fn read(&self, path: &Path) -> Result<Table, ForecastError>;
}

/// Trait for writing a series of forecasts to a file.
pub trait ForecastWriter {
    fn write(&self, forecasts: &[RegionForecast], path: &Path) -> Result<(), ForecastError>;
}

/// CSV format reader/writer.
pub struct CsvFormat;

impl TableReader for CsvFormat {
    fn read(&self, path: &Path) -> Result<Table, ForecastError> {
        read_csv_table(path)
    }
}

impl ForecastWriter for CsvFormat {
    fn write(&self, forecasts: &[RegionForecast], path: &Path) -> Result<(), ForecastError> {
        write_forecasts_csv(forecasts, path)
    }
}

/// Excel (.xlsx) format reader/writer.
pub struct ExcelFormat;

impl TableReader for ExcelFormat {
    fn read(&self, path: &Path) -> Result<Table, ForecastError> {
        read_excel_table(path)
    }
}

impl ForecastWriter for ExcelFormat {
    fn write(&self, forecasts: &[RegionForecast], path: &Path) -> Result<(), ForecastError> {
        write_forecasts_excel(forecasts, path)
    }
}

/// JSON format writer.
#[derive(Default)]
pub struct JsonFormat {
    pub pretty: bool,
}

impl ForecastWriter for JsonFormat {
    fn write(&self, forecasts: &[RegionForecast], path: &Path) -> Result<(), ForecastError> {
        write_forecasts_json(forecasts, path, self.pretty)
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Read a reference table, choosing the format from the file extension.
///
/// A file that does not exist is a [`ForecastError::ConfigurationMissing`].
pub fn read_table(path: &Path) -> Result<Table, ForecastError> {
    if !path.is_file() {
        return Err(ForecastError::ConfigurationMissing(path.to_path_buf()));
    }
    let reader: &dyn TableReader = match extension(path).as_str() {
        "csv" => &CsvFormat,
        "xlsx" | "xls" => &ExcelFormat,
        ext => {
            return Err(ForecastError::ParseError(format!(
                "Unsupported table format: .{ext}. Use .csv or .xlsx"
            )))
        }
    };
    reader.read(path)
}

/// Write forecasts, choosing the format from the file extension.
pub fn write_forecasts(
    forecasts: &[RegionForecast],
    path: &Path,
    pretty: bool,
) -> Result<(), ForecastError> {
    let json = JsonFormat { pretty };
    let writer: &dyn ForecastWriter = match extension(path).as_str() {
        "csv" => &CsvFormat,
        "xlsx" => &ExcelFormat,
        "json" => &json,
        ext => {
            return Err(ForecastError::ParseError(format!(
                "Unsupported output format: .{ext}. Use .csv, .json, or .xlsx"
            )))
        }
    };
    writer.write(forecasts, path)
}

/// Load the per-county equation table.
pub fn load_region_records(path: &Path) -> Result<Vec<RegionRecord>, ForecastError> {
    let table = read_table(path)?;
    Ok(table.rows.iter().map(RegionRecord::from_row).collect())
}

/// Load the known charging-site counts, including any `Total` row.
pub fn load_infrastructure_summary(
    path: &Path,
) -> Result<Vec<InfrastructureSummaryRecord>, ForecastError> {
    let table = read_table(path)?;
    let Some(count_column) = find_count_column(&table.headers) else {
        warn!(path = %path.display(), "no charging count column in header");
        return Ok(table
            .rows
            .iter()
            .map(|row| {
                InfrastructureSummaryRecord::new(row.text(COUNTY_COLUMN).unwrap_or_default(), None)
            })
            .collect());
    };
    Ok(table
        .rows
        .iter()
        .map(|row| InfrastructureSummaryRecord::from_row(row, count_column))
        .collect())
}
