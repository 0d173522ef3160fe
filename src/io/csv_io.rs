use std::io::Read;
use std::path::Path;

use crate::error::ForecastError;
use crate::models::RegionForecast;

use super::{CellValue, Table, TableRow};

/// Flat CSV/XLSX export row for one forecast year.
#[derive(Debug, serde::Serialize)]
pub(crate) struct ForecastRow {
    pub region: String,
    pub region_key: String,
    pub year: i32,
    pub infrastructure_forecast: f64,
    pub adoption_rate: f64,
    pub projected_adopters: f64,
    pub existing_infrastructure_count: Option<u64>,
}

impl ForecastRow {
    pub(crate) fn from_forecast(f: &RegionForecast) -> Self {
        Self {
            region: f.region.clone(),
            region_key: f.region_key.clone(),
            year: f.result.year,
            infrastructure_forecast: f.result.infrastructure_forecast,
            adoption_rate: f.result.adoption_rate,
            projected_adopters: f.result.projected_adopters,
            existing_infrastructure_count: f.result.existing_infrastructure_count,
        }
    }
}

pub(crate) const FORECAST_HEADERS: [&str; 7] = [
    "region",
    "region_key",
    "year",
    "infrastructure_forecast",
    "adoption_rate",
    "projected_adopters",
    "existing_infrastructure_count",
];

fn parse_csv_records<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Table, ForecastError> {
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        let mut row = TableRow::new(index);
        // Short rows leave trailing columns absent rather than failing the load.
        for (header, field) in headers.iter().zip(record.iter()) {
            let value = if field.is_empty() {
                CellValue::Empty
            } else {
                CellValue::Text(field.to_string())
            };
            row.insert(header.as_str(), value);
        }
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

/// Read a reference table from a CSV file with a header row.
pub fn read_csv_table(path: impl AsRef<Path>) -> Result<Table, ForecastError> {
    let mut rdr = reader_builder().from_path(path.as_ref())?;
    parse_csv_records(&mut rdr)
}

/// Read a reference table from CSV bytes.
pub fn read_csv_table_from_bytes(data: &[u8]) -> Result<Table, ForecastError> {
    let mut rdr = reader_builder().from_reader(data);
    parse_csv_records(&mut rdr)
}

/// Write a forecast series to a CSV file.
pub fn write_forecasts_csv(
    forecasts: &[RegionForecast],
    path: impl AsRef<Path>,
) -> Result<(), ForecastError> {
    let mut wtr = csv::Writer::from_path(path.as_ref())?;
    for f in forecasts {
        wtr.serialize(ForecastRow::from_forecast(f))?;
    }
    wtr.flush()?;
    Ok(())
}
