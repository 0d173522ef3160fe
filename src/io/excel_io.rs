use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;

use crate::error::ForecastError;
use crate::models::RegionForecast;

use super::csv_io::{ForecastRow, FORECAST_HEADERS};
use super::{CellValue, Table, TableRow};

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Error(e) => {
            tracing::warn!("spreadsheet cell error {e:?}, treating as empty");
            CellValue::Empty
        }
        other => CellValue::Text(other.to_string()),
    }
}

/// Read a reference table from the first sheet of a spreadsheet.
///
/// The first row is the header; every following row becomes a [`TableRow`]
/// keyed by those header names. Blank header cells are skipped.
pub fn read_excel_table(path: impl AsRef<Path>) -> Result<Table, ForecastError> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ForecastError::Excel("No sheets found in workbook".to_string()))?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|c| c.to_string().trim().to_string())
            .collect(),
        None => return Ok(Table::default()),
    };

    let mut table_rows = Vec::new();
    for (index, row) in rows.enumerate() {
        let mut table_row = TableRow::new(index);
        for (header, cell) in headers.iter().zip(row.iter()) {
            if header.is_empty() {
                continue;
            }
            table_row.insert(header.as_str(), cell_value(cell));
        }
        table_rows.push(table_row);
    }

    Ok(Table {
        headers: headers.into_iter().filter(|h| !h.is_empty()).collect(),
        rows: table_rows,
    })
}

/// Write a forecast series to an Excel (.xlsx) file.
pub fn write_forecasts_excel(
    forecasts: &[RegionForecast],
    path: impl AsRef<Path>,
) -> Result<(), ForecastError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in FORECAST_HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, forecast) in forecasts.iter().enumerate() {
        let row = ForecastRow::from_forecast(forecast);
        let r = i as u32 + 1;
        worksheet.write_string(r, 0, &row.region)?;
        worksheet.write_string(r, 1, &row.region_key)?;
        worksheet.write_number(r, 2, row.year as f64)?;
        worksheet.write_number(r, 3, row.infrastructure_forecast)?;
        worksheet.write_number(r, 4, row.adoption_rate)?;
        worksheet.write_number(r, 5, row.projected_adopters)?;
        if let Some(count) = row.existing_infrastructure_count {
            worksheet.write_number(r, 6, count as f64)?;
        }
    }

    workbook.save(path.as_ref())?;
    Ok(())
}
