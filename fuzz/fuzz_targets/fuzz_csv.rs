#![no_main]

use libfuzzer_sys::fuzz_target;

use ev_forecast::io::read_csv_table_from_bytes;
use ev_forecast::models::{find_count_column, InfrastructureSummaryRecord, RegionRecord};

fuzz_target!(|data: &[u8]| {
    let Ok(table) = read_csv_table_from_bytes(data) else {
        return;
    };
    for row in &table.rows {
        let _ = RegionRecord::from_row(row);
    }
    if let Some(column) = find_count_column(&table.headers) {
        for row in &table.rows {
            let _ = InfrastructureSummaryRecord::from_row(row, column);
        }
    }
});
