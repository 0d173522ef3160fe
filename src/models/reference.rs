use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use crate::error::ForecastError;
use crate::forecast::normalize;
use crate::io;

use super::{InfrastructureSummaryRecord, RegionRecord};

/// Both reference tables, indexed by normalized region key.
///
/// Built once at startup and lent to [`crate::forecast::Forecaster`]; nothing
/// mutates it afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    regions: Vec<RegionRecord>,
    summaries: Vec<InfrastructureSummaryRecord>,
    region_index: HashMap<String, usize>,
    summary_index: HashMap<String, usize>,
}

impl ReferenceTables {
    /// Index already-parsed records. Rows sharing a normalized key resolve to
    /// the first one; later duplicates are logged and never matched.
    pub fn new(regions: Vec<RegionRecord>, summaries: Vec<InfrastructureSummaryRecord>) -> Self {
        let region_index =
            first_match_index(regions.iter().map(|r| r.normalized_key.as_str()), "equation");
        let summary_index =
            first_match_index(summaries.iter().map(|s| s.normalized_key.as_str()), "summary");
        Self {
            regions,
            summaries,
            region_index,
            summary_index,
        }
    }

    /// Load the equation table and the infrastructure summary table.
    ///
    /// Either file missing is a [`ForecastError::ConfigurationMissing`]; the
    /// caller must not start serving without both.
    pub fn load(
        equations_path: impl AsRef<Path>,
        summary_path: impl AsRef<Path>,
    ) -> Result<Self, ForecastError> {
        let regions = io::load_region_records(equations_path.as_ref())?;
        let summaries = io::load_infrastructure_summary(summary_path.as_ref())?;
        let tables = Self::new(regions, summaries);
        info!(
            regions = tables.regions.len(),
            summaries = tables.summaries.len(),
            "loaded reference tables"
        );
        Ok(tables)
    }

    /// Region record for an already-normalized key.
    pub fn region(&self, key: &str) -> Option<&RegionRecord> {
        self.region_index.get(key).map(|&i| &self.regions[i])
    }

    /// Summary record for an already-normalized key.
    pub fn summary(&self, key: &str) -> Option<&InfrastructureSummaryRecord> {
        self.summary_index.get(key).map(|&i| &self.summaries[i])
    }

    /// Known charging-site count for a free-text region name.
    pub fn existing_count(&self, name: &str) -> Option<u64> {
        self.summary(&normalize(name)).and_then(|s| s.current_count)
    }

    /// Count on the summary table's aggregate `Total` row.
    pub fn statewide_infrastructure_count(&self) -> Option<u64> {
        self.summaries
            .iter()
            .find(|s| s.is_statewide_total())
            .and_then(|s| s.current_count)
    }

    /// All region records in table order, duplicates included.
    pub fn regions(&self) -> &[RegionRecord] {
        &self.regions
    }

    pub fn summaries(&self) -> &[InfrastructureSummaryRecord] {
        &self.summaries
    }

    /// Number of distinct region keys.
    pub fn num_regions(&self) -> usize {
        self.region_index.len()
    }
}

fn first_match_index<'a>(
    keys: impl Iterator<Item = &'a str>,
    table: &str,
) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, key) in keys.enumerate() {
        if key.is_empty() {
            continue;
        }
        if index.contains_key(key) {
            warn!(table, key, row = i, "duplicate region key, first row wins");
            continue;
        }
        index.insert(key.to_string(), i);
    }
    index
}
