//! Describe command implementation

use anyhow::{Context, Result};
use geotime_store::Index;
use serde::Serialize;

use crate::commands::IndexArgs;

#[derive(Serialize)]
struct IndexSummary {
    name: String,
    strategy: String,
    crs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_duplicates: Option<u64>,
    dimensions: Vec<DimensionInfo>,
    options: serde_json::Value,
}

#[derive(Serialize)]
struct DimensionInfo {
    field: String,
    definition: String,
    bits: u8,
}

pub fn run(args: IndexArgs) -> Result<()> {
    let options = args.options()?;
    let index = args.create_index()?;
    let summary = summarize(&index, serde_json::to_value(&options)?);
    let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    println!("{json}");
    Ok(())
}

fn summarize(index: &Index, options: serde_json::Value) -> IndexSummary {
    let strategy = index.strategy();
    let dimensions = index
        .model()
        .fields()
        .iter()
        .zip(strategy.precision_bits())
        .map(|(field, &bits)| DimensionInfo {
            field: field.id().to_string(),
            definition: field.definition().to_string(),
            bits,
        })
        .collect();
    IndexSummary {
        name: index.name().to_string(),
        strategy: strategy.id().to_string(),
        crs: index
            .model()
            .crs_code()
            .unwrap_or(geotime::DEFAULT_CRS)
            .to_string(),
        max_duplicates: strategy.max_duplicates(),
        dimensions,
        options,
    }
}

#[cfg(test)]
mod tests {
    use geotime::{SpatialTemporalIndexBuilder, SpatialTemporalOptions};

    use super::*;

    #[test]
    fn test_summary_of_default_index() {
        let index = SpatialTemporalIndexBuilder::new().create_index().unwrap();
        let options = serde_json::to_value(SpatialTemporalOptions::default()).unwrap();
        let summary = summarize(&index, options);
        assert_eq!(summary.name, "ST_IDX_BALANCED_YEAR");
        assert_eq!(summary.crs, "EPSG:4326");
        assert_eq!(summary.dimensions.len(), 3);
        assert_eq!(summary.dimensions[2].field, "default_time_dimension");
        assert_eq!(summary.dimensions[2].bits, 20);
        assert_eq!(summary.max_duplicates, Some(geotime::DEFAULT_MAX_DUPLICATES));
        assert_eq!(summary.options["bias"], "BALANCED");
        assert_eq!(summary.options["maxDuplicates"], 16);
    }
}
