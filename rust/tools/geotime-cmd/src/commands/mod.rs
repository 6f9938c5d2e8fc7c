//! Command implementations for geotime-cmd

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use geotime::{
    Bias, DEFAULT_MAX_DUPLICATES, SpatialTemporalOptions, create_index, default_resolver,
};
use geotime_index_core::Unit;
use geotime_store::Index;

pub mod describe;
pub mod insertion_ids;

/// Options shared by every command that creates an index.
#[derive(Args)]
pub struct IndexArgs {
    /// Spatial/temporal precision trade-off
    #[arg(long, default_value = "balanced")]
    pub bias: Bias,

    /// Calendar unit time values are binned by
    #[arg(long, default_value = "year")]
    pub periodicity: Unit,

    /// Coordinate reference system code (defaults to EPSG:4326)
    #[arg(long)]
    pub crs: Option<String>,

    /// Ceiling on the number of insertion IDs per entity
    #[arg(long, default_value_t = DEFAULT_MAX_DUPLICATES)]
    pub max_duplicates: u64,

    /// Decimal places geometry coordinates are rounded to
    #[arg(long, allow_negative_numbers = true)]
    pub geometry_precision: Option<i32>,
}

impl IndexArgs {
    pub fn options(&self) -> Result<SpatialTemporalOptions> {
        SpatialTemporalOptions::new(
            self.bias,
            self.periodicity,
            self.max_duplicates,
            self.crs.clone(),
            self.geometry_precision,
        )
        .context("Invalid index options")
    }

    pub fn create_index(&self) -> Result<Index> {
        let options = self.options()?;
        create_index(&options, default_resolver().as_ref())
            .with_context(|| format!("Failed to create index for {options:?}"))
    }
}

/// Parses an RFC 3339 timestamp into UTC.
pub fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|t| t.to_utc())
        .with_context(|| format!("Invalid RFC 3339 timestamp: {text}"))
}
