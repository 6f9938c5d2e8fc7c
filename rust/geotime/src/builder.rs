//! Builder-style creation of spatial-temporal indexes.

use std::sync::Arc;

use geotime_common::Result;
use geotime_index_core::Unit;
use geotime_store::Index;

use crate::{
    crs::{CrsResolver, default_resolver},
    options::{Bias, SpatialTemporalOptions},
    provider,
};

/// Collects spatial-temporal index settings one at a time.
///
/// Unset settings keep the [`SpatialTemporalOptions`] defaults, so
/// `SpatialTemporalIndexBuilder::new().create_index()` creates the same index
/// as `create_index(&SpatialTemporalOptions::default(), ..)`.
#[derive(Clone)]
pub struct SpatialTemporalIndexBuilder {
    bias: Bias,
    periodicity: Unit,
    max_duplicates: u64,
    crs: Option<String>,
    geometry_precision: Option<i32>,
    resolver: Arc<dyn CrsResolver>,
}

impl SpatialTemporalIndexBuilder {
    /// Creates a builder with default settings, resolving CRS codes with
    /// [`default_resolver`].
    pub fn new() -> SpatialTemporalIndexBuilder {
        let defaults = SpatialTemporalOptions::default();
        SpatialTemporalIndexBuilder {
            bias: defaults.bias(),
            periodicity: defaults.periodicity(),
            max_duplicates: defaults.max_duplicates(),
            crs: None,
            geometry_precision: defaults.geometry_precision(),
            resolver: default_resolver(),
        }
    }

    pub fn resolver(mut self, resolver: Arc<dyn CrsResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn bias(mut self, bias: Bias) -> Self {
        self.bias = bias;
        self
    }

    pub fn periodicity(mut self, periodicity: Unit) -> Self {
        self.periodicity = periodicity;
        self
    }

    /// Sets the ceiling on insertion IDs per entity. Validated by
    /// [`Self::options`].
    pub fn max_duplicates(mut self, max_duplicates: u64) -> Self {
        self.max_duplicates = max_duplicates;
        self
    }

    pub fn crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    pub fn geometry_precision(mut self, geometry_precision: i32) -> Self {
        self.geometry_precision = Some(geometry_precision);
        self
    }

    /// The validated options the builder currently describes.
    pub fn options(&self) -> Result<SpatialTemporalOptions> {
        SpatialTemporalOptions::new(
            self.bias,
            self.periodicity,
            self.max_duplicates,
            self.crs.clone(),
            self.geometry_precision,
        )
    }

    /// Creates the index.
    ///
    /// # Errors
    ///
    /// Fails on invalid settings or when the CRS can not be resolved.
    pub fn create_index(&self) -> Result<Index> {
        let options = self.options()?;
        provider::create_index(&options, self.resolver.as_ref())
    }
}

impl Default for SpatialTemporalIndexBuilder {
    fn default() -> Self {
        SpatialTemporalIndexBuilder::new()
    }
}
