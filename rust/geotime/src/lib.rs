//! Spatial-temporal indexes over geometry and time.
//!
//! This crate defines the spatial-temporal *dimensionality*: the family of
//! indexes whose entities supply a geometry and a time (instant or range).
//!
//! # Overview
//!
//! An index is described by [`SpatialTemporalOptions`]:
//!
//! - **Bias** trades spatial against temporal precision ([`Bias`]).
//! - **Periodicity** is the calendar unit time values are binned by.
//! - **CRS**: with the default geographic CRS ([`DEFAULT_CRS`]) the index has
//!   longitude, latitude and time dimensions; any other CRS is resolved
//!   through a [`CrsResolver`] and contributes one bounded dimension per axis.
//! - **Max duplicates** bounds the number of insertion IDs per entity by
//!   selecting a coarser tier of the space-filling curve.
//!
//! [`create_index`] (or [`SpatialTemporalIndexBuilder`]) turns the options
//! into a [`geotime_store::Index`], named deterministically from the options
//! so that the same configuration always yields the same index name.
//! [`is_spatial_temporal`] recognizes such indexes regardless of how they
//! were created.

pub mod builder;
pub mod crs;
pub mod options;
pub mod provider;

pub use builder::SpatialTemporalIndexBuilder;
pub use crs::{
    CachingCrsResolver, CoordinateSystem, CoordinateSystemAxis, CrsResolver, EpsgCrsResolver,
    ResolveError, default_resolver,
};
pub use options::{
    Bias, DEFAULT_CRS, DEFAULT_MAX_DUPLICATES, MAX_GEOMETRY_PRECISION, SpatialTemporalOptions,
};
pub use provider::{
    DEFAULT_SPATIAL_TEMPORAL_ID, DimensionModel, DimensionalityTypeProvider,
    SpatialTemporalDimensionalityProvider, build_dimension_model, create_index,
    is_spatial_temporal, is_spatial_temporal_strategy, precision_bits,
};
