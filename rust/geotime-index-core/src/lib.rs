//! Core index infrastructure for geotime spatial-temporal indexes.
//!
//! This crate provides the numeric model an index is built on and the
//! strategies that turn an entity's extent into sortable row keys.
//!
//! # Overview
//!
//! The index system is built around the [`IndexStrategy`] trait. A strategy
//! owns an ordered list of [`DimensionDefinition`]s and a bit precision per
//! dimension, and decomposes one [`NumericRange`] per dimension into the set
//! of [`InsertionId`]s whose cells the range touches.
//!
//! # Architecture
//!
//! - **Dimensions**: [`dimension`] defines the axis kinds (periodic longitude,
//!   bounded latitude, custom CRS axes, binned time) and maps native values
//!   onto cells.
//! - **Temporal binning**: [`temporal`] splits time into calendar bins.
//! - **Curves**: [`sfc`] maps cell coordinates to a Hilbert or Z-order key.
//! - **Tiers**: [`tiered`] builds single-tier and hierarchical strategies
//!   that coarsen precision to keep the number of keys per entity below a
//!   duplicate ceiling.
//!
//! Strategies are immutable once built and are shared across threads via
//! `Arc`; key decomposition is a pure, synchronous computation.

use geotime_common::Result;

pub mod dimension;
pub mod insertion_id;
pub mod sfc;
pub mod temporal;
pub mod tiered;

pub use dimension::{BinnedRange, DimensionDefinition, DimensionKind, EDGE_EPSILON, NumericRange};
pub use insertion_id::InsertionId;
pub use sfc::SfcType;
pub use temporal::{TemporalBin, Unit};
pub use tiered::{TieredSfcIndexFactory, TieredSfcIndexStrategy};

/// Decomposes per-dimension numeric extents into insertion IDs.
///
/// # Determinism
///
/// For identical inputs an implementation must return the identical,
/// identically ordered list of IDs.
///
/// # Thread Safety
///
/// Strategies are shared by concurrent encoders, hence `Send + Sync + 'static`.
pub trait IndexStrategy: Send + Sync + 'static {
    /// Stable identifier of the strategy configuration.
    fn id(&self) -> &str;

    /// Ordered dimension definitions; `insertion_ids` expects one range per entry.
    fn dimensions(&self) -> &[DimensionDefinition];

    /// Bits of precision per dimension at the finest tier.
    fn precision_bits(&self) -> &[u8];

    /// Ceiling on the number of IDs produced for one entity, if any.
    fn max_duplicates(&self) -> Option<u64>;

    /// Returns the sorted, de-duplicated IDs of all cells touched by `ranges`.
    ///
    /// # Arguments
    ///
    /// * `ranges` - one closed range per dimension, in dimension order
    /// * `refinement` - optional predicate that discards candidate cells the
    ///   entity's actual shape does not touch
    ///
    /// # Errors
    ///
    /// Returns an error if the number of ranges does not match the number of
    /// dimensions or a range can not be mapped onto its dimension.
    fn insertion_ids(
        &self,
        ranges: &[NumericRange],
        refinement: Option<&dyn CellRefinement>,
    ) -> Result<Vec<InsertionId>>;
}

/// Narrows the cells of a range decomposition to those an entity really touches.
///
/// A bounding range over-approximates shapes such as lines: a diagonal
/// segment crosses far fewer cells than its envelope contains. A refinement
/// is consulted once per candidate cell combination of its
/// [`dimensions`](Self::dimensions).
pub trait CellRefinement: Send + Sync {
    /// Positions (in strategy dimension order) this refinement constrains.
    fn dimensions(&self) -> &[usize];

    /// Whether the entity touches the cell.
    ///
    /// `cell[k]` holds the native bounds `[lo, hi)` of the cell along
    /// `dimensions()[k]`. Cells are half-open: a shape lying within
    /// [`EDGE_EPSILON`] (in cell units) below the upper edge belongs to the
    /// next cell.
    fn touches(&self, cell: &[NumericRange]) -> bool;
}
