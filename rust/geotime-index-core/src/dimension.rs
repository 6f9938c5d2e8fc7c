//! Numeric dimension definitions.
//!
//! A [`DimensionDefinition`] describes one coordinate axis of the index: its
//! bounds, whether it wraps around (longitude), and for time, the binning
//! unit. Definitions are plain immutable values; the classification of an
//! axis is read from [`DimensionDefinition::kind`] rather than inferred.

use std::fmt;

use geotime_common::{Result, error::Error, verify_arg};

use crate::temporal::{TemporalBin, Unit};

/// Fraction of a cell (in cell units) within which a coordinate is considered
/// to lie on the cell edge.
///
/// Coordinates closer than this to an edge are snapped onto it, so values such
/// as `33.75000000000001` tile exactly like `33.75`.
pub const EDGE_EPSILON: f64 = 1e-9;

/// Classification tag of a dimension definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Longitude,
    Latitude,
    Custom,
    Time,
}

/// One coordinate axis participating in the index.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionDefinition {
    /// Periodic longitude in degrees, `[-180, 180]`.
    Longitude,

    /// Bounded latitude in degrees, `[-90, 90]`.
    ///
    /// With `half_range` set the axis is indexed over `[-180, 180]` instead, so
    /// that latitude cells have the same angular size as longitude cells; the
    /// upper and lower halves of that range are never populated.
    Latitude { half_range: bool },

    /// A bounded axis of a custom coordinate reference system.
    CustomCrsAxis { axis: u8, min: f64, max: f64 },

    /// Time in milliseconds since the epoch, discretized within calendar bins.
    Time { unit: Unit },
}

impl DimensionDefinition {
    /// Creates a custom CRS axis, validating its bounds.
    pub fn custom_axis(axis: u8, min: f64, max: f64) -> Result<Self> {
        verify_arg!(min, min.is_finite());
        verify_arg!(max, max.is_finite());
        verify_arg!(bounds, min < max);
        Ok(DimensionDefinition::CustomCrsAxis { axis, min, max })
    }

    pub fn kind(&self) -> DimensionKind {
        match self {
            DimensionDefinition::Longitude => DimensionKind::Longitude,
            DimensionDefinition::Latitude { .. } => DimensionKind::Latitude,
            DimensionDefinition::CustomCrsAxis { .. } => DimensionKind::Custom,
            DimensionDefinition::Time { .. } => DimensionKind::Time,
        }
    }

    pub fn is_periodic(&self) -> bool {
        matches!(self, DimensionDefinition::Longitude)
    }

    /// Range of valid values. For time this is unbounded; see [`Self::normalize`].
    pub fn value_range(&self) -> NumericRange {
        match self {
            DimensionDefinition::Longitude => NumericRange::unchecked(-180.0, 180.0),
            DimensionDefinition::Latitude { .. } => NumericRange::unchecked(-90.0, 90.0),
            DimensionDefinition::CustomCrsAxis { min, max, .. } => {
                NumericRange::unchecked(*min, *max)
            }
            DimensionDefinition::Time { .. } => {
                NumericRange::unchecked(i64::MIN as f64, i64::MAX as f64)
            }
        }
    }

    /// Range over which the axis is discretized into cells (unbinned axes only).
    fn index_bounds(&self) -> NumericRange {
        match self {
            DimensionDefinition::Latitude { half_range: true } => {
                NumericRange::unchecked(-180.0, 180.0)
            }
            _ => self.value_range(),
        }
    }

    /// Maps a range of native values onto this axis.
    ///
    /// Longitude wraps (a range crossing the antimeridian yields two pieces),
    /// bounded axes clamp, and time yields one piece per temporal bin. The
    /// result is never empty.
    pub fn normalize(&self, range: NumericRange) -> Result<Vec<BinnedRange>> {
        match self {
            DimensionDefinition::Longitude => {
                let bounds = self.index_bounds();
                if range.width() >= 360.0 {
                    return Ok(vec![BinnedRange::unbinned(bounds, bounds)]);
                }
                let (min, max) = (wrap_longitude(range.min), wrap_longitude(range.max));
                if min <= max {
                    Ok(vec![BinnedRange::unbinned(
                        NumericRange::unchecked(min, max),
                        bounds,
                    )])
                } else {
                    Ok(vec![
                        BinnedRange::unbinned(NumericRange::unchecked(min, 180.0), bounds),
                        BinnedRange::unbinned(NumericRange::unchecked(-180.0, max), bounds),
                    ])
                }
            }
            DimensionDefinition::Latitude { .. } | DimensionDefinition::CustomCrsAxis { .. } => {
                let valid = self.value_range();
                Ok(vec![BinnedRange::unbinned(
                    range.clamp_to(&valid),
                    self.index_bounds(),
                )])
            }
            DimensionDefinition::Time { unit } => {
                let start = millis(range.min, "time_range")?;
                let end = millis(range.max, "time_range")?;
                Ok(unit
                    .split(start, end)?
                    .into_iter()
                    .map(|(bin, from, to)| BinnedRange {
                        bin: Some(bin),
                        range: NumericRange::unchecked(
                            (from - bin.start) as f64,
                            (to - bin.start) as f64,
                        ),
                        bounds: NumericRange::unchecked(0.0, bin.len() as f64),
                    })
                    .collect())
            }
        }
    }
}

impl fmt::Display for DimensionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionDefinition::Longitude => write!(f, "longitude[-180, 180] periodic"),
            DimensionDefinition::Latitude { half_range } => {
                write!(f, "latitude[-90, 90]")?;
                if *half_range {
                    write!(f, " half-range")?;
                }
                Ok(())
            }
            DimensionDefinition::CustomCrsAxis { axis, min, max } => {
                write!(f, "crs-axis-{axis}[{min}, {max}]")
            }
            DimensionDefinition::Time { unit } => write!(f, "time/{unit}"),
        }
    }
}

fn wrap_longitude(value: f64) -> f64 {
    if (-180.0..=180.0).contains(&value) {
        value
    } else {
        (value + 180.0).rem_euclid(360.0) - 180.0
    }
}

fn millis(value: f64, name: &str) -> Result<i64> {
    if value.is_finite() && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        Ok(value as i64)
    } else {
        Err(Error::invalid_arg(name, format!("{value} is not a valid timestamp")))
    }
}

/// A closed interval of native values `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        verify_arg!(min, !min.is_nan());
        verify_arg!(max, !max.is_nan());
        verify_arg!(range, min <= max);
        Ok(NumericRange { min, max })
    }

    /// A zero-width range.
    pub fn point(value: f64) -> Self {
        NumericRange {
            min: value,
            max: value,
        }
    }

    pub(crate) fn unchecked(min: f64, max: f64) -> Self {
        NumericRange { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn clamp_to(&self, bounds: &NumericRange) -> NumericRange {
        NumericRange {
            min: self.min.clamp(bounds.min, bounds.max),
            max: self.max.clamp(bounds.min, bounds.max),
        }
    }
}

/// A range mapped onto one axis, possibly within a temporal bin.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedRange {
    /// The temporal bin, for binned axes.
    pub bin: Option<TemporalBin>,
    /// The covered values, relative to the bin start for binned axes.
    pub range: NumericRange,
    /// The range discretized into cells.
    pub bounds: NumericRange,
}

impl BinnedRange {
    fn unbinned(range: NumericRange, bounds: NumericRange) -> Self {
        BinnedRange {
            bin: None,
            range,
            bounds,
        }
    }

    /// First and last cell (inclusive) touched at the given precision.
    pub fn cell_span(&self, bits: u8) -> (u64, u64) {
        (
            cell_of(self.fraction(self.range.min), bits),
            cell_of(self.fraction(self.range.max), bits),
        )
    }

    /// Native bounds `[lo, hi)` of a cell at the given precision.
    pub fn cell_bounds(&self, cell: u64, bits: u8) -> NumericRange {
        let width = self.bounds.width() / cell_count(bits) as f64;
        let lo = self.bounds.min + cell as f64 * width;
        NumericRange::unchecked(lo, lo + width)
    }

    fn fraction(&self, value: f64) -> f64 {
        let width = self.bounds.width();
        if width <= 0.0 {
            return 0.0;
        }
        ((value - self.bounds.min) / width).clamp(0.0, 1.0)
    }
}

pub(crate) fn cell_count(bits: u8) -> u64 {
    1u64 << bits
}

fn cell_of(fraction: f64, bits: u8) -> u64 {
    if bits == 0 {
        return 0;
    }
    let cells = cell_count(bits);
    let scaled = fraction * cells as f64;
    let nearest = scaled.round();
    let snapped = if (scaled - nearest).abs() < EDGE_EPSILON {
        nearest
    } else {
        scaled
    };
    (snapped.floor().max(0.0) as u64).min(cells - 1)
}
