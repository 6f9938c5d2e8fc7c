//! Geometry preparation for insertion: precision reduction, extents and the
//! cell-touch test used to refine a bounding-box decomposition.

use geo::{BoundingRect, Intersects, MapCoords, RemoveRepeatedPoints};
use geo_types::{Coord, Geometry, Rect};
use geotime_common::{Result, error::Error};
use geotime_index_core::{CellRefinement, EDGE_EPSILON, NumericRange};

/// Rounds all coordinates to `precision` decimal places and drops vertices
/// that collapse onto their predecessor.
///
/// A negative precision rounds to tens, hundreds, and so on.
pub fn reduce_precision(geometry: &Geometry<f64>, precision: i32) -> Geometry<f64> {
    let scale = 10f64.powi(precision);
    geometry
        .map_coords(|c| Coord {
            x: (c.x * scale).round() / scale,
            y: (c.y * scale).round() / scale,
        })
        .remove_repeated_points()
}

/// The bounding rectangle of a geometry.
///
/// # Errors
///
/// Returns an `EmptyExtent` error when the geometry has no coordinates or a
/// coordinate is not finite.
pub fn envelope(geometry: &Geometry<f64>, field: &str) -> Result<Rect<f64>> {
    let rect = geometry
        .bounding_rect()
        .ok_or_else(|| Error::empty_extent(field))?;
    let (min, max) = (rect.min(), rect.max());
    if [min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
        Ok(rect)
    } else {
        Err(Error::empty_extent(field))
    }
}

/// The extent of `rect` along a coordinate axis (0 = x, 1 = y).
pub fn axis_range(rect: &Rect<f64>, axis: u8) -> Result<NumericRange> {
    match axis {
        0 => NumericRange::new(rect.min().x, rect.max().x),
        1 => NumericRange::new(rect.min().y, rect.max().y),
        _ => Err(Error::invalid_arg(
            "axis",
            format!("geometries have two coordinate axes, {axis} requested"),
        )),
    }
}

/// Accepts the cells of a two-dimensional decomposition that a geometry
/// actually touches.
///
/// Cells are half-open, so the tested rectangle is the cell shifted down by
/// [`EDGE_EPSILON`] of its width: a vertex lying on (or within epsilon below)
/// a cell's upper edge belongs to the next cell, consistent with how the
/// strategy snaps range bounds.
pub(crate) struct GeometryRefinement<'a> {
    geometry: &'a Geometry<f64>,
    dimensions: [usize; 2],
}

impl<'a> GeometryRefinement<'a> {
    /// `x_dim` and `y_dim` are the strategy dimension positions of the
    /// geometry's x and y axes.
    pub fn new(geometry: &'a Geometry<f64>, x_dim: usize, y_dim: usize) -> Self {
        GeometryRefinement {
            geometry,
            dimensions: [x_dim, y_dim],
        }
    }
}

impl CellRefinement for GeometryRefinement<'_> {
    fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    fn touches(&self, cell: &[NumericRange]) -> bool {
        let (x, y) = (cell[0], cell[1]);
        let (ex, ey) = (x.width() * EDGE_EPSILON, y.width() * EDGE_EPSILON);
        let rect = Rect::new(
            Coord {
                x: x.min - ex,
                y: y.min - ey,
            },
            Coord {
                x: x.max - ex,
                y: y.max - ey,
            },
        );
        self.geometry.intersects(&rect)
    }
}
