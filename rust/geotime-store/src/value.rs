//! Common index values: the normalized form of entity attributes consumed by
//! the index, independent of the attribute's native type.

use geo_types::Geometry;
use geotime_common::{Result, error::Error, verify_arg};
use geotime_index_core::NumericRange;

/// A value feeding one or more dimension fields of an index model.
#[derive(Debug, Clone, PartialEq)]
pub enum CommonIndexValue {
    /// Feeds every spatial dimension of the model.
    Geometry(GeometryWrapper),
    /// Feeds the time dimension.
    Time(Time),
}

/// Classification of common index values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Geometry,
    Time,
}

impl CommonIndexValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            CommonIndexValue::Geometry(_) => ValueKind::Geometry,
            CommonIndexValue::Time(_) => ValueKind::Time,
        }
    }

    pub fn visibility(&self) -> &[u8] {
        match self {
            CommonIndexValue::Geometry(g) => &g.visibility,
            CommonIndexValue::Time(t) => t.visibility(),
        }
    }

    pub fn as_geometry(&self) -> Option<&GeometryWrapper> {
        match self {
            CommonIndexValue::Geometry(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&Time> {
        match self {
            CommonIndexValue::Time(t) => Some(t),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CommonIndexValue::Geometry(_) => "geometry",
            CommonIndexValue::Time(_) => "time",
        }
    }
}

impl From<GeometryWrapper> for CommonIndexValue {
    fn from(value: GeometryWrapper) -> Self {
        CommonIndexValue::Geometry(value)
    }
}

impl From<Time> for CommonIndexValue {
    fn from(value: Time) -> Self {
        CommonIndexValue::Time(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryWrapper {
    pub geometry: Geometry<f64>,
    pub visibility: Vec<u8>,
}

impl GeometryWrapper {
    pub fn new(geometry: Geometry<f64>) -> GeometryWrapper {
        GeometryWrapper {
            geometry,
            visibility: Vec::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: impl Into<Vec<u8>>) -> Self {
        self.visibility = visibility.into();
        self
    }
}

/// A point in time or a closed time range, in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Time {
    Instant {
        millis: i64,
        visibility: Vec<u8>,
    },
    Range {
        start: i64,
        end: i64,
        visibility: Vec<u8>,
    },
}

impl Time {
    pub fn instant(millis: i64) -> Time {
        Time::Instant {
            millis,
            visibility: Vec::new(),
        }
    }

    /// Creates a range, verifying `start <= end`.
    pub fn range(start: i64, end: i64) -> Result<Time> {
        verify_arg!(end, start <= end);
        Ok(Time::Range {
            start,
            end,
            visibility: Vec::new(),
        })
    }

    pub fn with_visibility(self, visibility: impl Into<Vec<u8>>) -> Self {
        let visibility = visibility.into();
        match self {
            Time::Instant { millis, .. } => Time::Instant { millis, visibility },
            Time::Range { start, end, .. } => Time::Range {
                start,
                end,
                visibility,
            },
        }
    }

    pub fn visibility(&self) -> &[u8] {
        match self {
            Time::Instant { visibility, .. } | Time::Range { visibility, .. } => visibility,
        }
    }

    pub fn start(&self) -> i64 {
        match self {
            Time::Instant { millis, .. } => *millis,
            Time::Range { start, .. } => *start,
        }
    }

    pub fn end(&self) -> i64 {
        match self {
            Time::Instant { millis, .. } => *millis,
            Time::Range { end, .. } => *end,
        }
    }

    /// The numeric extent along the time dimension; an instant is a zero-width range.
    pub fn to_range(&self) -> Result<NumericRange> {
        NumericRange::new(self.start() as f64, self.end() as f64)
            .map_err(|_| Error::invalid_data("time", format!("{self:?} has start after end")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_validation() {
        assert!(Time::range(10, 5).is_err());
        let range = Time::range(5, 10).unwrap().with_visibility(b"admin".to_vec());
        assert_eq!(range.start(), 5);
        assert_eq!(range.end(), 10);
        assert_eq!(range.visibility(), b"admin");
        assert_eq!(range.to_range().unwrap(), NumericRange::new(5.0, 10.0).unwrap());
    }

    #[test]
    fn test_instant_is_point() {
        let instant = Time::instant(42);
        assert!(instant.to_range().unwrap().is_point());
        let value = CommonIndexValue::from(instant);
        assert_eq!(value.type_name(), "time");
        assert_eq!(value.kind(), ValueKind::Time);
        assert!(value.as_geometry().is_none());
        assert!(value.visibility().is_empty());
    }
}
