//! Binary codecs for native field values.
//!
//! Numbers are written big-endian, times as milliseconds since the Unix epoch,
//! geometries as WKT text. A `Null` value is written as an empty payload, and
//! an empty payload reads back as `Null` for every codec except `String` and
//! `Binary`, whose empty values are legitimate.

use std::str::FromStr;

use chrono::DateTime;
use geo_types::Geometry;
use geotime_common::{Result, error::Error};
use wkt::ToWkt;

use crate::field::FieldValue;

/// Serializes a native value of one field.
pub trait FieldWriter: Send + Sync {
    fn write(&self, value: &FieldValue) -> Result<Vec<u8>>;
}

/// Deserializes a native value of one field.
pub trait FieldReader: Send + Sync {
    fn read(&self, bytes: &[u8]) -> Result<FieldValue>;
}

/// The stock codecs, one per [`FieldValue`] type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCodec {
    Boolean,
    Long,
    Double,
    String,
    Time,
    Geometry,
    Binary,
}

impl FieldCodec {
    pub fn name(self) -> &'static str {
        match self {
            FieldCodec::Boolean => "boolean",
            FieldCodec::Long => "long",
            FieldCodec::Double => "double",
            FieldCodec::String => "string",
            FieldCodec::Time => "time",
            FieldCodec::Geometry => "geometry",
            FieldCodec::Binary => "binary",
        }
    }

    fn mismatch(self, value: &FieldValue) -> Error {
        Error::invalid_arg(
            "value",
            format!("{} codec can not write a {} value", self.name(), value.type_name()),
        )
    }
}

impl FieldWriter for FieldCodec {
    fn write(&self, value: &FieldValue) -> Result<Vec<u8>> {
        match (self, value) {
            (_, FieldValue::Null) => Ok(Vec::new()),
            (FieldCodec::Boolean, FieldValue::Boolean(v)) => Ok(vec![*v as u8]),
            (FieldCodec::Long, FieldValue::Long(v)) => Ok(v.to_be_bytes().to_vec()),
            (FieldCodec::Double, FieldValue::Double(v)) => Ok(v.to_be_bytes().to_vec()),
            (FieldCodec::String, FieldValue::String(v)) => Ok(v.as_bytes().to_vec()),
            (FieldCodec::Time, FieldValue::Time(v)) => {
                Ok(v.timestamp_millis().to_be_bytes().to_vec())
            }
            (FieldCodec::Geometry, FieldValue::Geometry(v)) => Ok(v.wkt_string().into_bytes()),
            (FieldCodec::Binary, FieldValue::Binary(v)) => Ok(v.clone()),
            (codec, value) => Err(codec.mismatch(value)),
        }
    }
}

impl FieldReader for FieldCodec {
    fn read(&self, bytes: &[u8]) -> Result<FieldValue> {
        if bytes.is_empty() && !matches!(self, FieldCodec::String | FieldCodec::Binary) {
            return Ok(FieldValue::Null);
        }
        match self {
            FieldCodec::Boolean => match bytes {
                [0] => Ok(FieldValue::Boolean(false)),
                [1] => Ok(FieldValue::Boolean(true)),
                _ => Err(Error::invalid_data("boolean", "expected a single 0 or 1 byte")),
            },
            FieldCodec::Long => Ok(FieldValue::Long(i64::from_be_bytes(fixed(bytes, "long")?))),
            FieldCodec::Double => Ok(FieldValue::Double(f64::from_be_bytes(fixed(
                bytes, "double",
            )?))),
            FieldCodec::String => String::from_utf8(bytes.to_vec())
                .map(FieldValue::String)
                .map_err(|e| Error::invalid_data("string", e.to_string())),
            FieldCodec::Time => {
                let millis = i64::from_be_bytes(fixed(bytes, "time")?);
                DateTime::from_timestamp_millis(millis)
                    .map(FieldValue::Time)
                    .ok_or_else(|| Error::invalid_data("time", format!("{millis} is out of range")))
            }
            FieldCodec::Geometry => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| Error::invalid_data("geometry", e.to_string()))?;
                parse_wkt(text).map(FieldValue::Geometry)
            }
            FieldCodec::Binary => Ok(FieldValue::Binary(bytes.to_vec())),
        }
    }
}

/// Parses WKT text into a geometry.
pub fn parse_wkt(text: &str) -> Result<Geometry<f64>> {
    let parsed = wkt::Wkt::<f64>::from_str(text)
        .map_err(|e| Error::invalid_data("geometry", e.to_string()))?;
    parsed
        .try_into()
        .map_err(|e: wkt::conversion::Error| Error::invalid_data("geometry", format!("{e:?}")))
}

fn fixed(bytes: &[u8], name: &str) -> Result<[u8; 8]> {
    bytes
        .try_into()
        .map_err(|_| Error::invalid_data(name, format!("expected 8 bytes, got {}", bytes.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Point, line_string};

    #[test]
    fn test_numbers_are_big_endian() {
        assert_eq!(
            FieldCodec::Long.write(&FieldValue::Long(258)).unwrap(),
            vec![0, 0, 0, 0, 0, 0, 1, 2]
        );
        assert_eq!(
            FieldCodec::Double.read(&1.5f64.to_be_bytes()).unwrap(),
            FieldValue::Double(1.5)
        );
    }

    #[test]
    fn test_time_is_millis() {
        let time = DateTime::from_timestamp_millis(352_771_200_000).unwrap();
        let bytes = FieldCodec::Time.write(&FieldValue::Time(time)).unwrap();
        assert_eq!(bytes, 352_771_200_000i64.to_be_bytes().to_vec());
        assert_eq!(FieldCodec::Time.read(&bytes).unwrap(), FieldValue::Time(time));
    }

    #[test]
    fn test_geometry_as_wkt() {
        let line = Geometry::LineString(line_string![(x: 1.0, y: 2.0), (x: 3.0, y: 4.0)]);
        let bytes = FieldCodec::Geometry.write(&FieldValue::Geometry(line.clone())).unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().starts_with("LINESTRING"));
        assert_eq!(FieldCodec::Geometry.read(&bytes).unwrap(), FieldValue::Geometry(line));

        assert!(FieldCodec::Geometry.read(b"POINT(1").is_err());
    }

    #[test]
    fn test_null_and_empty() {
        assert!(FieldCodec::Long.write(&FieldValue::Null).unwrap().is_empty());
        assert_eq!(FieldCodec::Long.read(&[]).unwrap(), FieldValue::Null);
        assert_eq!(
            FieldCodec::String.read(&[]).unwrap(),
            FieldValue::String(String::new())
        );
    }

    #[test]
    fn test_mismatch_and_corrupt_input() {
        let point = FieldValue::Geometry(Point::new(1.0, 2.0).into());
        assert!(FieldCodec::Long.write(&point).is_err());
        assert!(FieldCodec::Long.read(&[1, 2, 3]).is_err());
        assert!(FieldCodec::Boolean.read(&[7]).is_err());
        assert!(FieldCodec::String.read(&[0xff, 0xfe]).is_err());
    }
}
