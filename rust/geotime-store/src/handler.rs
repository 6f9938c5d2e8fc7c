//! Field handlers: pluggable converters between an entity's native attributes
//! and the common index values of an index model.
//!
//! A [`NativeFieldHandler`] reads a pass-through attribute the index does not
//! need but the adapter must round-trip (for example a record identifier). An
//! [`IndexFieldHandler`] converts native attributes into a
//! [`CommonIndexValue`] and back, and declares which dimension field IDs of
//! an index model its value feeds. Adapters bind handlers to models through
//! these declarations, without knowing the model at compile time.
//!
//! The stock handlers ([`GeometryFieldHandler`], [`TimeFieldHandler`],
//! [`TimeRangeFieldHandler`]) read the entity through plain accessor
//! functions. Their persisted state is the visibility label they stamp on
//! produced values; without a label the state is empty.

use chrono::{DateTime, Utc};
use geo_types::Geometry;
use geotime_common::{Result, error::Error, verify_data};

use crate::{
    field::{FieldId, FieldValue, PersistentValue},
    model::{GEOMETRY_FIELD_ID, TIME_FIELD_ID},
    value::{CommonIndexValue, GeometryWrapper, Time},
};

/// Reads one pass-through attribute of an entity.
pub trait NativeFieldHandler<T>: Send + Sync {
    fn field_id(&self) -> &FieldId;

    fn field_value(&self, entry: &T) -> FieldValue;
}

/// Converts native attributes of `T` into a common index value and back.
pub trait IndexFieldHandler<T>: Send + Sync {
    /// Native attributes consumed by [`Self::to_index_value`] and produced by
    /// [`Self::to_native_values`].
    fn native_field_ids(&self) -> &[FieldId];

    /// Dimension field IDs of an index model that the produced value feeds.
    fn supported_dimension_field_ids(&self) -> &[FieldId];

    /// Builds the common index value of `entry`.
    ///
    /// # Errors
    ///
    /// Fails when the entity has no value from which an extent can be
    /// computed; the entity should then be rejected on its own.
    fn to_index_value(&self, entry: &T) -> Result<CommonIndexValue>;

    /// Inverse of [`Self::to_index_value`], used to reconstruct entities.
    fn to_native_values(&self, value: &CommonIndexValue) -> Result<Vec<PersistentValue>>;

    /// Auxiliary configuration persisted beside the adapter definition.
    fn serialize_state(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Restores the state written by [`Self::serialize_state`].
    fn deserialize_state(&mut self, state: &[u8]) -> Result<()> {
        verify_data!(state, state.is_empty());
        Ok(())
    }
}

/// Feeds the spatial dimensions from a geometry attribute.
pub struct GeometryFieldHandler<T> {
    native_ids: [FieldId; 1],
    dimension_ids: [FieldId; 1],
    accessor: fn(&T) -> Option<&Geometry<f64>>,
    visibility: Vec<u8>,
}

impl<T> GeometryFieldHandler<T> {
    pub fn new(native_id: FieldId, accessor: fn(&T) -> Option<&Geometry<f64>>) -> Self {
        GeometryFieldHandler {
            native_ids: [native_id],
            dimension_ids: [FieldId::new(GEOMETRY_FIELD_ID)],
            accessor,
            visibility: Vec::new(),
        }
    }

    /// Feeds `id` instead of the stock geometry field.
    pub fn with_dimension_field(mut self, id: FieldId) -> Self {
        self.dimension_ids = [id];
        self
    }

    pub fn with_visibility(mut self, visibility: impl Into<Vec<u8>>) -> Self {
        self.visibility = visibility.into();
        self
    }
}

impl<T> IndexFieldHandler<T> for GeometryFieldHandler<T> {
    fn native_field_ids(&self) -> &[FieldId] {
        &self.native_ids
    }

    fn supported_dimension_field_ids(&self) -> &[FieldId] {
        &self.dimension_ids
    }

    fn to_index_value(&self, entry: &T) -> Result<CommonIndexValue> {
        let geometry = (self.accessor)(entry)
            .ok_or_else(|| Error::empty_extent(self.native_ids[0].as_str()))?;
        Ok(GeometryWrapper::new(geometry.clone())
            .with_visibility(self.visibility.clone())
            .into())
    }

    fn to_native_values(&self, value: &CommonIndexValue) -> Result<Vec<PersistentValue>> {
        let wrapper = value
            .as_geometry()
            .ok_or_else(|| unexpected(&self.native_ids[0], "geometry", value))?;
        Ok(vec![PersistentValue::new(
            self.native_ids[0].clone(),
            FieldValue::Geometry(wrapper.geometry.clone()),
        )])
    }

    fn serialize_state(&self) -> Vec<u8> {
        self.visibility.clone()
    }

    fn deserialize_state(&mut self, state: &[u8]) -> Result<()> {
        self.visibility = state.to_vec();
        Ok(())
    }
}

/// Feeds the time dimension from a single timestamp attribute.
pub struct TimeFieldHandler<T> {
    native_ids: [FieldId; 1],
    dimension_ids: [FieldId; 1],
    accessor: fn(&T) -> Option<DateTime<Utc>>,
    visibility: Vec<u8>,
}

impl<T> TimeFieldHandler<T> {
    pub fn new(native_id: FieldId, accessor: fn(&T) -> Option<DateTime<Utc>>) -> Self {
        TimeFieldHandler {
            native_ids: [native_id],
            dimension_ids: [FieldId::new(TIME_FIELD_ID)],
            accessor,
            visibility: Vec::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: impl Into<Vec<u8>>) -> Self {
        self.visibility = visibility.into();
        self
    }
}

impl<T> IndexFieldHandler<T> for TimeFieldHandler<T> {
    fn native_field_ids(&self) -> &[FieldId] {
        &self.native_ids
    }

    fn supported_dimension_field_ids(&self) -> &[FieldId] {
        &self.dimension_ids
    }

    fn to_index_value(&self, entry: &T) -> Result<CommonIndexValue> {
        let time = (self.accessor)(entry)
            .ok_or_else(|| Error::empty_extent(self.native_ids[0].as_str()))?;
        Ok(Time::instant(time.timestamp_millis())
            .with_visibility(self.visibility.clone())
            .into())
    }

    fn to_native_values(&self, value: &CommonIndexValue) -> Result<Vec<PersistentValue>> {
        let time = match value.as_time() {
            Some(Time::Instant { millis, .. }) => *millis,
            _ => return Err(unexpected(&self.native_ids[0], "time instant", value)),
        };
        Ok(vec![PersistentValue::new(
            self.native_ids[0].clone(),
            FieldValue::Time(to_datetime(&self.native_ids[0], time)?),
        )])
    }

    fn serialize_state(&self) -> Vec<u8> {
        self.visibility.clone()
    }

    fn deserialize_state(&mut self, state: &[u8]) -> Result<()> {
        self.visibility = state.to_vec();
        Ok(())
    }
}

/// Feeds the time dimension from a pair of start and end attributes.
pub struct TimeRangeFieldHandler<T> {
    native_ids: [FieldId; 2],
    dimension_ids: [FieldId; 1],
    start: fn(&T) -> Option<DateTime<Utc>>,
    end: fn(&T) -> Option<DateTime<Utc>>,
    visibility: Vec<u8>,
}

impl<T> TimeRangeFieldHandler<T> {
    pub fn new(
        start_id: FieldId,
        start: fn(&T) -> Option<DateTime<Utc>>,
        end_id: FieldId,
        end: fn(&T) -> Option<DateTime<Utc>>,
    ) -> Self {
        TimeRangeFieldHandler {
            native_ids: [start_id, end_id],
            dimension_ids: [FieldId::new(TIME_FIELD_ID)],
            start,
            end,
            visibility: Vec::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: impl Into<Vec<u8>>) -> Self {
        self.visibility = visibility.into();
        self
    }
}

impl<T> IndexFieldHandler<T> for TimeRangeFieldHandler<T> {
    fn native_field_ids(&self) -> &[FieldId] {
        &self.native_ids
    }

    fn supported_dimension_field_ids(&self) -> &[FieldId] {
        &self.dimension_ids
    }

    fn to_index_value(&self, entry: &T) -> Result<CommonIndexValue> {
        let [start_id, end_id] = &self.native_ids;
        let start = (self.start)(entry).ok_or_else(|| Error::empty_extent(start_id.as_str()))?;
        let end = (self.end)(entry).ok_or_else(|| Error::empty_extent(end_id.as_str()))?;
        Ok(Time::range(start.timestamp_millis(), end.timestamp_millis())?
            .with_visibility(self.visibility.clone())
            .into())
    }

    fn to_native_values(&self, value: &CommonIndexValue) -> Result<Vec<PersistentValue>> {
        let [start_id, end_id] = &self.native_ids;
        let time = value
            .as_time()
            .ok_or_else(|| unexpected(start_id, "time range", value))?;
        Ok(vec![
            PersistentValue::new(
                start_id.clone(),
                FieldValue::Time(to_datetime(start_id, time.start())?),
            ),
            PersistentValue::new(
                end_id.clone(),
                FieldValue::Time(to_datetime(end_id, time.end())?),
            ),
        ])
    }

    fn serialize_state(&self) -> Vec<u8> {
        self.visibility.clone()
    }

    fn deserialize_state(&mut self, state: &[u8]) -> Result<()> {
        self.visibility = state.to_vec();
        Ok(())
    }
}

/// Pass-through handler reading an attribute through an accessor function.
pub struct AccessorFieldHandler<T> {
    id: FieldId,
    accessor: fn(&T) -> FieldValue,
}

impl<T> AccessorFieldHandler<T> {
    pub fn new(id: FieldId, accessor: fn(&T) -> FieldValue) -> Self {
        AccessorFieldHandler { id, accessor }
    }
}

impl<T> NativeFieldHandler<T> for AccessorFieldHandler<T> {
    fn field_id(&self) -> &FieldId {
        &self.id
    }

    fn field_value(&self, entry: &T) -> FieldValue {
        (self.accessor)(entry)
    }
}

fn unexpected(field: &FieldId, expected: &str, value: &CommonIndexValue) -> Error {
    Error::invalid_data(
        field.as_str(),
        format!("expected a {expected} value, got {}", value.type_name()),
    )
}

fn to_datetime(field: &FieldId, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::invalid_data(field.as_str(), format!("{millis} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Point;

    struct Event {
        location: Option<Geometry<f64>>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    }

    fn location(e: &Event) -> Option<&Geometry<f64>> {
        e.location.as_ref()
    }

    fn start(e: &Event) -> Option<DateTime<Utc>> {
        Some(e.start)
    }

    fn end(e: &Event) -> Option<DateTime<Utc>> {
        Some(e.end)
    }

    fn event() -> Event {
        Event {
            location: Some(Point::new(43.454, 28.232).into()),
            start: DateTime::from_timestamp_millis(1_333_459_823_304).unwrap(),
            end: DateTime::from_timestamp_millis(1_333_463_423_304).unwrap(),
        }
    }

    #[test]
    fn test_time_range_reconstructs_distinct_end() {
        let handler = TimeRangeFieldHandler::new("startTime".into(), start, "endTime".into(), end);
        let e = event();
        let value = handler.to_index_value(&e).unwrap();
        let natives = handler.to_native_values(&value).unwrap();
        assert_eq!(natives.len(), 2);
        assert_eq!(natives[0].id.as_str(), "startTime");
        assert_eq!(natives[0].value, FieldValue::Time(e.start));
        assert_eq!(natives[1].id.as_str(), "endTime");
        assert_eq!(natives[1].value, FieldValue::Time(e.end));
        assert_ne!(natives[0].value, natives[1].value);
    }

    #[test]
    fn test_time_range_rejects_inverted_range() {
        let handler = TimeRangeFieldHandler::new("startTime".into(), end, "endTime".into(), start);
        assert!(handler.to_index_value(&event()).is_err());
    }

    #[test]
    fn test_instant_handler() {
        let handler = TimeFieldHandler::new("startTime".into(), start);
        let value = handler.to_index_value(&event()).unwrap();
        assert_eq!(value, CommonIndexValue::Time(Time::instant(1_333_459_823_304)));
        assert_eq!(
            handler.supported_dimension_field_ids(),
            &[FieldId::new(TIME_FIELD_ID)]
        );
        let range = CommonIndexValue::Time(Time::range(1, 2).unwrap());
        assert!(handler.to_native_values(&range).is_err());
    }

    #[test]
    fn test_missing_geometry_is_empty_extent() {
        let handler = GeometryFieldHandler::new("myGeo".into(), location);
        let mut e = event();
        e.location = None;
        let err = handler.to_index_value(&e).unwrap_err();
        assert!(err.is_entity_error());
    }

    #[test]
    fn test_visibility_state() {
        let mut handler = GeometryFieldHandler::new("myGeo".into(), location);
        assert!(handler.serialize_state().is_empty());
        handler.deserialize_state(b"public").unwrap();
        let value = handler.to_index_value(&event()).unwrap();
        assert_eq!(value.visibility(), b"public");
        assert_eq!(handler.serialize_state(), b"public".to_vec());
    }

    #[test]
    fn test_default_state_is_empty() {
        struct Fixed;
        impl IndexFieldHandler<Event> for Fixed {
            fn native_field_ids(&self) -> &[FieldId] {
                &[]
            }
            fn supported_dimension_field_ids(&self) -> &[FieldId] {
                &[]
            }
            fn to_index_value(&self, _: &Event) -> Result<CommonIndexValue> {
                Ok(Time::instant(0).into())
            }
            fn to_native_values(&self, _: &CommonIndexValue) -> Result<Vec<PersistentValue>> {
                Ok(vec![])
            }
        }
        let mut fixed = Fixed;
        assert!(fixed.serialize_state().is_empty());
        assert!(fixed.deserialize_state(&[]).is_ok());
        assert!(fixed.deserialize_state(&[1]).is_err());
    }
}
