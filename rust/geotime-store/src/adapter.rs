//! Data adapters: the per-entity-type surface the storage layer talks to.

use ahash::AHashMap;
use geotime_common::{Result, error::Error, verify_data};

use crate::{
    codec::{FieldReader, FieldWriter},
    encoding::{self, PersistenceEncoding},
    field::{FieldId, PersistentValue},
    handler::{IndexFieldHandler, NativeFieldHandler},
    model::IndexModel,
};

/// Accumulates native field values and instantiates an entity from them.
pub trait RowBuilder<T> {
    fn set_field(&mut self, value: PersistentValue);

    fn build(&mut self, data_id: &[u8]) -> Result<T>;
}

/// Describes how entities of type `T` participate in an index.
pub trait DataAdapter<T>: Send + Sync {
    fn adapter_id(&self) -> &str;

    /// Whether `entry` can be encoded by this adapter.
    fn is_supported(&self, _entry: &T) -> bool {
        true
    }

    /// The unique row identifier of `entry`.
    fn data_id(&self, entry: &T) -> Vec<u8>;

    /// Codec for reading the native field `id`.
    fn reader(&self, id: &FieldId) -> Option<&dyn FieldReader>;

    /// Codec for writing the native field `id`.
    fn writer(&self, id: &FieldId) -> Option<&dyn FieldWriter>;

    fn new_builder(&self) -> Box<dyn RowBuilder<T>>;

    fn field_handlers(&self) -> &FieldHandlers<T>;

    /// Maps `entry` onto the fields of `model`. See [`encoding::encode`].
    fn encode(&self, entry: &T, model: &IndexModel) -> Result<PersistenceEncoding> {
        encoding::encode(self, entry, model)
    }

    /// Rebuilds an entity from its encoding. See [`encoding::decode`].
    fn decode(&self, encoding: &PersistenceEncoding) -> Result<T> {
        encoding::decode(self, encoding)
    }
}

/// The field handlers of one adapter, indexed by the dimension field IDs they
/// supply.
pub struct FieldHandlers<T> {
    index_handlers: Vec<Box<dyn IndexFieldHandler<T>>>,
    native_handlers: Vec<Box<dyn NativeFieldHandler<T>>>,
    by_dimension_field: AHashMap<FieldId, usize>,
}

impl<T> FieldHandlers<T> {
    /// # Errors
    ///
    /// Fails if two index handlers claim the same dimension field ID.
    pub fn new(
        index_handlers: Vec<Box<dyn IndexFieldHandler<T>>>,
        native_handlers: Vec<Box<dyn NativeFieldHandler<T>>>,
    ) -> Result<FieldHandlers<T>> {
        let mut by_dimension_field = AHashMap::new();
        for (pos, handler) in index_handlers.iter().enumerate() {
            for id in handler.supported_dimension_field_ids() {
                if by_dimension_field.insert(id.clone(), pos).is_some() {
                    return Err(Error::invalid_arg(
                        "index_handlers",
                        format!("dimension field '{id}' is supplied by more than one handler"),
                    ));
                }
            }
        }
        Ok(FieldHandlers {
            index_handlers,
            native_handlers,
            by_dimension_field,
        })
    }

    /// The handler supplying the dimension field `id`, if any.
    pub fn handler_for(&self, id: &FieldId) -> Option<&dyn IndexFieldHandler<T>> {
        self.handler_position(id)
            .map(|pos| self.index_handlers[pos].as_ref())
    }

    pub(crate) fn handler_position(&self, id: &FieldId) -> Option<usize> {
        self.by_dimension_field.get(id).copied()
    }

    pub fn index_handlers(&self) -> &[Box<dyn IndexFieldHandler<T>>] {
        &self.index_handlers
    }

    pub fn native_handlers(&self) -> &[Box<dyn NativeFieldHandler<T>>] {
        &self.native_handlers
    }

    /// Dimension field IDs supplied by any handler.
    pub fn dimension_field_ids(&self) -> impl Iterator<Item = &FieldId> {
        self.index_handlers
            .iter()
            .flat_map(|h| h.supported_dimension_field_ids())
    }

    /// Concatenates the index handlers' states, each prefixed by its
    /// length as a little-endian `u32`, in handler order.
    pub fn serialize_state(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for handler in &self.index_handlers {
            let state = handler.serialize_state();
            out.extend_from_slice(&(state.len() as u32).to_le_bytes());
            out.extend_from_slice(&state);
        }
        out
    }

    /// Restores states written by [`Self::serialize_state`].
    pub fn deserialize_state(&mut self, mut bytes: &[u8]) -> Result<()> {
        for handler in self.index_handlers.iter_mut() {
            verify_data!(handler_state, bytes.len() >= 4);
            let (len, rest) = bytes.split_at(4);
            let len = u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize;
            verify_data!(handler_state, rest.len() >= len);
            let (state, rest) = rest.split_at(len);
            handler.deserialize_state(state)?;
            bytes = rest;
        }
        verify_data!(handler_state, bytes.is_empty());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field::FieldValue,
        handler::{AccessorFieldHandler, GeometryFieldHandler, TimeFieldHandler},
        model::{GEOMETRY_FIELD_ID, TIME_FIELD_ID},
    };
    use chrono::{DateTime, Utc};
    use geo_types::Geometry;

    struct Sample {
        geometry: Geometry<f64>,
        time: DateTime<Utc>,
    }

    fn geometry(s: &Sample) -> Option<&Geometry<f64>> {
        Some(&s.geometry)
    }

    fn time(s: &Sample) -> Option<DateTime<Utc>> {
        Some(s.time)
    }

    fn handlers() -> FieldHandlers<Sample> {
        FieldHandlers::new(
            vec![
                Box::new(GeometryFieldHandler::new("geom".into(), geometry).with_visibility("a")),
                Box::new(TimeFieldHandler::new("time".into(), time)),
            ],
            vec![Box::new(AccessorFieldHandler::new("id".into(), |_: &Sample| {
                FieldValue::Null
            }))],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_by_dimension_field() {
        let handlers = handlers();
        let geom = handlers.handler_for(&GEOMETRY_FIELD_ID.into()).unwrap();
        assert_eq!(geom.native_field_ids(), &[FieldId::new("geom")]);
        assert!(handlers.handler_for(&TIME_FIELD_ID.into()).is_some());
        assert!(handlers.handler_for(&"elevation".into()).is_none());
        assert_eq!(handlers.dimension_field_ids().count(), 2);
        assert_eq!(handlers.native_handlers().len(), 1);
    }

    #[test]
    fn test_duplicate_dimension_field_is_rejected() {
        let result = FieldHandlers::<Sample>::new(
            vec![
                Box::new(TimeFieldHandler::new("start".into(), time)),
                Box::new(TimeFieldHandler::new("end".into(), time)),
            ],
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_state_is_length_prefixed() {
        let source = handlers();
        let state = source.serialize_state();
        assert_eq!(state, vec![1, 0, 0, 0, b'a', 0, 0, 0, 0]);

        let mut restored = FieldHandlers::<Sample>::new(
            vec![
                Box::new(GeometryFieldHandler::new("geom".into(), geometry)),
                Box::new(TimeFieldHandler::new("time".into(), time)),
            ],
            vec![],
        )
        .unwrap();
        restored.deserialize_state(&state).unwrap();
        assert_eq!(restored.serialize_state(), state);

        assert!(restored.deserialize_state(&state[..3]).is_err());
        assert!(restored.deserialize_state(&[state.as_slice(), &[0]].concat()).is_err());
    }
}
