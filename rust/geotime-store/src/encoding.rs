//! The encoding pipeline: entity → [`PersistenceEncoding`] → insertion IDs,
//! and the reverse path from an encoding back to an entity.

use std::sync::Arc;

use geo_types::{Geometry, Rect};
use geotime_common::{Result, error::Error, verify_arg};
use geotime_index_core::{CellRefinement, InsertionId, NumericRange};
use log::trace;

use crate::{
    adapter::DataAdapter,
    field::{FieldId, PersistentValue},
    geometry::{GeometryRefinement, axis_range, envelope, reduce_precision},
    index::Index,
    model::{DimensionField, IndexModel},
    value::CommonIndexValue,
};

/// Per-entity snapshot of the values an index needs, plus the pass-through
/// native values required to rebuild the entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceEncoding {
    data_id: Vec<u8>,
    adapter_id: String,
    common_data: Vec<(FieldId, CommonIndexValue)>,
    native_data: Vec<PersistentValue>,
}

impl PersistenceEncoding {
    pub fn new(
        data_id: Vec<u8>,
        adapter_id: impl Into<String>,
        common_data: Vec<(FieldId, CommonIndexValue)>,
        native_data: Vec<PersistentValue>,
    ) -> PersistenceEncoding {
        PersistenceEncoding {
            data_id,
            adapter_id: adapter_id.into(),
            common_data,
            native_data,
        }
    }

    pub fn data_id(&self) -> &[u8] {
        &self.data_id
    }

    pub fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    /// Common index values keyed by dimension field ID, in model order.
    pub fn common_data(&self) -> &[(FieldId, CommonIndexValue)] {
        &self.common_data
    }

    pub fn native_data(&self) -> &[PersistentValue] {
        &self.native_data
    }

    pub fn common_value(&self, id: &FieldId) -> Option<&CommonIndexValue> {
        self.common_data
            .iter()
            .find(|(field, _)| field == id)
            .map(|(_, value)| value)
    }

    /// Decomposes the encoded values into the insertion IDs of `index`.
    ///
    /// Each dimension field of the index model contributes one numeric range:
    /// a time instant a zero-width range, a time range `[start, end]`, and a
    /// geometry its envelope along the field's axis, after rounding
    /// coordinates to the field's geometry precision. The geometry itself is
    /// handed to the strategy so that only the cells its shape touches are
    /// emitted, not every cell of its envelope.
    ///
    /// # Errors
    ///
    /// * `IncompleteEncoding` if a dimension field of the model has no value.
    /// * `EmptyExtent` if a geometry has no computable envelope.
    /// * `InvalidFormat` if a value does not fit the dimension it feeds.
    pub fn insertion_ids(&self, index: &Index) -> Result<Vec<InsertionId>> {
        let model = index.model();
        let mut geometries: Vec<PreparedGeometry> = Vec::new();
        let mut ranges = Vec::with_capacity(model.dimension_count());
        for field in model.fields() {
            let value = self.common_value(field.id()).ok_or_else(|| {
                Error::incomplete_encoding(&self.adapter_id, field.id().as_str())
            })?;
            let range = match (field.spatial_axis(), value) {
                (Some(axis), CommonIndexValue::Geometry(wrapper)) => {
                    let pos = match geometries.iter().position(|g| &g.id == field.id()) {
                        Some(pos) => pos,
                        None => {
                            geometries.push(PreparedGeometry::new(field, &wrapper.geometry)?);
                            geometries.len() - 1
                        }
                    };
                    axis_range(&geometries[pos].envelope, axis)?
                }
                (None, CommonIndexValue::Time(time)) => time.to_range()?,
                (_, value) => {
                    return Err(Error::invalid_data(
                        field.id().as_str(),
                        format!(
                            "a {} value can not feed dimension {}",
                            value.type_name(),
                            field.definition()
                        ),
                    ));
                }
            };
            ranges.push(range);
        }

        let refinement = geometries
            .first()
            .and_then(|geometry| geometry.refinement(model, &ranges));
        let ids = index
            .strategy()
            .insertion_ids(&ranges, refinement.as_ref().map(|r| r as &dyn CellRefinement))?;
        trace!(
            "{} insertion ids in index {} for {:?} of adapter {}",
            ids.len(),
            index.name(),
            String::from_utf8_lossy(&self.data_id),
            self.adapter_id
        );
        Ok(ids)
    }
}

/// A geometry reduced to its field's precision, with its envelope.
struct PreparedGeometry {
    id: FieldId,
    geometry: Geometry<f64>,
    envelope: Rect<f64>,
}

impl PreparedGeometry {
    fn new(field: &DimensionField, geometry: &Geometry<f64>) -> Result<PreparedGeometry> {
        let geometry = match field.geometry_precision() {
            Some(precision) => reduce_precision(geometry, precision),
            None => geometry.clone(),
        };
        let envelope = envelope(&geometry, field.id().as_str())?;
        Ok(PreparedGeometry {
            id: field.id().clone(),
            geometry,
            envelope,
        })
    }

    /// Cell refinement over the x and y dimensions fed by this geometry.
    ///
    /// Only applies when the model has exactly one x and one y dimension for
    /// the geometry and the envelope lies within their bounds, so that cell
    /// bounds and geometry coordinates share the same space.
    fn refinement(&self, model: &IndexModel, ranges: &[NumericRange]) -> Option<GeometryRefinement<'_>> {
        let position = |axis: u8| {
            let mut found = model
                .fields()
                .iter()
                .enumerate()
                .filter(|(_, f)| f.id() == &self.id && f.spatial_axis() == Some(axis));
            match (found.next(), found.next()) {
                (Some((pos, field)), None) => {
                    let bounds = field.definition().value_range();
                    let range = ranges[pos];
                    (bounds.contains(range.min) && bounds.contains(range.max)).then_some(pos)
                }
                _ => None,
            }
        };
        let spatial = model
            .fields()
            .iter()
            .filter(|f| f.id() == &self.id)
            .count();
        if spatial != 2 {
            return None;
        }
        Some(GeometryRefinement::new(&self.geometry, position(0)?, position(1)?))
    }
}

/// Maps `entry` onto the dimension fields of `model`.
///
/// For every distinct dimension field ID of the model, the adapter's handler
/// for that ID produces one common index value; a geometry value feeds all
/// spatial dimensions at once. Native field handlers capture the pass-through
/// values.
///
/// # Errors
///
/// * `InvalidArgument` if the adapter does not support `entry`.
/// * `IncompleteEncoding` if no handler supplies a dimension field of the model.
/// * Any error of a handler, notably `EmptyExtent` for a missing geometry or time.
pub fn encode<T, A>(adapter: &A, entry: &T, model: &IndexModel) -> Result<PersistenceEncoding>
where
    A: DataAdapter<T> + ?Sized,
{
    if !adapter.is_supported(entry) {
        return Err(Error::invalid_arg(
            "entry",
            format!("not supported by adapter '{}'", adapter.adapter_id()),
        ));
    }
    let handlers = adapter.field_handlers();
    let mut common_data = Vec::with_capacity(model.dimension_count());
    for id in model.field_ids() {
        let handler = handlers
            .handler_for(&id)
            .ok_or_else(|| Error::incomplete_encoding(adapter.adapter_id(), id.as_str()))?;
        let value = handler.to_index_value(entry)?;
        common_data.push((id, value));
    }
    let native_data = handlers
        .native_handlers()
        .iter()
        .map(|h| PersistentValue::new(h.field_id().clone(), h.field_value(entry)))
        .collect();
    Ok(PersistenceEncoding::new(
        adapter.data_id(entry),
        adapter.adapter_id(),
        common_data,
        native_data,
    ))
}

/// Rebuilds an entity: every common value is converted back to native values
/// by the handler that produced it, and those plus the pass-through values are
/// fed to a fresh row builder.
pub fn decode<T, A>(adapter: &A, encoding: &PersistenceEncoding) -> Result<T>
where
    A: DataAdapter<T> + ?Sized,
{
    verify_arg!(encoding, encoding.adapter_id() == adapter.adapter_id());
    let handlers = adapter.field_handlers();
    let mut builder = adapter.new_builder();
    let mut converted = Vec::new();
    for (id, value) in encoding.common_data() {
        let pos = handlers
            .handler_position(id)
            .ok_or_else(|| Error::incomplete_encoding(adapter.adapter_id(), id.as_str()))?;
        if converted.contains(&pos) {
            continue;
        }
        converted.push(pos);
        for native in handlers.index_handlers()[pos].to_native_values(value)? {
            builder.set_field(native);
        }
    }
    for native in encoding.native_data() {
        builder.set_field(native.clone());
    }
    builder.build(encoding.data_id())
}

/// An adapter bound to an index, verified to supply every dimension field of
/// the index model.
pub struct AdapterBinding<T> {
    adapter: Arc<dyn DataAdapter<T>>,
    index: Arc<Index>,
}

impl<T> AdapterBinding<T> {
    /// # Errors
    ///
    /// * `IncompleteEncoding` if a model field has no handler.
    /// * `InvalidArgument` if a handler declares a dimension field ID the
    ///   model does not contain.
    pub fn new(adapter: Arc<dyn DataAdapter<T>>, index: Arc<Index>) -> Result<AdapterBinding<T>> {
        let handlers = adapter.field_handlers();
        let model = index.model();
        for id in model.field_ids() {
            if handlers.handler_for(&id).is_none() {
                return Err(Error::incomplete_encoding(adapter.adapter_id(), id.as_str()));
            }
        }
        if let Some(id) = handlers.dimension_field_ids().find(|id| !model.contains_field(id)) {
            return Err(Error::invalid_arg(
                "adapter",
                format!(
                    "handler of adapter '{}' supplies '{id}', which index {} does not contain",
                    adapter.adapter_id(),
                    index.name()
                ),
            ));
        }
        Ok(AdapterBinding { adapter, index })
    }

    pub fn adapter(&self) -> &Arc<dyn DataAdapter<T>> {
        &self.adapter
    }

    pub fn index(&self) -> &Arc<Index> {
        &self.index
    }

    pub fn encode(&self, entry: &T) -> Result<PersistenceEncoding> {
        self.adapter.encode(entry, self.index.model())
    }

    /// Encodes `entry` and decomposes it into insertion IDs of the bound index.
    pub fn insertion_ids(&self, entry: &T) -> Result<Vec<InsertionId>> {
        self.encode(entry)?.insertion_ids(&self.index)
    }
}
