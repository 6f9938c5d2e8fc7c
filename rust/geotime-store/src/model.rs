//! Dimension fields and the index model binding them in dimension order.

use std::sync::{Arc, LazyLock};

use geotime_common::{Result, error::Error, verify_arg};
use geotime_index_core::{DimensionDefinition, DimensionKind, Unit};

use crate::{codec::FieldCodec, field::FieldId};

/// ID shared by all spatial dimension fields; one geometry value feeds them all.
pub const GEOMETRY_FIELD_ID: &str = "geometry";

/// ID of the time dimension field.
pub const TIME_FIELD_ID: &str = "default_time_dimension";

static LONGITUDE: LazyLock<Arc<DimensionDefinition>> =
    LazyLock::new(|| Arc::new(DimensionDefinition::Longitude));

static LATITUDE: LazyLock<Arc<DimensionDefinition>> =
    LazyLock::new(|| Arc::new(DimensionDefinition::Latitude { half_range: false }));

static LATITUDE_HALF_RANGE: LazyLock<Arc<DimensionDefinition>> =
    LazyLock::new(|| Arc::new(DimensionDefinition::Latitude { half_range: true }));

/// One position of the index model: a dimension definition, the ID of the
/// common index value that feeds it and the codec of that value.
#[derive(Debug, Clone)]
pub struct DimensionField {
    id: FieldId,
    definition: Arc<DimensionDefinition>,
    geometry_precision: Option<i32>,
    codec: FieldCodec,
}

impl DimensionField {
    /// The x axis of the default geographic CRS.
    ///
    /// `geometry_precision` is the number of decimal places geometry
    /// coordinates are rounded to before their extent is computed.
    pub fn longitude(geometry_precision: Option<i32>) -> DimensionField {
        DimensionField::spatial(LONGITUDE.clone(), geometry_precision)
    }

    /// The y axis of the default geographic CRS.
    pub fn latitude(geometry_precision: Option<i32>, half_range: bool) -> DimensionField {
        let definition = if half_range {
            LATITUDE_HALF_RANGE.clone()
        } else {
            LATITUDE.clone()
        };
        DimensionField::spatial(definition, geometry_precision)
    }

    pub fn time(unit: Unit) -> DimensionField {
        DimensionField {
            id: FieldId::new(TIME_FIELD_ID),
            definition: Arc::new(DimensionDefinition::Time { unit }),
            geometry_precision: None,
            codec: FieldCodec::Time,
        }
    }

    /// An axis of a custom coordinate reference system.
    pub fn custom_crs_axis(
        definition: Arc<DimensionDefinition>,
        geometry_precision: Option<i32>,
    ) -> Result<DimensionField> {
        verify_arg!(definition, definition.kind() == DimensionKind::Custom);
        Ok(DimensionField::spatial(definition, geometry_precision))
    }

    fn spatial(definition: Arc<DimensionDefinition>, geometry_precision: Option<i32>) -> Self {
        DimensionField {
            id: FieldId::new(GEOMETRY_FIELD_ID),
            definition,
            geometry_precision,
            codec: FieldCodec::Geometry,
        }
    }

    /// Replaces the field ID, for models whose values are not the stock geometry and time.
    pub fn with_id(mut self, id: FieldId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> &FieldId {
        &self.id
    }

    pub fn definition(&self) -> &DimensionDefinition {
        &self.definition
    }

    pub fn shared_definition(&self) -> &Arc<DimensionDefinition> {
        &self.definition
    }

    pub fn geometry_precision(&self) -> Option<i32> {
        self.geometry_precision
    }

    pub fn codec(&self) -> FieldCodec {
        self.codec
    }

    /// The geometry coordinate axis this field reads, `None` for time.
    pub fn spatial_axis(&self) -> Option<u8> {
        match self.definition.as_ref() {
            DimensionDefinition::Longitude => Some(0),
            DimensionDefinition::Latitude { .. } => Some(1),
            DimensionDefinition::CustomCrsAxis { axis, .. } => Some(*axis),
            DimensionDefinition::Time { .. } => None,
        }
    }
}

/// The ordered dimension fields of an index.
///
/// Field order is dimension order: the `i`-th field supplies the `i`-th range
/// handed to the index strategy.
#[derive(Debug, Clone)]
pub struct IndexModel {
    fields: Vec<DimensionField>,
    crs_code: Option<String>,
}

impl IndexModel {
    /// A model over the default geographic CRS.
    pub fn basic(fields: Vec<DimensionField>) -> Result<IndexModel> {
        Self::validate(&fields)?;
        Ok(IndexModel {
            fields,
            crs_code: None,
        })
    }

    /// A model over a custom CRS identified by `crs_code`.
    pub fn custom_crs(fields: Vec<DimensionField>, crs_code: impl Into<String>) -> Result<IndexModel> {
        Self::validate(&fields)?;
        let crs_code = crs_code.into();
        verify_arg!(crs_code, !crs_code.trim().is_empty());
        Ok(IndexModel {
            fields,
            crs_code: Some(crs_code),
        })
    }

    fn validate(fields: &[DimensionField]) -> Result<()> {
        verify_arg!(fields, !fields.is_empty());
        let time_fields = fields
            .iter()
            .filter(|f| f.definition().kind() == DimensionKind::Time)
            .count();
        if time_fields != 1 {
            return Err(Error::invalid_arg(
                "fields",
                format!("a model needs exactly one time dimension, found {time_fields}"),
            ));
        }
        Ok(())
    }

    pub fn fields(&self) -> &[DimensionField] {
        &self.fields
    }

    pub fn dimension_count(&self) -> usize {
        self.fields.len()
    }

    pub fn dimension_definitions(&self) -> Vec<DimensionDefinition> {
        self.fields.iter().map(|f| f.definition().clone()).collect()
    }

    /// Distinct field IDs in first-occurrence order.
    pub fn field_ids(&self) -> Vec<FieldId> {
        let mut ids: Vec<FieldId> = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if !ids.contains(field.id()) {
                ids.push(field.id().clone());
            }
        }
        ids
    }

    pub fn contains_field(&self, id: &FieldId) -> bool {
        self.fields.iter().any(|f| f.id() == id)
    }

    /// The custom CRS code, `None` for the default geographic CRS.
    pub fn crs_code(&self) -> Option<&str> {
        self.crs_code.as_deref()
    }

    pub fn is_default_crs(&self) -> bool {
        self.crs_code.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_fields() -> Vec<DimensionField> {
        vec![
            DimensionField::longitude(None),
            DimensionField::latitude(None, true),
            DimensionField::time(Unit::Year),
        ]
    }

    #[test]
    fn test_default_definitions_are_shared() {
        let a = DimensionField::longitude(None);
        let b = DimensionField::longitude(Some(3));
        assert!(Arc::ptr_eq(a.shared_definition(), b.shared_definition()));
        assert_eq!(b.geometry_precision(), Some(3));
        assert_eq!(a.spatial_axis(), Some(0));
        assert_eq!(DimensionField::time(Unit::Day).spatial_axis(), None);
    }

    #[test]
    fn test_field_ids_are_distinct_in_order() {
        let model = IndexModel::basic(default_fields()).unwrap();
        assert_eq!(
            model.field_ids(),
            vec![FieldId::new(GEOMETRY_FIELD_ID), FieldId::new(TIME_FIELD_ID)]
        );
        assert_eq!(model.dimension_count(), 3);
        assert!(model.is_default_crs());
        assert_eq!(
            model.dimension_definitions()[1],
            DimensionDefinition::Latitude { half_range: true }
        );
    }

    #[test]
    fn test_model_requires_one_time_dimension() {
        assert!(IndexModel::basic(vec![DimensionField::longitude(None)]).is_err());
        let mut fields = default_fields();
        fields.push(DimensionField::time(Unit::Day));
        assert!(IndexModel::basic(fields).is_err());
        assert!(IndexModel::basic(vec![]).is_err());
    }

    #[test]
    fn test_custom_crs_axis() {
        let axis = Arc::new(DimensionDefinition::custom_axis(1, 0.0, 1e7).unwrap());
        let field = DimensionField::custom_crs_axis(axis, None).unwrap();
        assert_eq!(field.spatial_axis(), Some(1));
        assert!(
            DimensionField::custom_crs_axis(Arc::new(DimensionDefinition::Longitude), None)
                .is_err()
        );

        let model =
            IndexModel::custom_crs(vec![field, DimensionField::time(Unit::Year)], "EPSG:32633")
                .unwrap();
        assert_eq!(model.crs_code(), Some("EPSG:32633"));
        assert!(IndexModel::custom_crs(default_fields(), " ").is_err());
    }
}
