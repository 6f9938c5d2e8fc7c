//! The spatial-temporal dimensionality: the dimension model, precision and
//! naming of spatial-temporal indexes, and the predicate recognizing them.

use std::sync::Arc;

use geotime_common::{Result, error::Error};
use geotime_index_core::{
    DimensionDefinition, DimensionKind, IndexStrategy, SfcType, TieredSfcIndexFactory,
};
use geotime_store::{DimensionField, Index, IndexModel, value::ValueKind};
use log::{debug, error};

use crate::{
    crs::{CrsResolver, default_resolver},
    options::{Bias, DEFAULT_CRS, SpatialTemporalOptions},
};

/// Prefix of every spatial-temporal index name.
pub const DEFAULT_SPATIAL_TEMPORAL_ID: &str = "ST_IDX";

/// The ordered dimensions and fields derived from [`SpatialTemporalOptions`].
#[derive(Debug, Clone)]
pub struct DimensionModel {
    pub dimensions: Vec<DimensionDefinition>,
    pub fields: Vec<DimensionField>,
    pub is_default_crs: bool,
    /// The CRS code, [`DEFAULT_CRS`] for the default geographic CRS.
    pub crs_code: String,
}

/// Assembles the ordered dimension definitions and fields for `options`.
///
/// With the default CRS the model is `[longitude, latitude (half range),
/// time]`. Otherwise the CRS is resolved and every axis of its coordinate
/// system, in resolver order, becomes a bounded custom dimension, followed by
/// the time dimension.
///
/// # Errors
///
/// Returns a `CrsResolution` error wrapping the cause when the CRS can not be
/// resolved or reports unusable axes.
pub fn build_dimension_model(
    options: &SpatialTemporalOptions,
    resolver: &dyn CrsResolver,
) -> Result<DimensionModel> {
    let precision = options.geometry_precision();
    let time = DimensionField::time(options.periodicity());

    let Some(code) = options.crs().filter(|_| !options.is_default_crs()) else {
        let fields = vec![
            DimensionField::longitude(precision),
            DimensionField::latitude(precision, true),
            time,
        ];
        return Ok(DimensionModel {
            dimensions: fields.iter().map(|f| f.definition().clone()).collect(),
            fields,
            is_default_crs: true,
            crs_code: DEFAULT_CRS.to_string(),
        });
    };

    let cs = resolver.resolve(code).map_err(|e| {
        error!("Unable to decode '{code}' CRS: {e}");
        Error::crs_resolution(code, e)
    })?;
    if cs.axes.is_empty() || cs.axes.len() > u8::MAX as usize {
        error!("Unable to decode '{code}' CRS: {} axes", cs.axes.len());
        return Err(Error::crs_resolution(
            code,
            format!("unsupported number of axes: {}", cs.axes.len()),
        ));
    }

    let mut fields = Vec::with_capacity(cs.axes.len() + 1);
    for (axis, bounds) in cs.axes.iter().enumerate() {
        let definition = DimensionDefinition::custom_axis(axis as u8, bounds.min, bounds.max)
            .map_err(|e| {
                error!("Unable to decode '{code}' CRS: axis '{}': {e}", bounds.name);
                Error::crs_resolution(code, e)
            })?;
        fields.push(DimensionField::custom_crs_axis(Arc::new(definition), precision)?);
    }
    fields.push(time);
    Ok(DimensionModel {
        dimensions: fields.iter().map(|f| f.definition().clone()).collect(),
        fields,
        is_default_crs: false,
        crs_code: code.to_string(),
    })
}

/// Per-dimension bits for `bias`: the spatial precision for every axis but
/// the trailing time axis, which gets the temporal precision.
pub fn precision_bits(bias: Bias, dimension_count: usize) -> Vec<u8> {
    let mut bits = vec![bias.spatial_precision(); dimension_count.saturating_sub(1)];
    if dimension_count > 0 {
        bits.push(bias.temporal_precision());
    }
    bits
}

/// The durable index name: `ST_IDX_{bias}_{periodicity}`, or
/// `ST_IDX_{authority code}_{bias}_{periodicity}` for a custom CRS, where the
/// authority code is the part of the CRS code after the first `:`.
pub fn index_name(options: &SpatialTemporalOptions, model: &DimensionModel) -> String {
    if model.is_default_crs {
        format!(
            "{DEFAULT_SPATIAL_TEMPORAL_ID}_{}_{}",
            options.bias(),
            options.periodicity()
        )
    } else {
        let code = &model.crs_code;
        let authority_code = code.split_once(':').map_or(code.as_str(), |(_, c)| c);
        format!(
            "{DEFAULT_SPATIAL_TEMPORAL_ID}_{authority_code}_{}_{}",
            options.bias(),
            options.periodicity()
        )
    }
}

/// Creates the spatial-temporal index for `options`: a full incremental
/// tiered Hilbert strategy over the dimension model, named by [`index_name`].
pub fn create_index(options: &SpatialTemporalOptions, resolver: &dyn CrsResolver) -> Result<Index> {
    let model = build_dimension_model(options, resolver)?;
    let bits = precision_bits(options.bias(), model.dimensions.len());
    let name = index_name(options, &model);
    let strategy = TieredSfcIndexFactory::create_full_incremental_tiered_strategy(
        model.dimensions.clone(),
        &bits,
        SfcType::Hilbert,
        options.max_duplicates(),
    )?;
    let index_model = if model.is_default_crs {
        IndexModel::basic(model.fields)?
    } else {
        IndexModel::custom_crs(model.fields, model.crs_code)?
    };
    debug!(
        "created index {name}: {} dimensions, precision {bits:?}, max duplicates {}",
        model.dimensions.len(),
        options.max_duplicates()
    );
    Index::new(name, Arc::new(strategy), Arc::new(index_model))
}

/// A family of indexes defined by which kinds of values they require.
pub trait DimensionalityTypeProvider: Send + Sync {
    type Options;

    /// Unique name of the dimensionality type.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Providers with a higher priority are preferred as the default.
    fn priority(&self) -> i32;

    /// Kinds of common index values an entity must supply.
    fn required_index_value_kinds(&self) -> &'static [ValueKind];

    fn create_options(&self) -> Self::Options;

    fn create_index(&self, options: &Self::Options) -> Result<Index>;
}

/// Provider of spatial-temporal indexes.
#[derive(Clone)]
pub struct SpatialTemporalDimensionalityProvider {
    resolver: Arc<dyn CrsResolver>,
}

impl SpatialTemporalDimensionalityProvider {
    pub fn new(resolver: Arc<dyn CrsResolver>) -> Self {
        SpatialTemporalDimensionalityProvider { resolver }
    }
}

impl Default for SpatialTemporalDimensionalityProvider {
    fn default() -> Self {
        SpatialTemporalDimensionalityProvider::new(default_resolver())
    }
}

impl DimensionalityTypeProvider for SpatialTemporalDimensionalityProvider {
    type Options = SpatialTemporalOptions;

    fn name(&self) -> &'static str {
        "spatial_temporal"
    }

    fn description(&self) -> &'static str {
        "This dimensionality type matches all indices that only require Geometry and Time."
    }

    fn priority(&self) -> i32 {
        5
    }

    fn required_index_value_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Geometry, ValueKind::Time]
    }

    fn create_options(&self) -> SpatialTemporalOptions {
        SpatialTemporalOptions::default()
    }

    fn create_index(&self, options: &SpatialTemporalOptions) -> Result<Index> {
        create_index(options, self.resolver.as_ref())
    }
}

/// Whether `index` is spatial-temporal. See [`is_spatial_temporal_strategy`].
pub fn is_spatial_temporal(index: Option<&Index>) -> bool {
    index.is_some_and(|index| is_spatial_temporal_strategy(Some(index.strategy().as_ref())))
}

/// Whether the strategy has at least three dimensions, among them a time, a
/// latitude and a longitude dimension, in any order.
pub fn is_spatial_temporal_strategy(strategy: Option<&dyn IndexStrategy>) -> bool {
    let Some(strategy) = strategy else {
        return false;
    };
    let dimensions = strategy.dimensions();
    if dimensions.len() < 3 {
        return false;
    }
    let has = |kind: DimensionKind| dimensions.iter().any(|d| d.kind() == kind);
    has(DimensionKind::Time) && has(DimensionKind::Latitude) && has(DimensionKind::Longitude)
}
