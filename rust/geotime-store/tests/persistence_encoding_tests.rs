use std::sync::Arc;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use geo_types::{Geometry, LineString, Point, line_string, polygon};
use geotime_common::{Result, error::ErrorKind};
use geotime_index_core::{IndexStrategy, SfcType, TieredSfcIndexFactory, Unit};
use geotime_store::{
    AccessorFieldHandler, AdapterBinding, DataAdapter, DimensionField, FieldCodec, FieldHandlers,
    FieldId, FieldReader, FieldValue, FieldWriter, GeometryFieldHandler, Index, IndexFieldHandler,
    IndexModel, NativeFieldHandler, PersistentValue, RowBuilder, TimeFieldHandler,
    TimeRangeFieldHandler,
};

const GEOM: &str = "myGeo";
const ID: &str = "myId";
const START_TIME: &str = "startTime";
const END_TIME: &str = "endTime";

#[derive(Debug, Clone, PartialEq)]
struct GeoObj {
    geometry: Option<Geometry<f64>>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    id: String,
}

impl GeoObj {
    fn new(geometry: impl Into<Geometry<f64>>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        GeoObj {
            geometry: Some(geometry.into()),
            start,
            end,
            id: "g1".to_string(),
        }
    }
}

fn geometry(obj: &GeoObj) -> Option<&Geometry<f64>> {
    obj.geometry.as_ref()
}

fn start(obj: &GeoObj) -> Option<DateTime<Utc>> {
    Some(obj.start)
}

fn end(obj: &GeoObj) -> Option<DateTime<Utc>> {
    Some(obj.end)
}

fn id(obj: &GeoObj) -> FieldValue {
    FieldValue::String(obj.id.clone())
}

fn end_value(obj: &GeoObj) -> FieldValue {
    FieldValue::Time(obj.end)
}

#[derive(Default)]
struct GeoObjBuilder {
    geometry: Option<Geometry<f64>>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl RowBuilder<GeoObj> for GeoObjBuilder {
    fn set_field(&mut self, value: PersistentValue) {
        match value.id.as_str() {
            GEOM => self.geometry = value.value.as_geometry().cloned(),
            START_TIME => self.start = value.value.as_time(),
            END_TIME => self.end = value.value.as_time(),
            _ => {}
        }
    }

    fn build(&mut self, data_id: &[u8]) -> Result<GeoObj> {
        let start = self
            .start
            .ok_or_else(|| geotime_common::error::Error::invalid_data(START_TIME, "missing"))?;
        Ok(GeoObj {
            geometry: self.geometry.take(),
            start,
            end: self.end.unwrap_or(start),
            id: String::from_utf8_lossy(data_id).into_owned(),
        })
    }
}

struct GeoObjDataAdapter {
    handlers: FieldHandlers<GeoObj>,
    codecs: AHashMap<FieldId, FieldCodec>,
}

impl GeoObjDataAdapter {
    /// Geometry plus a time instant; the end time rides along as a native value.
    fn with_instant() -> Self {
        Self::new(
            vec![
                Box::new(GeometryFieldHandler::new(GEOM.into(), geometry)),
                Box::new(TimeFieldHandler::new(START_TIME.into(), start)),
            ],
            vec![
                Box::new(AccessorFieldHandler::new(ID.into(), id)),
                Box::new(AccessorFieldHandler::new(END_TIME.into(), end_value)),
            ],
        )
    }

    /// Geometry plus a time range.
    fn with_range() -> Self {
        Self::new(
            vec![
                Box::new(GeometryFieldHandler::new(GEOM.into(), geometry)),
                Box::new(TimeRangeFieldHandler::new(
                    START_TIME.into(),
                    start,
                    END_TIME.into(),
                    end,
                )),
            ],
            vec![Box::new(AccessorFieldHandler::new(ID.into(), id))],
        )
    }

    fn new(
        index_handlers: Vec<Box<dyn IndexFieldHandler<GeoObj>>>,
        native_handlers: Vec<Box<dyn NativeFieldHandler<GeoObj>>>,
    ) -> Self {
        let codecs = AHashMap::from_iter([
            (FieldId::new(GEOM), FieldCodec::Geometry),
            (FieldId::new(ID), FieldCodec::String),
            (FieldId::new(START_TIME), FieldCodec::Time),
            (FieldId::new(END_TIME), FieldCodec::Time),
        ]);
        GeoObjDataAdapter {
            handlers: FieldHandlers::new(index_handlers, native_handlers).unwrap(),
            codecs,
        }
    }
}

impl DataAdapter<GeoObj> for GeoObjDataAdapter {
    fn adapter_id(&self) -> &str {
        "geoobj"
    }

    fn data_id(&self, entry: &GeoObj) -> Vec<u8> {
        entry.id.as_bytes().to_vec()
    }

    fn reader(&self, id: &FieldId) -> Option<&dyn FieldReader> {
        self.codecs.get(id).map(|c| c as &dyn FieldReader)
    }

    fn writer(&self, id: &FieldId) -> Option<&dyn FieldWriter> {
        self.codecs.get(id).map(|c| c as &dyn FieldWriter)
    }

    fn new_builder(&self) -> Box<dyn RowBuilder<GeoObj>> {
        Box::new(GeoObjBuilder::default())
    }

    fn field_handlers(&self) -> &FieldHandlers<GeoObj> {
        &self.handlers
    }
}

fn model() -> Arc<IndexModel> {
    Arc::new(
        IndexModel::basic(vec![
            DimensionField::longitude(None),
            DimensionField::latitude(None, false),
            DimensionField::time(Unit::Year),
        ])
        .unwrap(),
    )
}

fn single_tier_index(bits: u8) -> Index {
    let model = model();
    let strategy = TieredSfcIndexFactory::create_single_tier_strategy(
        model.dimension_definitions(),
        &[bits, bits, bits],
        SfcType::Hilbert,
    )
    .unwrap();
    Index::new("ST_IDX_TEST", Arc::new(strategy), model).unwrap()
}

fn time(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap().to_utc()
}

fn start_time() -> DateTime<Utc> {
    time("2012-04-03T13:30:23.304Z")
}

fn end_time() -> DateTime<Utc> {
    time("2012-04-03T14:30:23.304Z")
}

fn line() -> LineString<f64> {
    line_string![(x: 43.444, y: 28.232), (x: 43.454, y: 28.242)]
}

fn insertion_ids(adapter: &GeoObjDataAdapter, index: &Index, entry: &GeoObj) -> usize {
    adapter
        .encode(entry, index.model())
        .unwrap()
        .insertion_ids(index)
        .unwrap()
        .len()
}

#[test]
fn test_point() {
    let index = single_tier_index(16);
    let entry = GeoObj::new(Point::new(43.454, 28.232), start_time(), end_time());
    assert_eq!(insertion_ids(&GeoObjDataAdapter::with_instant(), &index, &entry), 1);
}

#[test]
fn test_line() {
    let index = single_tier_index(16);
    let entry = GeoObj::new(line(), start_time(), end_time());
    assert_eq!(insertion_ids(&GeoObjDataAdapter::with_instant(), &index, &entry), 7);
}

#[test]
fn test_line_with_precision_on_the_tile_edge() {
    let index = single_tier_index(14);
    // Both latitudes tile as 33.75.
    let edge = line_string![(x: -99.22, y: 33.75000000000001), (x: -99.15, y: 33.75000000000001)];
    let at = DateTime::from_timestamp_millis(352_771_200_000).unwrap();
    let entry = GeoObj::new(edge, at, at);
    assert_eq!(insertion_ids(&GeoObjDataAdapter::with_instant(), &index, &entry), 4);
}

#[test]
fn test_closed_ring() {
    let index = single_tier_index(16);
    let ring = line_string![
        (x: 43.444, y: 28.232),
        (x: 43.454, y: 28.242),
        (x: 43.444, y: 28.252),
        (x: 43.444, y: 28.232),
    ];
    let entry = GeoObj::new(ring, start_time(), end_time());
    assert_eq!(insertion_ids(&GeoObjDataAdapter::with_instant(), &index, &entry), 18);
}

#[test]
fn test_point_range() {
    let index = single_tier_index(16);
    let entry = GeoObj::new(Point::new(43.454, 28.232), start_time(), end_time());
    assert_eq!(insertion_ids(&GeoObjDataAdapter::with_range(), &index, &entry), 8);
}

#[test]
fn test_line_range() {
    let index = single_tier_index(16);
    let entry = GeoObj::new(line(), start_time(), end_time());
    let count = insertion_ids(&GeoObjDataAdapter::with_range(), &index, &entry);
    assert!(count > 7 && count < 100, "{count}");
}

#[test]
fn test_encoding_is_deterministic() {
    let index = single_tier_index(16);
    let adapter = GeoObjDataAdapter::with_range();
    fastrand::seed(42);
    for _ in 0..25 {
        let x = fastrand::f64() * 340.0 - 170.0;
        let y = fastrand::f64() * 160.0 - 80.0;
        let shape = line_string![(x: x, y: y), (x: x + 0.01, y: y + 0.005)];
        let entry = GeoObj::new(shape, start_time(), end_time());
        let first = adapter.encode(&entry, index.model()).unwrap();
        let second = adapter.encode(&entry, index.model()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.insertion_ids(&index).unwrap(),
            second.insertion_ids(&index).unwrap()
        );
    }
}

#[test]
fn test_missing_time_handler_is_incomplete_encoding() {
    let index = single_tier_index(16);
    let adapter = GeoObjDataAdapter::new(
        vec![Box::new(GeometryFieldHandler::new(GEOM.into(), geometry))],
        vec![],
    );
    let entry = GeoObj::new(Point::new(1.0, 1.0), start_time(), end_time());
    let err = adapter.encode(&entry, index.model()).unwrap_err();
    match err.kind() {
        ErrorKind::IncompleteEncoding { adapter, field } => {
            assert_eq!(adapter, "geoobj");
            assert_eq!(field, "default_time_dimension");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let adapter: Arc<dyn DataAdapter<GeoObj>> = Arc::new(adapter);
    assert!(AdapterBinding::new(adapter, Arc::new(index)).is_err());
}

#[test]
fn test_empty_geometry_is_rejected() {
    let index = single_tier_index(16);
    let adapter = GeoObjDataAdapter::with_instant();

    let empty = GeoObj::new(LineString::<f64>(vec![]), start_time(), end_time());
    let err = insertion_error(&adapter, &index, &empty);
    assert!(matches!(err.kind(), ErrorKind::EmptyExtent { .. }));

    let mut missing = GeoObj::new(Point::new(1.0, 1.0), start_time(), end_time());
    missing.geometry = None;
    let err = insertion_error(&adapter, &index, &missing);
    assert!(err.is_entity_error());

    // The next entity of the batch still encodes.
    let fine = GeoObj::new(Point::new(1.0, 1.0), start_time(), end_time());
    assert_eq!(insertion_ids(&adapter, &index, &fine), 1);
}

fn insertion_error(
    adapter: &GeoObjDataAdapter,
    index: &Index,
    entry: &GeoObj,
) -> geotime_common::error::Error {
    adapter
        .encode(entry, index.model())
        .and_then(|encoding| encoding.insertion_ids(index))
        .unwrap_err()
}

#[test]
fn test_decode_time_range_keeps_distinct_end() {
    let index = single_tier_index(16);
    let adapter = GeoObjDataAdapter::with_range();
    let entry = GeoObj::new(line(), start_time(), end_time());
    let encoding = adapter.encode(&entry, index.model()).unwrap();
    let decoded = adapter.decode(&encoding).unwrap();
    assert_ne!(decoded.start, decoded.end);
    assert_eq!(decoded, entry);
}

#[test]
fn test_decode_with_native_pass_through() {
    let index = single_tier_index(16);
    let adapter = GeoObjDataAdapter::with_instant();
    let entry = GeoObj::new(Point::new(43.454, 28.232), start_time(), end_time());
    let encoding = adapter.encode(&entry, index.model()).unwrap();
    assert_eq!(encoding.data_id(), b"g1");
    assert_eq!(encoding.native_data().len(), 2);
    assert_eq!(adapter.decode(&encoding).unwrap(), entry);
}

#[test]
fn test_native_values_through_codecs() {
    let adapter = GeoObjDataAdapter::with_instant();
    let entry = GeoObj::new(line(), start_time(), end_time());
    let index = single_tier_index(16);
    let encoding = adapter.encode(&entry, index.model()).unwrap();
    for value in encoding.native_data() {
        let bytes = adapter.writer(&value.id).unwrap().write(&value.value).unwrap();
        let read = adapter.reader(&value.id).unwrap().read(&bytes).unwrap();
        assert_eq!(read, value.value);
    }
    assert!(adapter.reader(&"unknown".into()).is_none());
}

#[test]
fn test_binding_rejects_unknown_dimension_field() {
    let adapter = GeoObjDataAdapter::new(
        vec![
            Box::new(GeometryFieldHandler::new(GEOM.into(), geometry)),
            Box::new(TimeFieldHandler::new(START_TIME.into(), start)),
            Box::new(
                GeometryFieldHandler::new("footprint".into(), geometry)
                    .with_dimension_field("footprint".into()),
            ),
        ],
        vec![],
    );
    let adapter: Arc<dyn DataAdapter<GeoObj>> = Arc::new(adapter);
    assert!(AdapterBinding::new(adapter, Arc::new(single_tier_index(16))).is_err());
}

#[test]
fn test_binding_encodes_concurrently() {
    let adapter: Arc<dyn DataAdapter<GeoObj>> = Arc::new(GeoObjDataAdapter::with_range());
    let binding = AdapterBinding::new(adapter, Arc::new(single_tier_index(16))).unwrap();
    let expected = binding
        .insertion_ids(&GeoObj::new(line(), start_time(), end_time()))
        .unwrap();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let ids = binding
                    .insertion_ids(&GeoObj::new(line(), start_time(), end_time()))
                    .unwrap();
                assert_eq!(ids, expected);
            });
        }
    });
}

#[test]
fn test_tiered_index_respects_duplicate_ceiling() {
    let model = model();
    let strategy = TieredSfcIndexFactory::create_full_incremental_tiered_strategy(
        model.dimension_definitions(),
        &[20, 20, 20],
        SfcType::Hilbert,
        16,
    )
    .unwrap();
    assert_eq!(strategy.max_duplicates(), Some(16));
    let index = Index::new("ST_IDX_TIERED", Arc::new(strategy), model).unwrap();
    let area = polygon![
        (x: -40.0, y: -20.0),
        (x: 40.0, y: -20.0),
        (x: 40.0, y: 20.0),
        (x: -40.0, y: 20.0),
        (x: -40.0, y: -20.0),
    ];
    let entry = GeoObj::new(area, start_time(), end_time());
    let count = insertion_ids(&GeoObjDataAdapter::with_range(), &index, &entry);
    assert!((1..=16).contains(&count), "{count}");
}

#[test]
fn test_geometry_precision_applies_before_extent() {
    let fields = vec![
        DimensionField::longitude(Some(0)),
        DimensionField::latitude(Some(0), false),
        DimensionField::time(Unit::Year),
    ];
    let model = Arc::new(IndexModel::basic(fields).unwrap());
    let strategy = TieredSfcIndexFactory::create_single_tier_strategy(
        model.dimension_definitions(),
        &[16, 16, 16],
        SfcType::Hilbert,
    )
    .unwrap();
    let index = Index::new("ST_IDX_ROUNDED", Arc::new(strategy), model).unwrap();
    // Rounded to whole degrees, the short line collapses to a single vertex.
    let entry = GeoObj::new(line(), start_time(), end_time());
    assert_eq!(insertion_ids(&GeoObjDataAdapter::with_instant(), &index, &entry), 1);
}
