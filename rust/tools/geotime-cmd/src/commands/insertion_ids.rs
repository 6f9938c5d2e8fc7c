//! Insertion-ids command implementation

use std::sync::Arc;

use ahash::AHashMap;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use geo_types::Geometry;
use geotime_common::error::Error;
use geotime_index_core::InsertionId;
use geotime_store::{
    AdapterBinding, DataAdapter, FieldCodec, FieldHandlers, FieldId, FieldReader, FieldWriter,
    GeometryFieldHandler, PersistentValue, RowBuilder, TimeRangeFieldHandler, codec::parse_wkt,
};

use crate::commands::{IndexArgs, parse_time};

const GEOMETRY: &str = "geometry";
const START: &str = "start";
const END: &str = "end";

/// A geometry observed over a time range, as given on the command line.
#[derive(Debug, Clone, PartialEq)]
struct Observation {
    geometry: Geometry<f64>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

fn geometry(entry: &Observation) -> Option<&Geometry<f64>> {
    Some(&entry.geometry)
}

fn start(entry: &Observation) -> Option<DateTime<Utc>> {
    Some(entry.start)
}

fn end(entry: &Observation) -> Option<DateTime<Utc>> {
    Some(entry.end)
}

#[derive(Default)]
struct ObservationBuilder {
    geometry: Option<Geometry<f64>>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl RowBuilder<Observation> for ObservationBuilder {
    fn set_field(&mut self, value: PersistentValue) {
        match value.id.as_str() {
            GEOMETRY => self.geometry = value.value.as_geometry().cloned(),
            START => self.start = value.value.as_time(),
            END => self.end = value.value.as_time(),
            _ => (),
        }
    }

    fn build(&mut self, _data_id: &[u8]) -> geotime_common::Result<Observation> {
        let geometry = self
            .geometry
            .take()
            .ok_or_else(|| Error::invalid_data(GEOMETRY, "missing"))?;
        let start = self
            .start
            .take()
            .ok_or_else(|| Error::invalid_data(START, "missing"))?;
        Ok(Observation {
            geometry,
            start,
            end: self.end.take().unwrap_or(start),
        })
    }
}

struct ObservationAdapter {
    handlers: FieldHandlers<Observation>,
    codecs: AHashMap<FieldId, FieldCodec>,
}

impl ObservationAdapter {
    fn new() -> geotime_common::Result<Self> {
        let handlers = FieldHandlers::new(
            vec![
                Box::new(GeometryFieldHandler::new(GEOMETRY.into(), geometry)),
                Box::new(TimeRangeFieldHandler::new(
                    START.into(),
                    start,
                    END.into(),
                    end,
                )),
            ],
            Vec::new(),
        )?;
        let codecs = AHashMap::from_iter([
            (FieldId::new(GEOMETRY), FieldCodec::Geometry),
            (FieldId::new(START), FieldCodec::Time),
            (FieldId::new(END), FieldCodec::Time),
        ]);
        Ok(ObservationAdapter { handlers, codecs })
    }
}

impl DataAdapter<Observation> for ObservationAdapter {
    fn adapter_id(&self) -> &str {
        "observation"
    }

    fn data_id(&self, _entry: &Observation) -> Vec<u8> {
        Vec::new()
    }

    fn reader(&self, id: &FieldId) -> Option<&dyn FieldReader> {
        self.codecs.get(id).map(|c| c as &dyn FieldReader)
    }

    fn writer(&self, id: &FieldId) -> Option<&dyn FieldWriter> {
        self.codecs.get(id).map(|c| c as &dyn FieldWriter)
    }

    fn new_builder(&self) -> Box<dyn RowBuilder<Observation>> {
        Box::new(ObservationBuilder::default())
    }

    fn field_handlers(&self) -> &FieldHandlers<Observation> {
        &self.handlers
    }
}

pub fn run(args: IndexArgs, wkt: String, start: String, end: Option<String>) -> Result<()> {
    let start = parse_time(&start)?;
    let end = end.as_deref().map(parse_time).transpose()?.unwrap_or(start);
    if end < start {
        anyhow::bail!("End time {end} precedes start time {start}");
    }
    let entry = Observation {
        geometry: parse_wkt(&wkt).with_context(|| format!("Invalid WKT: {wkt}"))?,
        start,
        end,
    };

    let index = args.create_index()?;
    let ids = insertion_ids(Arc::new(index), &entry)?;
    println!("{} insertion IDs", ids.len());
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

fn insertion_ids(index: Arc<geotime_store::Index>, entry: &Observation) -> Result<Vec<InsertionId>> {
    let name = index.name().to_string();
    let binding = AdapterBinding::new(Arc::new(ObservationAdapter::new()?), index)
        .with_context(|| format!("Index {name} does not accept geometry and time"))?;
    binding
        .insertion_ids(entry)
        .with_context(|| format!("Failed to compute insertion IDs for index {name}"))
}

#[cfg(test)]
mod tests {
    use geo_types::Point;
    use geotime::SpatialTemporalIndexBuilder;

    use super::*;

    fn observation(wkt: &str) -> Observation {
        let start = parse_time("2012-04-03T13:30:23.304Z").unwrap();
        Observation {
            geometry: parse_wkt(wkt).unwrap(),
            start,
            end: parse_time("2012-04-03T14:30:23.304Z").unwrap(),
        }
    }

    #[test]
    fn test_point_insertion_ids() {
        let index = Arc::new(SpatialTemporalIndexBuilder::new().create_index().unwrap());
        let ids = insertion_ids(index, &observation("POINT(43.454 28.232)")).unwrap();
        assert!(!ids.is_empty());
        assert!(ids.iter().all(|id| !id.to_string().is_empty()));
    }

    #[test]
    fn test_observation_round_trip() {
        let index = SpatialTemporalIndexBuilder::new().create_index().unwrap();
        let adapter = ObservationAdapter::new().unwrap();
        let entry = observation("POINT(43.454 28.232)");
        let encoding = adapter.encode(&entry, index.model()).unwrap();
        let decoded = adapter.decode(&encoding).unwrap();
        assert_eq!(decoded.geometry, Geometry::from(Point::new(43.454, 28.232)));
        assert_eq!(decoded.start, entry.start);
        assert_eq!(decoded.end, entry.end);
    }

    #[test]
    fn test_empty_geometry_is_rejected() {
        let index = Arc::new(SpatialTemporalIndexBuilder::new().create_index().unwrap());
        assert!(insertion_ids(index, &observation("LINESTRING EMPTY")).is_err());
    }
}
