//! Entity encoding for geotime indexes.
//!
//! This crate connects arbitrary domain objects to an index built from
//! `geotime-index-core` strategies:
//!
//! - [`model`] and [`index`] define which value feeds which dimension of an
//!   index ([`IndexModel`], [`Index`]).
//! - [`handler`] and [`adapter`] let an entity type describe its attributes
//!   through pluggable field handlers, without the index model knowing the
//!   entity's shape.
//! - [`encoding`] turns an entity into a [`PersistenceEncoding`] and that into
//!   the entity's insertion IDs, and reconstructs entities on the read path.
//!
//! All configuration types are immutable after construction and can be shared
//! between threads; encoding is a pure, synchronous computation.

pub mod adapter;
pub mod codec;
pub mod encoding;
pub mod field;
pub mod geometry;
pub mod handler;
pub mod index;
pub mod model;
pub mod value;

pub use adapter::{DataAdapter, FieldHandlers, RowBuilder};
pub use codec::{FieldCodec, FieldReader, FieldWriter};
pub use encoding::{AdapterBinding, PersistenceEncoding};
pub use field::{FieldId, FieldValue, PersistentValue};
pub use handler::{
    AccessorFieldHandler, GeometryFieldHandler, IndexFieldHandler, NativeFieldHandler,
    TimeFieldHandler, TimeRangeFieldHandler,
};
pub use index::Index;
pub use model::{DimensionField, GEOMETRY_FIELD_ID, IndexModel, TIME_FIELD_ID};
pub use value::{CommonIndexValue, GeometryWrapper, Time, ValueKind};
