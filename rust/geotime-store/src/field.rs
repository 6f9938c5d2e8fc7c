//! Field identifiers and native field values.

use std::{borrow::Borrow, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use geo_types::Geometry;

/// Stable name of a native attribute or an index dimension field.
///
/// Cloning is cheap: the name is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(Arc<str>);

impl FieldId {
    pub fn new(name: &str) -> FieldId {
        FieldId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldId {
    fn from(name: &str) -> Self {
        FieldId::new(name)
    }
}

impl From<String> for FieldId {
    fn from(name: String) -> Self {
        FieldId(name.into())
    }
}

impl Borrow<str> for FieldId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FieldId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

/// A native attribute value of an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    Time(DateTime<Utc>),
    Geometry(Geometry<f64>),
    Binary(Vec<u8>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            FieldValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            FieldValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Time(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Geometry<f64>> {
        match self {
            FieldValue::Geometry(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Binary(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the value type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Long(_) => "long",
            FieldValue::Double(_) => "double",
            FieldValue::String(_) => "string",
            FieldValue::Time(_) => "time",
            FieldValue::Geometry(_) => "geometry",
            FieldValue::Binary(_) => "binary",
        }
    }
}

/// A native value together with the ID of the field it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentValue {
    pub id: FieldId,
    pub value: FieldValue,
}

impl PersistentValue {
    pub fn new(id: FieldId, value: FieldValue) -> PersistentValue {
        PersistentValue { id, value }
    }
}
