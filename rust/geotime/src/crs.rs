//! Coordinate reference system resolution.
//!
//! Index creation only needs the number of axes of a coordinate system and
//! the bounds of each axis. A [`CrsResolver`] supplies them for a CRS code
//! such as `EPSG:32633`. [`EpsgCrsResolver`] knows a small built-in table of
//! EPSG systems; [`CachingCrsResolver`] memoizes any resolver for the lifetime
//! of the process, and [`default_resolver`] is the shared cached instance
//! used when no resolver is given.

use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use ahash::AHashMap;
use thiserror::Error;

/// One axis of a coordinate system, in resolver-reported order.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSystemAxis {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl CoordinateSystemAxis {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        CoordinateSystemAxis {
            name: name.into(),
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateSystem {
    pub code: String,
    pub axes: Vec<CoordinateSystemAxis>,
}

impl CoordinateSystem {
    pub fn dimension(&self) -> usize {
        self.axes.len()
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("malformed CRS code '{0}'")]
    Malformed(String),

    #[error("unsupported authority '{0}'")]
    UnsupportedAuthority(String),

    #[error("no coordinate reference system with code {0}")]
    UnknownCode(String),
}

/// Resolves CRS codes to coordinate systems.
pub trait CrsResolver: Send + Sync {
    fn resolve(&self, code: &str) -> std::result::Result<CoordinateSystem, ResolveError>;
}

const MERCATOR_BOUND: f64 = 20_037_508.342_789_244;

/// Built-in EPSG table: WGS 84 (4326), NAD83 (4269), Web Mercator (3857),
/// World Mercator (3395) and the WGS 84 UTM zones (32601-32660, 32701-32760).
///
/// Geographic systems are reported longitude first.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpsgCrsResolver;

impl EpsgCrsResolver {
    fn lookup(code: u32) -> Option<Vec<CoordinateSystemAxis>> {
        let geographic = || {
            vec![
                CoordinateSystemAxis::new("Geodetic longitude", -180.0, 180.0),
                CoordinateSystemAxis::new("Geodetic latitude", -90.0, 90.0),
            ]
        };
        match code {
            4326 | 4269 => Some(geographic()),
            3857 => Some(vec![
                CoordinateSystemAxis::new("Easting", -MERCATOR_BOUND, MERCATOR_BOUND),
                CoordinateSystemAxis::new("Northing", -MERCATOR_BOUND, MERCATOR_BOUND),
            ]),
            3395 => Some(vec![
                CoordinateSystemAxis::new("Easting", -MERCATOR_BOUND, MERCATOR_BOUND),
                CoordinateSystemAxis::new("Northing", -15_496_570.739_723_716, 18_764_656.231_380_563),
            ]),
            32601..=32660 | 32701..=32760 => Some(vec![
                CoordinateSystemAxis::new("Easting", 0.0, 1_000_000.0),
                CoordinateSystemAxis::new("Northing", 0.0, 10_000_000.0),
            ]),
            _ => None,
        }
    }
}

impl CrsResolver for EpsgCrsResolver {
    fn resolve(&self, code: &str) -> std::result::Result<CoordinateSystem, ResolveError> {
        let (authority, number) = code
            .trim()
            .split_once(':')
            .ok_or_else(|| ResolveError::Malformed(code.to_string()))?;
        if !authority.trim().eq_ignore_ascii_case("EPSG") {
            return Err(ResolveError::UnsupportedAuthority(authority.to_string()));
        }
        let number = number
            .trim()
            .parse::<u32>()
            .map_err(|_| ResolveError::Malformed(code.to_string()))?;
        let axes = Self::lookup(number).ok_or_else(|| ResolveError::UnknownCode(code.to_string()))?;
        Ok(CoordinateSystem {
            code: format!("EPSG:{number}"),
            axes,
        })
    }
}

/// Memoizes successful resolutions of an inner resolver, keyed by the
/// normalized (trimmed, upper-case) code. Entries are never evicted.
pub struct CachingCrsResolver<R> {
    inner: R,
    cache: RwLock<AHashMap<String, Arc<CoordinateSystem>>>,
}

impl<R: CrsResolver> CachingCrsResolver<R> {
    pub fn new(inner: R) -> Self {
        CachingCrsResolver {
            inner,
            cache: RwLock::new(AHashMap::new()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<R: CrsResolver> CrsResolver for CachingCrsResolver<R> {
    fn resolve(&self, code: &str) -> std::result::Result<CoordinateSystem, ResolveError> {
        let key = code.trim().to_ascii_uppercase();
        if let Some(cs) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(cs.as_ref().clone());
        }
        let cs = Arc::new(self.inner.resolve(code)?);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| cs.clone());
        Ok(cs.as_ref().clone())
    }
}

static DEFAULT_RESOLVER: LazyLock<Arc<CachingCrsResolver<EpsgCrsResolver>>> =
    LazyLock::new(|| Arc::new(CachingCrsResolver::new(EpsgCrsResolver)));

/// The process-wide cached EPSG resolver.
pub fn default_resolver() -> Arc<dyn CrsResolver> {
    DEFAULT_RESOLVER.clone()
}
