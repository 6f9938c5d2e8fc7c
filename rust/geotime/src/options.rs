//! Configuration of a spatial-temporal index.

use std::fmt;
use std::str::FromStr;

use geotime_common::{Result, error::Error, verify_arg};
use geotime_index_core::Unit;
use serde::{Deserialize, Serialize};

/// Code of the default geographic coordinate reference system (WGS 84).
pub const DEFAULT_CRS: &str = "EPSG:4326";

/// Default ceiling on insertion IDs per entity.
pub const DEFAULT_MAX_DUPLICATES: u64 = 16;

/// Largest magnitude accepted for `geometry_precision`.
pub const MAX_GEOMETRY_PRECISION: i32 = 20;

/// Trade-off between spatial and temporal precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Bias {
    Temporal,
    #[default]
    Balanced,
    Spatial,
}

impl Bias {
    pub const ALL: [Bias; 3] = [Bias::Temporal, Bias::Balanced, Bias::Spatial];

    pub fn name(self) -> &'static str {
        match self {
            Bias::Temporal => "TEMPORAL",
            Bias::Balanced => "BALANCED",
            Bias::Spatial => "SPATIAL",
        }
    }

    /// Bits of precision of every spatial dimension.
    pub fn spatial_precision(self) -> u8 {
        match self {
            Bias::Spatial => 25,
            Bias::Temporal => 10,
            Bias::Balanced => 20,
        }
    }

    /// Bits of precision of the time dimension.
    pub fn temporal_precision(self) -> u8 {
        match self {
            Bias::Spatial => 10,
            Bias::Temporal => 40,
            Bias::Balanced => 20,
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Bias {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Bias::ALL
            .into_iter()
            .find(|bias| bias.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::unknown_variant("an index bias", s, Bias::ALL.map(Bias::name)))
    }
}

impl TryFrom<String> for Bias {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Bias> for &'static str {
    fn from(bias: Bias) -> Self {
        bias.name()
    }
}

/// Options of a spatial-temporal index.
///
/// The value is immutable; `with_*` methods return a modified copy. It
/// persists as JSON with camel-case keys, and deserialized options are
/// validated like those built through [`SpatialTemporalOptions::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OptionsRepr", into = "OptionsRepr")]
pub struct SpatialTemporalOptions {
    bias: Bias,
    periodicity: Unit,
    max_duplicates: u64,
    crs: Option<String>,
    geometry_precision: Option<i32>,
}

impl SpatialTemporalOptions {
    /// Creates validated options.
    ///
    /// # Arguments
    ///
    /// * `max_duplicates` - ceiling on insertion IDs per entity, at least 1
    /// * `crs` - CRS code; `None` or a blank code selects [`DEFAULT_CRS`]
    /// * `geometry_precision` - decimal places geometry coordinates are
    ///   rounded to before indexing, within [`MAX_GEOMETRY_PRECISION`] of zero
    pub fn new(
        bias: Bias,
        periodicity: Unit,
        max_duplicates: u64,
        crs: Option<String>,
        geometry_precision: Option<i32>,
    ) -> Result<SpatialTemporalOptions> {
        verify_arg!(max_duplicates, max_duplicates >= 1);
        verify_arg!(
            geometry_precision,
            geometry_precision
                .is_none_or(|p| (-MAX_GEOMETRY_PRECISION..=MAX_GEOMETRY_PRECISION).contains(&p))
        );
        let crs = crs.and_then(normalize_crs);
        Ok(SpatialTemporalOptions {
            bias,
            periodicity,
            max_duplicates,
            crs,
            geometry_precision,
        })
    }

    pub fn bias(&self) -> Bias {
        self.bias
    }

    pub fn periodicity(&self) -> Unit {
        self.periodicity
    }

    pub fn max_duplicates(&self) -> u64 {
        self.max_duplicates
    }

    /// The configured CRS code, `None` when absent.
    pub fn crs(&self) -> Option<&str> {
        self.crs.as_deref()
    }

    pub fn geometry_precision(&self) -> Option<i32> {
        self.geometry_precision
    }

    /// Whether the options select the default geographic CRS.
    pub fn is_default_crs(&self) -> bool {
        self.crs
            .as_deref()
            .is_none_or(|code| code.eq_ignore_ascii_case(DEFAULT_CRS))
    }

    pub fn with_bias(&self, bias: Bias) -> Self {
        SpatialTemporalOptions {
            bias,
            ..self.clone()
        }
    }

    pub fn with_periodicity(&self, periodicity: Unit) -> Self {
        SpatialTemporalOptions {
            periodicity,
            ..self.clone()
        }
    }

    pub fn with_max_duplicates(&self, max_duplicates: u64) -> Result<Self> {
        Self::new(
            self.bias,
            self.periodicity,
            max_duplicates,
            self.crs.clone(),
            self.geometry_precision,
        )
    }

    pub fn with_crs(&self, crs: Option<String>) -> Self {
        SpatialTemporalOptions {
            crs: crs.and_then(normalize_crs),
            ..self.clone()
        }
    }

    pub fn with_geometry_precision(&self, geometry_precision: Option<i32>) -> Result<Self> {
        Self::new(
            self.bias,
            self.periodicity,
            self.max_duplicates,
            self.crs.clone(),
            geometry_precision,
        )
    }
}

/// Trims `code` and the whitespace around its authority separator, so
/// `" epsg : 4326 "` becomes `"epsg:4326"`. Blank codes yield `None`.
fn normalize_crs(code: String) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    Some(match code.split_once(':') {
        Some((authority, number)) => format!("{}:{}", authority.trim_end(), number.trim_start()),
        None => code.to_string(),
    })
}

impl Default for SpatialTemporalOptions {
    fn default() -> Self {
        SpatialTemporalOptions {
            bias: Bias::Balanced,
            periodicity: Unit::Year,
            max_duplicates: DEFAULT_MAX_DUPLICATES,
            crs: None,
            geometry_precision: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OptionsRepr {
    bias: Bias,
    periodicity: Unit,
    max_duplicates: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    crs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    geometry_precision: Option<i32>,
}

impl Default for OptionsRepr {
    fn default() -> Self {
        SpatialTemporalOptions::default().into()
    }
}

impl TryFrom<OptionsRepr> for SpatialTemporalOptions {
    type Error = Error;

    fn try_from(repr: OptionsRepr) -> Result<Self> {
        SpatialTemporalOptions::new(
            repr.bias,
            repr.periodicity,
            repr.max_duplicates,
            repr.crs,
            repr.geometry_precision,
        )
    }
}

impl From<SpatialTemporalOptions> for OptionsRepr {
    fn from(options: SpatialTemporalOptions) -> Self {
        OptionsRepr {
            bias: options.bias,
            periodicity: options.periodicity,
            max_duplicates: options.max_duplicates,
            crs: options.crs,
            geometry_precision: options.geometry_precision,
        }
    }
}
