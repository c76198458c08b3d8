use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RiskError;
use crate::sample::SampleField;

/// Category of climate risk being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HazardType {
    Drought,
    Flood,
    Financial,
}

impl HazardType {
    pub const ALL: [HazardType; 3] = [HazardType::Drought, HazardType::Flood, HazardType::Financial];

    pub fn as_str(&self) -> &'static str {
        match self {
            HazardType::Drought => "drought",
            HazardType::Flood => "flood",
            HazardType::Financial => "financial",
        }
    }

    /// Sample fields the hazard's thresholds read.
    pub fn required_fields(&self) -> &'static [SampleField] {
        match self {
            HazardType::Drought => &[SampleField::SolarIrradiance, SampleField::Precipitation],
            HazardType::Flood => &[SampleField::Precipitation],
            HazardType::Financial => &[SampleField::Pm25, SampleField::Temperature],
        }
    }
}

impl fmt::Display for HazardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact lowercase match only; "Flood" is not a hazard.
impl FromStr for HazardType {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drought" => Ok(HazardType::Drought),
            "flood" => Ok(HazardType::Flood),
            "financial" => Ok(HazardType::Financial),
            other => Err(RiskError::InvalidHazardType(other.to_string())),
        }
    }
}

/// How an unknown hazard selector is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardMode {
    /// Unknown selectors pass through and classify as Low.
    #[default]
    Legacy,
    /// Unknown selectors are rejected with `InvalidHazardType`.
    Strict,
}

impl FromStr for HazardMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(HazardMode::Legacy),
            "strict" => Ok(HazardMode::Strict),
            other => Err(format!("unknown hazard mode '{}', expected legacy|strict", other)),
        }
    }
}

/// Result of parsing a caller-supplied hazard selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HazardSelection {
    Hazard(HazardType),
    Unrecognized(String),
}

impl HazardSelection {
    /// Parse the `type` selector of an overlay request.
    ///
    /// An absent or empty selector means drought in either mode. Anything that
    /// is not an exact hazard literal is kept as `Unrecognized` in legacy mode
    /// and rejected in strict mode.
    pub fn parse(raw: Option<&str>, mode: HazardMode) -> Result<Self, RiskError> {
        let raw = match raw {
            None | Some("") => return Ok(HazardSelection::Hazard(HazardType::Drought)),
            Some(s) => s,
        };

        match (raw.parse::<HazardType>(), mode) {
            (Ok(hazard), _) => Ok(HazardSelection::Hazard(hazard)),
            (Err(_), HazardMode::Legacy) => Ok(HazardSelection::Unrecognized(raw.to_string())),
            (Err(e), HazardMode::Strict) => Err(e),
        }
    }

    pub fn hazard(&self) -> Option<HazardType> {
        match self {
            HazardSelection::Hazard(h) => Some(*h),
            HazardSelection::Unrecognized(_) => None,
        }
    }

    /// An unrecognized selector always classifies Low, so it needs nothing.
    pub fn required_fields(&self) -> &'static [SampleField] {
        match self {
            HazardSelection::Hazard(h) => h.required_fields(),
            HazardSelection::Unrecognized(_) => &[],
        }
    }
}

/// Discrete severity label. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// RGB triple, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", schema(value_type = Vec<u8>))]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const RED: Rgb = Rgb([255, 0, 0]);
    pub const YELLOW: Rgb = Rgb([255, 255, 0]);
    pub const GREEN: Rgb = Rgb([0, 255, 0]);
}

/// Map-rendering descriptor for one classified location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RiskOverlay {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    #[serde(rename = "risk")]
    pub tier: RiskTier,
    pub color: Rgb,
    #[serde(rename = "radius")]
    pub radius_meters: u32,
    /// Fields that were zero-filled under the flag policy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uncertain_fields: Vec<SampleField>,
}
