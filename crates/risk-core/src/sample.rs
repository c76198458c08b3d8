use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::RiskError;

/// One measurement slot of an environmental sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SampleField {
    SolarIrradiance,
    Precipitation,
    Temperature,
    Pm25,
}

impl SampleField {
    pub const ALL: [SampleField; 4] = [
        SampleField::SolarIrradiance,
        SampleField::Precipitation,
        SampleField::Temperature,
        SampleField::Pm25,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SampleField::SolarIrradiance => "solar_irradiance",
            SampleField::Precipitation => "precipitation",
            SampleField::Temperature => "temperature",
            SampleField::Pm25 => "pm25",
        }
    }
}

/// Fully-populated measurements for one location.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EnvironmentalSample {
    /// kWh/m²/yr
    pub solar_irradiance: f64,
    /// mm/yr
    pub precipitation: f64,
    /// °C
    pub temperature: f64,
    /// μg/m³
    pub pm25: f64,
}

/// Measurements as delivered by the upstream sources, any of which may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawSample {
    pub solar_irradiance: Option<f64>,
    pub precipitation: Option<f64>,
    pub temperature: Option<f64>,
    pub pm25: Option<f64>,
}

/// What to do when a sample field is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    /// Substitute 0.0 silently.
    #[default]
    Default,
    /// Substitute 0.0 and report the field on the overlay.
    Flag,
    /// Fail with `IncompleteSample`.
    Reject,
}

impl FromStr for MissingFieldPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(MissingFieldPolicy::Default),
            "flag" => Ok(MissingFieldPolicy::Flag),
            "reject" => Ok(MissingFieldPolicy::Reject),
            other => Err(format!(
                "unknown missing-field policy '{}', expected default|flag|reject",
                other
            )),
        }
    }
}

/// A sample ready for classification plus the fields that were filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSample {
    pub sample: EnvironmentalSample,
    pub uncertain_fields: Vec<SampleField>,
}

impl RawSample {
    /// Build a raw sample, treating non-finite values as missing.
    pub fn new(
        solar_irradiance: Option<f64>,
        precipitation: Option<f64>,
        temperature: Option<f64>,
        pm25: Option<f64>,
    ) -> Self {
        Self {
            solar_irradiance: solar_irradiance.filter(|v| v.is_finite()),
            precipitation: precipitation.filter(|v| v.is_finite()),
            temperature: temperature.filter(|v| v.is_finite()),
            pm25: pm25.filter(|v| v.is_finite()),
        }
    }

    pub fn get(&self, field: SampleField) -> Option<f64> {
        match field {
            SampleField::SolarIrradiance => self.solar_irradiance,
            SampleField::Precipitation => self.precipitation,
            SampleField::Temperature => self.temperature,
            SampleField::Pm25 => self.pm25,
        }
    }

    /// Fields that are absent, in declaration order.
    pub fn missing_fields(&self) -> Vec<SampleField> {
        self.missing_from(&SampleField::ALL)
    }

    /// The subset of `required` that is absent, in the order given.
    pub fn missing_from(&self, required: &[SampleField]) -> Vec<SampleField> {
        required
            .iter()
            .copied()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Fill gaps under `policy`. Only fields in `required` count as missing:
    /// a flood sample without pm25 is complete.
    pub fn resolve(
        &self,
        required: &[SampleField],
        policy: MissingFieldPolicy,
    ) -> Result<ResolvedSample, RiskError> {
        let missing = self.missing_from(required);

        if !missing.is_empty() && policy == MissingFieldPolicy::Reject {
            return Err(RiskError::IncompleteSample { missing });
        }

        let sample = EnvironmentalSample {
            solar_irradiance: self.solar_irradiance.unwrap_or(0.0),
            precipitation: self.precipitation.unwrap_or(0.0),
            temperature: self.temperature.unwrap_or(0.0),
            pm25: self.pm25.unwrap_or(0.0),
        };

        let uncertain_fields = match policy {
            MissingFieldPolicy::Flag => missing,
            _ => Vec::new(),
        };

        Ok(ResolvedSample { sample, uncertain_fields })
    }
}

impl From<EnvironmentalSample> for RawSample {
    fn from(s: EnvironmentalSample) -> Self {
        RawSample::new(
            Some(s.solar_irradiance),
            Some(s.precipitation),
            Some(s.temperature),
            Some(s.pm25),
        )
    }
}
