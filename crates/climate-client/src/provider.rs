use async_trait::async_trait;
use risk_core::GeoPoint;

use crate::assessor::{AssessmentOutcome, AssessmentRequest};
use crate::error::ClimateResult;
use crate::nasa_power::ClimatologyReading;
use crate::openweather::AirReading;
use crate::places::Place;

/// Source of long-term annual climatology (solar, temperature, precipitation).
#[async_trait]
pub trait ClimatologySource: Send + Sync {
    async fn climatology(&self, location: GeoPoint) -> ClimateResult<ClimatologyReading>;
}

/// Source of current particulate readings.
#[async_trait]
pub trait AirQualitySource: Send + Sync {
    async fn air_quality(&self, location: GeoPoint) -> ClimateResult<AirReading>;
}

#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn nearby(&self, location: GeoPoint, place_type: &str) -> ClimateResult<Vec<Place>>;
}

/// Backend-agnostic interface for LLM risk assessments.
#[async_trait]
pub trait RiskAssessor: Send + Sync {
    async fn assess(&self, request: &AssessmentRequest) -> ClimateResult<AssessmentOutcome>;

    fn backend_name(&self) -> &'static str;
}
