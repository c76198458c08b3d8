pub mod assessor;
pub mod error;
pub mod nasa_power;
pub mod openweather;
pub mod places;
pub mod provider;
pub mod rate_limit;

pub use assessor::{AssessmentOutcome, AssessmentRequest, OpenRouterAssessor, RiskAssessment};
pub use error::{ClimateError, ClimateResult};
pub use nasa_power::{ClimatologyReading, NasaPowerClient};
pub use openweather::{AirReading, OpenWeatherClient};
pub use places::{Place, PlacesClient};
pub use provider::{AirQualitySource, ClimatologySource, PlaceSearch, RiskAssessor};
pub use rate_limit::RateLimiter;

use risk_core::RawSample;
use std::time::Duration;

/// Endpoints and limits for the upstream services.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub nasa_power_url: String,
    pub openweather_url: String,
    pub google_maps_url: String,
    pub openrouter_url: String,
    pub openrouter_model: String,
    /// OpenWeather requests per minute
    pub openweather_rate_limit: usize,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nasa_power_url: nasa_power::DEFAULT_BASE_URL.to_string(),
            openweather_url: openweather::DEFAULT_BASE_URL.to_string(),
            google_maps_url: places::DEFAULT_BASE_URL.to_string(),
            openrouter_url: assessor::DEFAULT_BASE_URL.to_string(),
            openrouter_model: assessor::DEFAULT_MODEL.to_string(),
            openweather_rate_limit: 60,
            timeout: Duration::from_secs(30),
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("riskscape/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Merge climatology and air quality into one sample for classification.
pub fn combine_readings(climatology: &ClimatologyReading, air: &AirReading) -> RawSample {
    RawSample::new(
        climatology.solar_irradiance,
        climatology.precipitation,
        climatology.temperature,
        air.pm25,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_core::{classify, GeoPoint, HazardType, MissingFieldPolicy, RiskTier, SampleField};

    #[test]
    fn test_combine_readings_keeps_gaps() {
        let climatology = ClimatologyReading {
            solar_irradiance: Some(1900.0),
            temperature: Some(26.0),
            precipitation: None,
        };
        let air = AirReading { pm25: Some(40.0), aqi: Some(2) };
        let raw = combine_readings(&climatology, &air);
        assert_eq!(raw.solar_irradiance, Some(1900.0));
        assert_eq!(raw.pm25, Some(40.0));
        assert_eq!(raw.missing_fields(), vec![SampleField::Precipitation]);
    }

    #[test]
    fn test_power_response_classifies_in_annual_units() {
        // Mumbai-like climatology: ~1980 kWh/m² and ~2500 mm a year
        let body = r#"{"properties": {"parameter": {
            "ALLSKY_SFC_SW_DWN": {"ANN": 5.42},
            "PRECTOT": {"ANN": 6.85},
            "T2M": {"ANN": 27.31}
        }}}"#;
        let climatology = nasa_power::parse_climatology(body).unwrap();
        let air = AirReading { pm25: Some(20.0), aqi: Some(2) };
        let raw = combine_readings(&climatology, &air);
        let here = GeoPoint::new(19.07, 72.87);

        let tier = |hazard: HazardType| {
            let resolved = raw
                .resolve(hazard.required_fields(), MissingFieldPolicy::Reject)
                .unwrap();
            classify(here, &resolved.sample, hazard).tier
        };
        assert_eq!(tier(HazardType::Drought), RiskTier::Low);
        assert_eq!(tier(HazardType::Flood), RiskTier::High);
        assert_eq!(tier(HazardType::Financial), RiskTier::Low);
    }
}
