use async_trait::async_trait;
use dashmap::DashMap;
use risk_core::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{ClimateError, ClimateResult};
use crate::provider::ClimatologySource;
use crate::rate_limit::{ensure_success, send_request};

pub const DEFAULT_BASE_URL: &str = "https://power.larc.nasa.gov";

const SERVICE: &str = "NASA POWER";
const SOLAR_PARAM: &str = "ALLSKY_SFC_SW_DWN";
const TEMPERATURE_PARAM: &str = "T2M";
const PRECIPITATION_PARAM: &str = "PRECTOT";
/// Newer POWER releases report corrected precipitation under this name.
const PRECIPITATION_PARAM_CORRECTED: &str = "PRECTOTCORR";
const ANNUAL_KEY: &str = "ANN";
/// POWER marks unavailable values with -999.
const FILL_VALUE: f64 = -999.0;
/// `ANN` holds the mean daily value; thresholds are annual totals.
const DAYS_PER_YEAR: f64 = 365.0;

/// Readings are kept for a day, and at most this many points are held.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const MAX_CACHED_POINTS: usize = 10_000;

/// Annual climatology at one point. Fields are absent when POWER has no value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimatologyReading {
    /// kWh/m²/yr
    pub solar_irradiance: Option<f64>,
    /// °C, annual mean
    pub temperature: Option<f64>,
    /// mm/yr
    pub precipitation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: Option<PowerProperties>,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    #[serde(default)]
    parameter: HashMap<String, HashMap<String, serde_json::Value>>,
}

fn annual_value(
    parameters: &HashMap<String, HashMap<String, serde_json::Value>>,
    name: &str,
) -> Option<f64> {
    let raw = parameters.get(name)?.get(ANNUAL_KEY)?;
    // Some mirrors return numbers as strings
    let value = raw
        .as_f64()
        .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))?;
    if !value.is_finite() || (value - FILL_VALUE).abs() < f64::EPSILON {
        return None;
    }
    Some(value)
}

/// Extract annual values from a POWER climatology point response.
///
/// Solar irradiance and precipitation arrive as daily means and are scaled to
/// yearly totals; temperature is already an annual mean.
pub fn parse_climatology(body: &str) -> ClimateResult<ClimatologyReading> {
    let response: PowerResponse = serde_json::from_str(body)?;
    let properties = response.properties.ok_or_else(|| {
        ClimateError::InvalidResponse("POWER response has no properties block".to_string())
    })?;
    let params = &properties.parameter;

    Ok(ClimatologyReading {
        solar_irradiance: annual_value(params, SOLAR_PARAM).map(|v| v * DAYS_PER_YEAR),
        temperature: annual_value(params, TEMPERATURE_PARAM),
        precipitation: annual_value(params, PRECIPITATION_PARAM)
            .or_else(|| annual_value(params, PRECIPITATION_PARAM_CORRECTED))
            .map(|v| v * DAYS_PER_YEAR),
    })
}

/// Cache key: coordinates rounded to two decimals (~1 km).
fn cache_key(location: GeoPoint) -> (i64, i64) {
    (
        (location.latitude * 100.0).round() as i64,
        (location.longitude * 100.0).round() as i64,
    )
}

struct CacheEntry {
    reading: ClimatologyReading,
    cached_at: Instant,
}

#[derive(Clone)]
pub struct NasaPowerClient {
    client: reqwest::Client,
    base_url: String,
    cache: Arc<DashMap<(i64, i64), CacheEntry>>,
    max_cached_points: usize,
}

impl NasaPowerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: Arc::new(DashMap::new()),
            max_cached_points: MAX_CACHED_POINTS,
        }
    }

    pub fn with_cache_capacity(mut self, max_cached_points: usize) -> Self {
        self.max_cached_points = max_cached_points.max(1);
        self
    }

    pub fn cached_points(&self) -> usize {
        self.cache.len()
    }

    fn cached(&self, key: (i64, i64)) -> Option<ClimatologyReading> {
        let entry = self.cache.get(&key)?;
        if entry.cached_at.elapsed() < CACHE_TTL {
            return Some(entry.reading);
        }
        drop(entry);
        self.cache.remove(&key);
        None
    }

    /// Insert a reading, first dropping expired entries and then the oldest
    /// one if the cache is still full.
    fn store(&self, key: (i64, i64), reading: ClimatologyReading) {
        if self.cache.len() >= self.max_cached_points && !self.cache.contains_key(&key) {
            self.cache.retain(|_, e| e.cached_at.elapsed() < CACHE_TTL);

            if self.cache.len() >= self.max_cached_points {
                let oldest = self
                    .cache
                    .iter()
                    .min_by_key(|e| e.value().cached_at)
                    .map(|e| *e.key());
                if let Some(oldest) = oldest {
                    self.cache.remove(&oldest);
                }
            }
        }

        self.cache.insert(
            key,
            CacheEntry {
                reading,
                cached_at: Instant::now(),
            },
        );
    }

    /// Fetch annual climatology for a point, served from the point cache when fresh.
    pub async fn get_climatology(&self, location: GeoPoint) -> ClimateResult<ClimatologyReading> {
        let key = cache_key(location);
        if let Some(hit) = self.cached(key) {
            tracing::debug!("POWER cache hit for {:?}", key);
            return Ok(hit);
        }

        let url = format!("{}/api/temporal/climatology/point", self.base_url);
        let parameters = format!("{},{},{}", SOLAR_PARAM, TEMPERATURE_PARAM, PRECIPITATION_PARAM);
        let longitude = location.longitude.to_string();
        let latitude = location.latitude.to_string();
        let response = send_request(
            &self.client,
            None,
            self.client.get(&url).query(&[
                ("parameters", parameters.as_str()),
                ("community", "RE"),
                ("longitude", longitude.as_str()),
                ("latitude", latitude.as_str()),
                ("format", "JSON"),
            ]),
            SERVICE,
        )
        .await?;
        let response = ensure_success(response, SERVICE).await?;
        let body = response.text().await?;
        let reading = parse_climatology(&body)?;

        if reading == ClimatologyReading::default() {
            tracing::warn!(
                "POWER returned no usable annual values for ({}, {})",
                location.latitude,
                location.longitude
            );
        } else {
            self.store(key, reading);
        }

        Ok(reading)
    }
}

#[async_trait]
impl ClimatologySource for NasaPowerClient {
    async fn climatology(&self, location: GeoPoint) -> ClimateResult<ClimatologyReading> {
        self.get_climatology(location).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = r#"{
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [72.87, 19.07, 12.0]},
        "properties": {
            "parameter": {
                "ALLSKY_SFC_SW_DWN": {"JAN": 5.1, "ANN": 5.42},
                "T2M": {"JAN": 24.0, "ANN": 27.31},
                "PRECTOT": {"JAN": 0.1, "ANN": 6.85}
            }
        }
    }"#;

    #[test]
    fn test_daily_means_scale_to_annual_totals() {
        let reading = parse_climatology(SAMPLE).unwrap();
        assert_relative_eq!(reading.solar_irradiance.unwrap(), 1978.3, epsilon = 1e-9);
        assert_relative_eq!(reading.temperature.unwrap(), 27.31);
        assert_relative_eq!(reading.precipitation.unwrap(), 2500.25, epsilon = 1e-9);
    }

    #[test]
    fn test_fill_value_and_missing_parameters_are_absent() {
        let body = r#"{"properties": {"parameter": {
            "ALLSKY_SFC_SW_DWN": {"ANN": -999.0},
            "T2M": {"ANN": "18.5"}
        }}}"#;
        let reading = parse_climatology(body).unwrap();
        assert_eq!(reading.solar_irradiance, None);
        assert_relative_eq!(reading.temperature.unwrap(), 18.5);
        assert_eq!(reading.precipitation, None);
    }

    #[test]
    fn test_corrected_precipitation_fallback() {
        let body = r#"{"properties": {"parameter": {"PRECTOTCORR": {"ANN": 3.2}}}}"#;
        let reading = parse_climatology(body).unwrap();
        assert_relative_eq!(reading.precipitation.unwrap(), 1168.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_properties_is_invalid() {
        let body = r#"{"messages": ["bad request"], "header": {}}"#;
        let err = parse_climatology(body).unwrap_err();
        assert!(matches!(err, ClimateError::InvalidResponse(_)));
    }

    #[test]
    fn test_cache_key_rounds_to_two_decimals() {
        assert_eq!(cache_key(GeoPoint::new(19.071, 72.874)), cache_key(GeoPoint::new(19.069, 72.8749)));
        assert_ne!(cache_key(GeoPoint::new(19.07, 72.87)), cache_key(GeoPoint::new(19.08, 72.87)));
    }

    fn reading(precipitation: f64) -> ClimatologyReading {
        ClimatologyReading {
            solar_irradiance: Some(1900.0),
            temperature: Some(25.0),
            precipitation: Some(precipitation),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_is_bounded() {
        let client = NasaPowerClient::new(DEFAULT_BASE_URL, Duration::from_secs(5)).with_cache_capacity(3);
        for i in 0..10 {
            client.store((i, i), reading(i as f64));
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        assert_eq!(client.cached_points(), 3);
        // Oldest points went first
        assert_eq!(client.cached((0, 0)), None);
        assert_eq!(client.cached((9, 9)), Some(reading(9.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_entries_expire() {
        let client = NasaPowerClient::new(DEFAULT_BASE_URL, Duration::from_secs(5));
        client.store((1907, 7287), reading(1450.0));
        assert_eq!(client.cached((1907, 7287)), Some(reading(1450.0)));

        tokio::time::advance(CACHE_TTL).await;
        assert_eq!(client.cached((1907, 7287)), None);
        assert_eq!(client.cached_points(), 0);
    }
}
