use async_trait::async_trait;
use risk_core::GeoPoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ClimateResult;
use crate::provider::AirQualitySource;
use crate::rate_limit::{ensure_success, send_request, RateLimiter};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const SERVICE: &str = "OpenWeather";

/// Current air quality at one point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AirReading {
    /// PM2.5 concentration, μg/m³
    pub pm25: Option<f64>,
    /// OpenWeather air quality index, 1 (good) to 5 (very poor)
    pub aqi: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionResponse {
    #[serde(default)]
    list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionEntry {
    main: Option<AirPollutionMain>,
    components: Option<AirPollutionComponents>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionMain {
    aqi: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct AirPollutionComponents {
    pm2_5: Option<f64>,
}

/// Read the first entry of an air pollution response. An empty list is not an
/// error; it just yields an empty reading.
pub fn parse_air_pollution(body: &str) -> ClimateResult<AirReading> {
    let response: AirPollutionResponse = serde_json::from_str(body)?;
    let Some(entry) = response.list.into_iter().next() else {
        return Ok(AirReading::default());
    };

    Ok(AirReading {
        pm25: entry
            .components
            .and_then(|c| c.pm2_5)
            .filter(|v| v.is_finite()),
        aqi: entry.main.and_then(|m| m.aqi),
    })
}

#[derive(Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl OpenWeatherClient {
    /// `rate_limit` is requests per minute; the free tier allows 60.
    pub fn new(api_key: String, base_url: impl Into<String>, timeout: Duration, rate_limit: usize) -> Self {
        Self {
            api_key,
            client: crate::http_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::per_minute(rate_limit),
        }
    }

    pub async fn get_air_pollution(&self, location: GeoPoint) -> ClimateResult<AirReading> {
        let url = format!("{}/data/2.5/air_pollution", self.base_url);
        let lat = location.latitude.to_string();
        let lon = location.longitude.to_string();

        let response = send_request(
            &self.client,
            Some(&self.rate_limiter),
            self.client.get(&url).query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
            ]),
            SERVICE,
        )
        .await?;
        let response = ensure_success(response, SERVICE).await?;
        let body = response.text().await?;
        parse_air_pollution(&body)
    }
}

#[async_trait]
impl AirQualitySource for OpenWeatherClient {
    async fn air_quality(&self, location: GeoPoint) -> ClimateResult<AirReading> {
        self.get_air_pollution(location).await
    }
}
