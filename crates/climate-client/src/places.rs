use async_trait::async_trait;
use risk_core::GeoPoint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClimateError, ClimateResult};
use crate::provider::PlaceSearch;
use crate::rate_limit::{ensure_success, send_request};

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";
pub const DEFAULT_PLACE_TYPE: &str = "insurance_agency";
pub const SEARCH_RADIUS_METERS: u32 = 10_000;

const SERVICE: &str = "Google Places";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: Option<String>,
    geometry: Option<PlaceGeometry>,
}

#[derive(Debug, Deserialize)]
struct PlaceGeometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Parse a nearby-search response. Results without a name or position are dropped.
pub fn parse_nearby_search(body: &str) -> ClimateResult<Vec<Place>> {
    let response: NearbySearchResponse = serde_json::from_str(body)?;

    match response.status.as_deref() {
        None | Some("OK") | Some("ZERO_RESULTS") => {}
        Some(status) => {
            return Err(ClimateError::InvalidResponse(format!(
                "Places status {}: {}",
                status,
                response.error_message.unwrap_or_default()
            )));
        }
    }

    Ok(response
        .results
        .into_iter()
        .filter_map(|r| {
            let geometry = r.geometry?;
            Some(Place {
                name: r.name?,
                lat: geometry.location.lat,
                lng: geometry.location.lng,
            })
        })
        .collect())
}

#[derive(Clone)]
pub struct PlacesClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl PlacesClient {
    pub fn new(api_key: String, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key,
            client: crate::http_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn nearby_search(&self, location: GeoPoint, place_type: &str) -> ClimateResult<Vec<Place>> {
        let url = format!("{}/maps/api/place/nearbysearch/json", self.base_url);
        let loc = format!("{},{}", location.latitude, location.longitude);
        let radius = SEARCH_RADIUS_METERS.to_string();

        let response = send_request(
            &self.client,
            None,
            self.client.get(&url).query(&[
                ("location", loc.as_str()),
                ("radius", radius.as_str()),
                ("type", place_type),
                ("key", self.api_key.as_str()),
            ]),
            SERVICE,
        )
        .await?;
        let response = ensure_success(response, SERVICE).await?;
        let body = response.text().await?;
        let places = parse_nearby_search(&body)?;
        tracing::debug!("Places: {} results of type {}", places.len(), place_type);
        Ok(places)
    }
}

#[async_trait]
impl PlaceSearch for PlacesClient {
    async fn nearby(&self, location: GeoPoint, place_type: &str) -> ClimateResult<Vec<Place>> {
        self.nearby_search(location, place_type).await
    }
}
