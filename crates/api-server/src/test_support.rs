use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use climate_client::{
    AirQualitySource, AirReading, AssessmentOutcome, AssessmentRequest, ClimateError,
    ClimateResult, ClimatologyReading, ClimatologySource, Place, PlaceSearch, RiskAssessor,
};
use risk_core::{GeoPoint, HazardMode, MissingFieldPolicy};
use tower::ServiceExt;

use crate::{api_routes, AppState};

pub struct FakeClimatology {
    pub reading: Option<ClimatologyReading>,
    pub calls: AtomicUsize,
}

impl FakeClimatology {
    pub fn returning(reading: ClimatologyReading) -> Arc<Self> {
        Arc::new(Self {
            reading: Some(reading),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reading: None,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ClimatologySource for FakeClimatology {
    async fn climatology(&self, _location: GeoPoint) -> ClimateResult<ClimatologyReading> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reading
            .ok_or_else(|| ClimateError::InvalidResponse("climatology unavailable".to_string()))
    }
}

pub struct FakeAir(pub Option<AirReading>);

#[async_trait]
impl AirQualitySource for FakeAir {
    async fn air_quality(&self, _location: GeoPoint) -> ClimateResult<AirReading> {
        self.0
            .ok_or_else(|| ClimateError::InvalidResponse("air quality unavailable".to_string()))
    }
}

pub struct FakePlaces(pub Vec<Place>);

#[async_trait]
impl PlaceSearch for FakePlaces {
    async fn nearby(&self, location: GeoPoint, place_type: &str) -> ClimateResult<Vec<Place>> {
        if place_type == "broken" {
            return Err(ClimateError::InvalidResponse("REQUEST_DENIED".to_string()));
        }
        // Echo the requested type and position through the first result
        let mut places = self.0.clone();
        if let Some(first) = places.first_mut() {
            first.name = format!("{} ({})", first.name, place_type);
            first.lat = location.latitude;
        }
        Ok(places)
    }
}

pub struct FakeAssessor(pub AssessmentOutcome);

#[async_trait]
impl RiskAssessor for FakeAssessor {
    async fn assess(&self, _request: &AssessmentRequest) -> ClimateResult<AssessmentOutcome> {
        Ok(self.0.clone())
    }

    fn backend_name(&self) -> &'static str {
        "fake"
    }
}

/// Typical humid coastal reading as annual totals: no drought, medium flood.
pub fn coastal_climatology() -> ClimatologyReading {
    ClimatologyReading {
        solar_irradiance: Some(1850.0),
        temperature: Some(27.5),
        precipitation: Some(1450.0),
    }
}

pub fn state_with(climatology: Arc<dyn ClimatologySource>, air: Option<AirReading>) -> AppState {
    AppState {
        climatology,
        air_quality: air.map(|r| Arc::new(FakeAir(Some(r))) as Arc<dyn AirQualitySource>),
        places: None,
        assessor: None,
        hazard_mode: HazardMode::Legacy,
        missing_field_policy: MissingFieldPolicy::Default,
    }
}

pub fn app_router(state: AppState) -> Router {
    api_routes().with_state(state)
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(router, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(router: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}
