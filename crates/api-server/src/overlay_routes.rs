use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use climate_client::{combine_readings, AirReading};
use risk_core::{classify_resolved, HazardSelection, RiskOverlay};
use serde::Deserialize;

use crate::{parse_coordinates, ApiResponse, AppError, AppState};

const FETCH_FAILED: &str = "Failed to fetch risk data";

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverlayQuery {
    /// Latitude in decimal degrees
    pub lat: Option<String>,
    /// Longitude in decimal degrees
    pub lng: Option<String>,
    /// drought (default), flood, or financial
    #[serde(rename = "type")]
    pub hazard: Option<String>,
}

pub fn overlay_routes() -> Router<AppState> {
    Router::new().route("/api/risk-overlay", get(get_risk_overlay))
}

#[utoipa::path(
    get,
    path = "/api/risk-overlay",
    params(OverlayQuery),
    responses(
        (status = 200, description = "Risk overlay for the point", body = RiskOverlay),
        (status = 400, description = "Missing coordinates or invalid hazard type"),
        (status = 422, description = "Sample incomplete under the reject policy"),
        (status = 500, description = "Upstream data source failed")
    ),
    tag = "Risk"
)]
pub(crate) async fn get_risk_overlay(
    State(state): State<AppState>,
    Query(query): Query<OverlayQuery>,
) -> Result<Json<ApiResponse<RiskOverlay>>, AppError> {
    let location = parse_coordinates(query.lat.as_deref(), query.lng.as_deref())
        .ok_or_else(|| AppError::bad_request("Missing lat/lng"))?;
    let selection = HazardSelection::parse(query.hazard.as_deref(), state.hazard_mode)?;

    // Climatology and air quality are independent; fetch both at once
    let air_fetch = async {
        match &state.air_quality {
            Some(source) => source.air_quality(location).await,
            None => Ok(AirReading::default()),
        }
    };
    let (climatology, air) = tokio::join!(state.climatology.climatology(location), air_fetch);
    let climatology = climatology.map_err(|e| AppError::upstream(FETCH_FAILED, e))?;
    let air = air.map_err(|e| AppError::upstream(FETCH_FAILED, e))?;

    let raw = combine_readings(&climatology, &air);
    let required = selection.required_fields();
    let missing = raw.missing_from(required);
    if !missing.is_empty() {
        tracing::warn!(
            "Sample for ({}, {}) missing {:?}, applying {:?} policy",
            location.latitude,
            location.longitude,
            missing,
            state.missing_field_policy
        );
    }
    let resolved = raw.resolve(required, state.missing_field_policy)?;

    let overlay = classify_resolved(location, &resolved, &selection);
    tracing::info!(
        lat = location.latitude,
        lng = location.longitude,
        hazard = ?selection,
        tier = %overlay.tier,
        "Classified risk overlay"
    );

    Ok(Json(ApiResponse::success(overlay)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use axum::http::StatusCode;
    use climate_client::ClimatologyReading;
    use risk_core::{HazardMode, MissingFieldPolicy};
    use std::sync::atomic::Ordering;

    fn clean_air() -> Option<AirReading> {
        Some(AirReading { pm25: Some(12.0), aqi: Some(1) })
    }

    #[tokio::test]
    async fn test_missing_coordinates_is_bad_request() {
        let fake = FakeClimatology::returning(coastal_climatology());
        let app = app_router(state_with(fake.clone(), clean_air()));

        let (status, body) = get_json(app.clone(), "/api/risk-overlay?lat=19.07").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing lat/lng");

        let (status, _) = get_json(app, "/api/risk-overlay?lat=abc&lng=72.87").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_default_hazard_is_drought() {
        let app = app_router(state_with(FakeClimatology::returning(coastal_climatology()), clean_air()));
        let (status, body) = get_json(app, "/api/risk-overlay?lat=19.07&lng=72.87").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let overlay = &body["data"];
        assert_eq!(overlay["lat"], 19.07);
        assert_eq!(overlay["lng"], 72.87);
        assert_eq!(overlay["risk"], "low");
        assert_eq!(overlay["color"], serde_json::json!([0, 255, 0]));
        assert_eq!(overlay["radius"], 15000);
    }

    #[tokio::test]
    async fn test_flood_overlay() {
        let app = app_router(state_with(FakeClimatology::returning(coastal_climatology()), clean_air()));
        let (status, body) = get_json(app, "/api/risk-overlay?lat=19.07&lng=72.87&type=flood").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["risk"], "medium");
        assert_eq!(body["data"]["color"], serde_json::json!([255, 255, 0]));
    }

    #[tokio::test]
    async fn test_financial_overlay_uses_air_quality() {
        let smog = Some(AirReading { pm25: Some(155.0), aqi: Some(5) });
        let app = app_router(state_with(FakeClimatology::returning(coastal_climatology()), smog));
        let (_, body) = get_json(app, "/api/risk-overlay?lat=28.61&lng=77.21&type=financial").await;
        assert_eq!(body["data"]["risk"], "high");
        assert_eq!(body["data"]["color"], serde_json::json!([255, 0, 0]));
    }

    #[tokio::test]
    async fn test_unknown_hazard_legacy_is_low() {
        let dry = ClimatologyReading {
            solar_irradiance: Some(1200.0),
            temperature: Some(40.0),
            precipitation: Some(300.0),
        };
        let app = app_router(state_with(FakeClimatology::returning(dry), clean_air()));
        let (status, body) = get_json(app, "/api/risk-overlay?lat=1&lng=2&type=wildfire").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["risk"], "low");
    }

    #[tokio::test]
    async fn test_unknown_hazard_strict_is_rejected() {
        let mut state = state_with(FakeClimatology::returning(coastal_climatology()), clean_air());
        state.hazard_mode = HazardMode::Strict;
        let (status, body) = get_json(app_router(state), "/api/risk-overlay?lat=1&lng=2&type=wildfire").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid hazard type: wildfire");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500() {
        let app = app_router(state_with(FakeClimatology::failing(), clean_air()));
        let (status, body) = get_json(app, "/api/risk-overlay?lat=1&lng=2").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch risk data");
    }

    #[tokio::test]
    async fn test_missing_precipitation_default_policy_reads_as_drought() {
        let gap = ClimatologyReading {
            solar_irradiance: Some(2000.0),
            temperature: Some(22.0),
            precipitation: None,
        };
        let app = app_router(state_with(FakeClimatology::returning(gap), clean_air()));
        let (status, body) = get_json(app, "/api/risk-overlay?lat=1&lng=2&type=drought").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["risk"], "high");
        assert!(body["data"].get("uncertain_fields").is_none());
    }

    #[tokio::test]
    async fn test_flag_policy_surfaces_uncertain_fields() {
        // No air source configured: pm25 is missing as well
        let mut state = state_with(FakeClimatology::returning(coastal_climatology()), None);
        state.missing_field_policy = MissingFieldPolicy::Flag;
        let (status, body) = get_json(app_router(state), "/api/risk-overlay?lat=1&lng=2&type=financial").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["risk"], "low");
        assert_eq!(body["data"]["uncertain_fields"], serde_json::json!(["pm25"]));
    }

    #[tokio::test]
    async fn test_flag_policy_ignores_fields_the_hazard_does_not_read() {
        let mut state = state_with(FakeClimatology::returning(coastal_climatology()), None);
        state.missing_field_policy = MissingFieldPolicy::Flag;
        let (status, body) = get_json(app_router(state), "/api/risk-overlay?lat=1&lng=2&type=flood").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["risk"], "medium");
        assert!(body["data"].get("uncertain_fields").is_none());
    }

    #[tokio::test]
    async fn test_reject_policy_without_air_source() {
        let mut state = state_with(FakeClimatology::returning(coastal_climatology()), None);
        state.missing_field_policy = MissingFieldPolicy::Reject;
        let app = app_router(state);

        // Drought and flood never read pm25
        for hazard in ["drought", "flood"] {
            let uri = format!("/api/risk-overlay?lat=1&lng=2&type={}", hazard);
            let (status, body) = get_json(app.clone(), &uri).await;
            assert_eq!(status, StatusCode::OK, "{}", hazard);
            assert_eq!(body["success"], true);
        }

        let (status, body) = get_json(app, "/api/risk-overlay?lat=1&lng=2&type=financial").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Incomplete sample: missing pm25");
    }

    #[tokio::test]
    async fn test_reject_policy_unknown_hazard_needs_nothing() {
        let gap = ClimatologyReading {
            solar_irradiance: None,
            temperature: None,
            precipitation: None,
        };
        let mut state = state_with(FakeClimatology::returning(gap), None);
        state.missing_field_policy = MissingFieldPolicy::Reject;
        let (status, body) = get_json(app_router(state), "/api/risk-overlay?lat=1&lng=2&type=wildfire").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["risk"], "low");
    }
}
