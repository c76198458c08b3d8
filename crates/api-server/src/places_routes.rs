use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use climate_client::places::DEFAULT_PLACE_TYPE;
use serde::{Deserialize, Serialize};

use crate::{parse_coordinates, ApiResponse, AppError, AppState};

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PlacesQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    /// Google place type, defaults to insurance_agency
    #[serde(rename = "type")]
    pub place_type: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct NearbyPlace {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PlacesResponse {
    pub places: Vec<NearbyPlace>,
}

pub fn places_routes() -> Router<AppState> {
    Router::new().route("/api/places", get(get_nearby_places))
}

#[utoipa::path(
    get,
    path = "/api/places",
    params(PlacesQuery),
    responses(
        (status = 200, description = "Places within 10 km", body = PlacesResponse),
        (status = 400, description = "Missing coordinates"),
        (status = 503, description = "Google Maps key not configured"),
        (status = 500, description = "Places request failed")
    ),
    tag = "Environment"
)]
pub(crate) async fn get_nearby_places(
    State(state): State<AppState>,
    Query(query): Query<PlacesQuery>,
) -> Result<Json<ApiResponse<PlacesResponse>>, AppError> {
    let location = parse_coordinates(query.lat.as_deref(), query.lng.as_deref())
        .ok_or_else(|| AppError::bad_request("Missing lat/lng"))?;
    let source = state
        .places
        .as_ref()
        .ok_or_else(|| AppError::unavailable("Places search not configured"))?;

    let place_type = query
        .place_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_PLACE_TYPE);

    let places = source
        .nearby(location, place_type)
        .await
        .map_err(|e| AppError::upstream("Failed to fetch places", e))?;

    Ok(Json(ApiResponse::success(PlacesResponse {
        places: places
            .into_iter()
            .map(|p| NearbyPlace {
                name: p.name,
                lat: p.lat,
                lng: p.lng,
            })
            .collect(),
    })))
}
