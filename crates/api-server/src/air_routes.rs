use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{parse_coordinates, ApiResponse, AppError, AppState};

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AirQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AirQuality {
    /// PM2.5 concentration, μg/m³
    pub pm25: Option<f64>,
    /// 1 (good) to 5 (very poor)
    pub aqi: Option<u8>,
}

pub fn air_routes() -> Router<AppState> {
    Router::new().route("/api/air", get(get_air_quality))
}

#[utoipa::path(
    get,
    path = "/api/air",
    params(AirQuery),
    responses(
        (status = 200, description = "Current PM2.5 and AQI", body = AirQuality),
        (status = 400, description = "Missing coordinates or OpenWeather key"),
        (status = 500, description = "OpenWeather request failed")
    ),
    tag = "Environment"
)]
pub(crate) async fn get_air_quality(
    State(state): State<AppState>,
    Query(query): Query<AirQuery>,
) -> Result<Json<ApiResponse<AirQuality>>, AppError> {
    let location = parse_coordinates(query.lat.as_deref(), query.lng.as_deref());
    let (Some(location), Some(source)) = (location, state.air_quality.as_ref()) else {
        return Err(AppError::bad_request("Missing parameters or API key"));
    };

    let reading = source
        .air_quality(location)
        .await
        .map_err(|e| AppError::upstream("Failed to fetch air data", e))?;

    Ok(Json(ApiResponse::success(AirQuality {
        pm25: reading.pm25,
        aqi: reading.aqi,
    })))
}
