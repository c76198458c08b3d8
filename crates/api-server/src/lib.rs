//! RiskScape HTTP API.
//!
//! Serves the climate risk overlay classifier and the upstream pass-through
//! endpoints (air quality, nearby insurers, LLM assessment).

pub mod config;

mod air_routes;
mod assess_routes;
mod openapi;
mod overlay_routes;
mod places_routes;
mod request_id;
mod security_headers;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    error_handling::HandleErrorLayer,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    BoxError, Json, Router,
};
use climate_client::{
    AirQualitySource, ClimatologySource, NasaPowerClient, OpenRouterAssessor, OpenWeatherClient,
    PlaceSearch, PlacesClient, RiskAssessor,
};
use risk_core::{GeoPoint, HazardMode, MissingFieldPolicy, RiskError};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ServerConfig;

/// Shared handler state. Optional sources are absent when their API key is not configured.
#[derive(Clone)]
pub struct AppState {
    pub climatology: Arc<dyn ClimatologySource>,
    pub air_quality: Option<Arc<dyn AirQualitySource>>,
    pub places: Option<Arc<dyn PlaceSearch>>,
    pub assessor: Option<Arc<dyn RiskAssessor>>,
    pub hazard_mode: HazardMode,
    pub missing_field_policy: MissingFieldPolicy,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        let clients = &config.clients;

        let air_quality = config.openweather_api_key.clone().map(|key| {
            Arc::new(OpenWeatherClient::new(
                key,
                clients.openweather_url.clone(),
                clients.timeout,
                clients.openweather_rate_limit,
            )) as Arc<dyn AirQualitySource>
        });
        let places = config.google_maps_api_key.clone().map(|key| {
            Arc::new(PlacesClient::new(key, clients.google_maps_url.clone(), clients.timeout))
                as Arc<dyn PlaceSearch>
        });
        let assessor = config.openrouter_api_key.clone().map(|key| {
            let assessor = OpenRouterAssessor::new(
                key,
                clients.openrouter_model.clone(),
                clients.openrouter_url.clone(),
                clients.timeout,
            );
            tracing::info!("Risk assessments via OpenRouter model {}", assessor.model());
            Arc::new(assessor) as Arc<dyn RiskAssessor>
        });

        if air_quality.is_none() {
            tracing::warn!("OPENWEATHER_API_KEY not set: /api/air disabled, overlay pm25 treated as missing");
        }
        if places.is_none() {
            tracing::warn!("GOOGLE_MAPS_API_KEY not set: /api/places disabled");
        }
        if assessor.is_none() {
            tracing::warn!("OPENROUTER_API_KEY not set: /api/assess disabled");
        }

        Self {
            climatology: Arc::new(NasaPowerClient::new(
                clients.nasa_power_url.clone(),
                clients.timeout,
            )),
            air_quality,
            places,
            assessor,
            hazard_mode: config.hazard_mode,
            missing_field_policy: config.missing_field_policy,
        }
    }
}

/// Response envelope shared by every endpoint.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error: an HTTP status plus the message placed in the envelope.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Upstream failure: log the cause, return a fixed message.
    pub fn upstream(message: &str, cause: impl std::fmt::Display) -> Self {
        tracing::error!("{}: {}", message, cause);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err: anyhow::Error = err.into();
        match err.downcast_ref::<RiskError>() {
            Some(e @ RiskError::InvalidHazardType(_)) => Self::bad_request(e.to_string()),
            Some(e @ RiskError::IncompleteSample { .. }) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            None => {
                tracing::error!("Unhandled error: {:#}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

/// Parse `lat`/`lng` query values into a point. Absent, non-numeric, or
/// out-of-range coordinates yield `None`.
pub(crate) fn parse_coordinates(lat: Option<&str>, lng: Option<&str>) -> Option<GeoPoint> {
    let latitude: f64 = lat?.trim().parse().ok()?;
    let longitude: f64 = lng?.trim().parse().ok()?;
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }
    Some(GeoPoint::new(latitude, longitude))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    air_quality: bool,
    places: bool,
    assessor: Option<&'static str>,
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        air_quality: state.air_quality.is_some(),
        places: state.places.is_some(),
        assessor: state.assessor.as_ref().map(|a| a.backend_name()),
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([request_id::REQUEST_ID_HEADER])
}

/// Routes without middleware; tests drive this directly.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(overlay_routes::overlay_routes())
        .merge(air_routes::air_routes())
        .merge(places_routes::places_routes())
        .merge(assess_routes::assess_routes())
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let routes = api_routes()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()));

    with_request_timeout(routes, config.request_timeout)
        .layer(middleware::from_fn(security_headers::security_headers_middleware))
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<axum::body::Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::new(StatusCode::REQUEST_TIMEOUT, "Request timed out")
    } else {
        tracing::error!("Middleware error: {}", err);
        AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

/// Bound handler time; an elapsed deadline renders as an enveloped 408.
fn with_request_timeout<S>(router: Router<S>, timeout: std::time::Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_middleware_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "api_server=info,climate_client=info,tower_http=info".into());

    if json_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Starting RiskScape API");

    let config = ServerConfig::from_env()?;
    tracing::info!("Configuration loaded and validated");
    tracing::info!("  Hazard mode: {:?}", config.hazard_mode);
    tracing::info!("  Missing-field policy: {:?}", config.missing_field_policy);
    tracing::info!("  Upstream timeout: {}s", config.clients.timeout.as_secs());

    let state = AppState::from_config(&config);
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
