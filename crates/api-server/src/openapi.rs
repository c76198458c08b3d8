use risk_core::{HazardType, RiskOverlay, RiskTier, Rgb, SampleField};
use utoipa::OpenApi;

use crate::air_routes::AirQuality;
use crate::assess_routes::{AssessBody, AssessmentResult};
use crate::places_routes::{NearbyPlace, PlacesResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RiskScape API",
        description = "Climate risk overlays from NASA POWER climatology and OpenWeather air quality"
    ),
    paths(
        crate::overlay_routes::get_risk_overlay,
        crate::air_routes::get_air_quality,
        crate::places_routes::get_nearby_places,
        crate::assess_routes::assess_risk,
    ),
    components(schemas(
        RiskOverlay,
        RiskTier,
        HazardType,
        Rgb,
        SampleField,
        AirQuality,
        NearbyPlace,
        PlacesResponse,
        AssessBody,
        AssessmentResult,
    )),
    tags(
        (name = "Risk", description = "Hazard classification"),
        (name = "Environment", description = "Air quality and nearby services"),
        (name = "Assessment", description = "LLM risk narrative")
    )
)]
pub struct ApiDoc;
