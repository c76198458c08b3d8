//! Deterministic threshold classifier for map risk overlays.
//!
//! Each hazard is a two-level cascade checked most-severe first. Comparisons
//! are strict on both levels, so a value sitting exactly on a threshold falls
//! into the less severe tier (precipitation of exactly 1600 mm is a Medium
//! flood risk, not High).
//!
//! Rendering hints depend only on the tier: two locations with the same tier
//! render identically however far past a threshold they sit.

use crate::sample::{EnvironmentalSample, ResolvedSample};
use crate::types::{GeoPoint, HazardSelection, HazardType, RiskOverlay, RiskTier, Rgb};

pub const DROUGHT_HIGH_SOLAR: f64 = 1500.0;
pub const DROUGHT_HIGH_PRECIPITATION: f64 = 800.0;
pub const DROUGHT_MEDIUM_SOLAR: f64 = 1700.0;
pub const DROUGHT_MEDIUM_PRECIPITATION: f64 = 1000.0;

pub const FLOOD_HIGH_PRECIPITATION: f64 = 1600.0;
pub const FLOOD_MEDIUM_PRECIPITATION: f64 = 1200.0;

pub const FINANCIAL_HIGH_PM25: f64 = 90.0;
pub const FINANCIAL_HIGH_TEMPERATURE: f64 = 32.0;
pub const FINANCIAL_MEDIUM_PM25: f64 = 70.0;

/// Same radius for every tier.
pub const OVERLAY_RADIUS_METERS: u32 = 15_000;

/// Tier for a sample under the given hazard.
pub fn assess_tier(sample: &EnvironmentalSample, hazard: HazardType) -> RiskTier {
    let s = sample;
    match hazard {
        HazardType::Drought => {
            if s.solar_irradiance < DROUGHT_HIGH_SOLAR || s.precipitation < DROUGHT_HIGH_PRECIPITATION {
                RiskTier::High
            } else if s.solar_irradiance < DROUGHT_MEDIUM_SOLAR
                || s.precipitation < DROUGHT_MEDIUM_PRECIPITATION
            {
                RiskTier::Medium
            } else {
                RiskTier::Low
            }
        }
        HazardType::Flood => {
            if s.precipitation > FLOOD_HIGH_PRECIPITATION {
                RiskTier::High
            } else if s.precipitation > FLOOD_MEDIUM_PRECIPITATION {
                RiskTier::Medium
            } else {
                RiskTier::Low
            }
        }
        HazardType::Financial => {
            if s.pm25 > FINANCIAL_HIGH_PM25 || s.temperature > FINANCIAL_HIGH_TEMPERATURE {
                RiskTier::High
            } else if s.pm25 > FINANCIAL_MEDIUM_PM25 {
                RiskTier::Medium
            } else {
                RiskTier::Low
            }
        }
    }
}

pub fn overlay_color(tier: RiskTier) -> Rgb {
    match tier {
        RiskTier::High => Rgb::RED,
        RiskTier::Medium => Rgb::YELLOW,
        RiskTier::Low => Rgb::GREEN,
    }
}

fn overlay_for(location: GeoPoint, tier: RiskTier) -> RiskOverlay {
    RiskOverlay {
        latitude: location.latitude,
        longitude: location.longitude,
        tier,
        color: overlay_color(tier),
        radius_meters: OVERLAY_RADIUS_METERS,
        uncertain_fields: Vec::new(),
    }
}

/// Classify a location for a known hazard.
pub fn classify(location: GeoPoint, sample: &EnvironmentalSample, hazard: HazardType) -> RiskOverlay {
    overlay_for(location, assess_tier(sample, hazard))
}

/// Classify a parsed selector; an unrecognized hazard is always Low.
pub fn classify_selection(
    location: GeoPoint,
    sample: &EnvironmentalSample,
    selection: &HazardSelection,
) -> RiskOverlay {
    match selection.hazard() {
        Some(hazard) => classify(location, sample, hazard),
        None => overlay_for(location, RiskTier::Low),
    }
}

/// Classify a validated sample, carrying its uncertain fields onto the overlay.
pub fn classify_resolved(
    location: GeoPoint,
    resolved: &ResolvedSample,
    selection: &HazardSelection,
) -> RiskOverlay {
    let mut overlay = classify_selection(location, &resolved.sample, selection);
    overlay.uncertain_fields = resolved.uncertain_fields.clone();
    overlay
}
