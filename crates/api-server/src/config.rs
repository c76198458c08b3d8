use anyhow::{bail, Context, Result};
use climate_client::ClientConfig;
use risk_core::{HazardMode, MissingFieldPolicy};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    // Upstream credentials; endpoints that need a missing key degrade
    pub openweather_api_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,

    pub clients: ClientConfig,

    // Classification behaviour
    pub hazard_mode: HazardMode,
    pub missing_field_policy: MissingFieldPolicy,

    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub request_timeout: Duration,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests don't touch process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ClientConfig::default();
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let upstream_timeout_secs = var("UPSTREAM_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .context("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")?;

        let config = Self {
            bind_addr: var("BIND_ADDR", "0.0.0.0:3000")
                .parse::<SocketAddr>()
                .context("BIND_ADDR must be host:port")?,

            openweather_api_key: non_empty(lookup("OPENWEATHER_API_KEY")),
            google_maps_api_key: non_empty(lookup("GOOGLE_MAPS_API_KEY")),
            openrouter_api_key: non_empty(lookup("OPENROUTER_API_KEY")),

            clients: ClientConfig {
                nasa_power_url: var("NASA_POWER_BASE_URL", defaults.nasa_power_url.as_str()),
                openweather_url: var("OPENWEATHER_BASE_URL", defaults.openweather_url.as_str()),
                google_maps_url: var("GOOGLE_MAPS_BASE_URL", defaults.google_maps_url.as_str()),
                openrouter_url: var("OPENROUTER_BASE_URL", defaults.openrouter_url.as_str()),
                openrouter_model: var("OPENROUTER_MODEL", defaults.openrouter_model.as_str()),
                openweather_rate_limit: var("OPENWEATHER_RATE_LIMIT", "60")
                    .parse::<usize>()
                    .context("OPENWEATHER_RATE_LIMIT must be requests per minute")?,
                timeout: Duration::from_secs(upstream_timeout_secs),
            },

            hazard_mode: var("HAZARD_MODE", "legacy")
                .parse::<HazardMode>()
                .map_err(anyhow::Error::msg)
                .context("HAZARD_MODE")?,
            missing_field_policy: var("MISSING_FIELD_POLICY", "default")
                .parse::<MissingFieldPolicy>()
                .map_err(anyhow::Error::msg)
                .context("MISSING_FIELD_POLICY")?,

            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            // Outer deadline must leave room for the upstream calls
            request_timeout: Duration::from_secs(upstream_timeout_secs + 5),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.clients.openweather_rate_limit == 0 {
            bail!("OPENWEATHER_RATE_LIMIT must be at least 1");
        }
        if self.clients.timeout.is_zero() {
            bail!("UPSTREAM_TIMEOUT_SECS must be at least 1");
        }
        for (name, url) in [
            ("NASA_POWER_BASE_URL", &self.clients.nasa_power_url),
            ("OPENWEATHER_BASE_URL", &self.clients.openweather_url),
            ("GOOGLE_MAPS_BASE_URL", &self.clients.google_maps_url),
            ("OPENROUTER_BASE_URL", &self.clients.openrouter_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("{} must be an http(s) URL, got '{}'", name, url);
            }
        }
        Ok(())
    }
}
