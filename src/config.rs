//! Process configuration, read once at startup from environment variables.

use std::time::Duration;

use crate::timer::TimerConfig;

/// Runtime settings. Every field has a default so the binary runs with no
/// environment at all.
#[derive(Debug, Clone)]
pub struct Settings {
    /// TCP port the HTTP/WebSocket server binds.
    pub port: u16,
    /// Fraction of a session's duration after which the time warning fires.
    pub warning_threshold: f64,
    /// Cadence of timer ticks pushed to operator clients.
    pub tick_interval: Duration,
    /// Base URL of the voice-agent token service, if token minting is enabled.
    pub token_endpoint: Option<String>,
    /// API key forwarded to the token service.
    pub token_api_key: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("PODIUM_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let warning_threshold: f64 = std::env::var("PODIUM_WARNING_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v: &f64| (0.0..1.0).contains(v))
            .unwrap_or(0.80);

        let tick_interval = std::env::var("PODIUM_TICK_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(Duration::from_secs(1), Duration::from_millis);

        let token_endpoint = std::env::var("PODIUM_TOKEN_ENDPOINT").ok();
        let token_api_key = std::env::var("PODIUM_TOKEN_API_KEY").ok();

        Self {
            port,
            warning_threshold,
            tick_interval,
            token_endpoint,
            token_api_key,
        }
    }

    pub fn timer_config(&self) -> TimerConfig {
        TimerConfig {
            tick_interval: self.tick_interval,
            warning_threshold: self.warning_threshold,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 8000,
            warning_threshold: 0.80,
            tick_interval: Duration::from_secs(1),
            token_endpoint: None,
            token_api_key: None,
        }
    }
}
