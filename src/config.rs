//! Application-level configuration resolved once from the environment.

use std::{env, time::Duration};

use tracing::warn;

/// Default server tag applied when a registration does not name one.
const DEFAULT_SERVER: &str = "euw1";
/// Default base URL template for the match provider; `{server}` is replaced
/// by the player's server tag.
const DEFAULT_PROVIDER_BASE_URL: &str = "https://{server}.api.arena-game.example";
/// Interval between reconciliation passes.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 25;
/// How long an awaiting match may stay uncorrelated before it is dropped.
const DEFAULT_AWAITING_TIMEOUT_SECS: u64 = 600;
/// Elapsed game time after which predictions can no longer be changed.
const DEFAULT_PREDICTION_LOCK_SECS: i64 = 30;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API key sent to the match provider.
    pub provider_api_key: String,
    /// Base URL template for the match provider, containing `{server}`.
    pub provider_base_url: String,
    /// URL of the spreadsheet feed defining the ladder, when configured.
    pub ladder_sheet_url: Option<String>,
    /// Server tag used when registrations omit one.
    pub default_server: String,
    /// Interval between timer-driven reconciliation passes.
    pub poll_interval: Duration,
    /// Awaiting-match tracking window in seconds.
    pub awaiting_timeout_secs: i64,
    /// Elapsed live-match seconds after which prediction changes conflict.
    pub prediction_lock_secs: i64,
}

impl AppConfig {
    /// Resolve the configuration from environment variables, falling back
    /// to built-in defaults with a warning.
    pub fn from_env() -> Self {
        let provider_api_key = env::var("PROVIDER_API_KEY").unwrap_or_else(|_| {
            warn!("PROVIDER_API_KEY is not set; provider requests will be unauthenticated");
            String::new()
        });

        let provider_base_url =
            env::var("PROVIDER_BASE_URL").unwrap_or_else(|_| DEFAULT_PROVIDER_BASE_URL.to_owned());

        let ladder_sheet_url = env::var("LADDER_SHEET_URL").ok().filter(|url| {
            if url.is_empty() {
                warn!("LADDER_SHEET_URL is empty; ladder titles will not resolve");
                return false;
            }
            true
        });
        if ladder_sheet_url.is_none() {
            warn!("no ladder sheet configured; ladder titles will be empty");
        }

        let default_server =
            env::var("DEFAULT_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_owned());

        let poll_interval = env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));

        let awaiting_timeout_secs = env::var("AWAITING_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(DEFAULT_AWAITING_TIMEOUT_SECS as i64);

        Self {
            provider_api_key,
            provider_base_url,
            ladder_sheet_url,
            default_server,
            poll_interval,
            awaiting_timeout_secs,
            prediction_lock_secs: DEFAULT_PREDICTION_LOCK_SECS,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider_api_key: String::new(),
            provider_base_url: DEFAULT_PROVIDER_BASE_URL.to_owned(),
            ladder_sheet_url: None,
            default_server: DEFAULT_SERVER.to_owned(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            awaiting_timeout_secs: DEFAULT_AWAITING_TIMEOUT_SECS as i64,
            prediction_lock_secs: DEFAULT_PREDICTION_LOCK_SECS,
        }
    }
}
