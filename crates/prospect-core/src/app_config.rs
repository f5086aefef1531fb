/// Runtime settings for the search client, read from `PROSPECT_*`
/// environment variables by [`crate::load_app_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the search API, always carrying a scheme.
    pub api_url: String,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Automatic retries after a transient upstream failure.
    pub max_retries: u32,
    /// Linear backoff step: retry `n` waits `n * retry_base_delay_ms`.
    pub retry_base_delay_ms: u64,
    pub progress_tick_ms: u64,
    /// Percentage the synthetic progress estimate approaches but never reaches.
    pub progress_ceiling_pct: f64,
    /// How long a finished search keeps showing 100% before resetting.
    pub progress_hold_ms: u64,
}
