use std::net::IpAddr;

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Deployment used when `PROSPECT_API_URL` is unset or blank.
pub const DEFAULT_API_URL: &str = "https://prospect-backend-three.vercel.app";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Core parsing/validation logic, decoupled from the process environment so
/// it can be tested with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let api_url = normalize_api_base_url(&or_default("PROSPECT_API_URL", DEFAULT_API_URL));
    let log_level = or_default("PROSPECT_LOG_LEVEL", "info");
    let request_timeout_secs = parse_u64("PROSPECT_REQUEST_TIMEOUT_SECS", "120")?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "PROSPECT_REQUEST_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let user_agent = or_default("PROSPECT_USER_AGENT", "prospect/0.1 (prospect-search)");

    let max_retries = parse_u32("PROSPECT_MAX_RETRIES", "3")?;
    let retry_base_delay_ms = parse_u64("PROSPECT_RETRY_BASE_DELAY_MS", "2000")?;

    let progress_tick_ms = parse_u64("PROSPECT_PROGRESS_TICK_MS", "500")?;
    if progress_tick_ms == 0 {
        return Err(invalid(
            "PROSPECT_PROGRESS_TICK_MS",
            "must be greater than zero".to_string(),
        ));
    }
    let progress_ceiling_pct = or_default("PROSPECT_PROGRESS_CEILING", "92")
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid("PROSPECT_PROGRESS_CEILING", e.to_string()))?;
    if !(progress_ceiling_pct > 0.0 && progress_ceiling_pct < 100.0) {
        return Err(invalid(
            "PROSPECT_PROGRESS_CEILING",
            format!("{progress_ceiling_pct} is outside (0, 100)"),
        ));
    }
    let progress_hold_ms = parse_u64("PROSPECT_PROGRESS_HOLD_MS", "1000")?;

    Ok(AppConfig {
        api_url,
        log_level,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_base_delay_ms,
        progress_tick_ms,
        progress_ceiling_pct,
        progress_hold_ms,
    })
}

/// Gives a bare host a scheme: `http://` for loopback hosts, `https://`
/// otherwise. URLs that already carry a scheme are kept. Trailing slashes
/// are removed.
#[must_use]
pub fn normalize_api_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }
    let scheme = if is_loopback_host(trimmed) {
        "http"
    } else {
        "https"
    };
    format!("{scheme}://{trimmed}")
}

fn is_loopback_host(authority_and_path: &str) -> bool {
    let authority = authority_and_path
        .split('/')
        .next()
        .unwrap_or(authority_and_path);

    // Bare IPv6 literal such as `::1`.
    if let Ok(ip) = authority.parse::<IpAddr>() {
        return ip.is_loopback();
    }

    let host = if let Some(rest) = authority.strip_prefix('[') {
        rest.split(']').next().unwrap_or(rest)
    } else {
        authority
            .rsplit_once(':')
            .map_or(authority, |(host, _port)| host)
    };

    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
