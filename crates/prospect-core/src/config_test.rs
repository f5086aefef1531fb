use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn build_app_config_uses_defaults_for_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.api_url, DEFAULT_API_URL);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.request_timeout_secs, 120);
    assert_eq!(cfg.user_agent, "prospect/0.1 (prospect-search)");
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.retry_base_delay_ms, 2000);
    assert_eq!(cfg.progress_tick_ms, 500);
    assert!((cfg.progress_ceiling_pct - 92.0).abs() < f64::EPSILON);
    assert_eq!(cfg.progress_hold_ms, 1000);
}

#[test]
fn blank_api_url_falls_back_to_default() {
    let mut map = HashMap::new();
    map.insert("PROSPECT_API_URL", "  ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.api_url, DEFAULT_API_URL);
}

#[test]
fn api_url_without_scheme_is_normalized() {
    let mut map = HashMap::new();
    map.insert("PROSPECT_API_URL", "api.example.com/");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.api_url, "https://api.example.com");
}

#[test]
fn overrides_are_parsed() {
    let mut map = HashMap::new();
    map.insert("PROSPECT_MAX_RETRIES", "5");
    map.insert("PROSPECT_RETRY_BASE_DELAY_MS", "250");
    map.insert("PROSPECT_PROGRESS_CEILING", "80.5");
    map.insert("PROSPECT_LOG_LEVEL", "debug");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.max_retries, 5);
    assert_eq!(cfg.retry_base_delay_ms, 250);
    assert!((cfg.progress_ceiling_pct - 80.5).abs() < f64::EPSILON);
    assert_eq!(cfg.log_level, "debug");
}

#[test]
fn invalid_max_retries_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PROSPECT_MAX_RETRIES", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PROSPECT_MAX_RETRIES"),
        "expected InvalidEnvVar(PROSPECT_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn zero_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PROSPECT_REQUEST_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PROSPECT_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(PROSPECT_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn zero_progress_tick_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PROSPECT_PROGRESS_TICK_MS", "0");
    assert!(build_app_config(lookup_from_map(&map)).is_err());
}

#[test]
fn progress_ceiling_must_stay_below_100() {
    for bad in ["100", "0", "-5", "abc", "NaN"] {
        let mut map = HashMap::new();
        map.insert("PROSPECT_PROGRESS_CEILING", bad);
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PROSPECT_PROGRESS_CEILING"),
            "ceiling {bad} should be rejected, got: {result:?}"
        );
    }
}

#[test]
fn normalize_keeps_explicit_scheme() {
    assert_eq!(
        normalize_api_base_url("http://api.example.com/"),
        "http://api.example.com"
    );
    assert_eq!(
        normalize_api_base_url("https://api.example.com"),
        "https://api.example.com"
    );
}

#[test]
fn normalize_uses_http_for_loopback_hosts() {
    assert_eq!(
        normalize_api_base_url("localhost:8000"),
        "http://localhost:8000"
    );
    assert_eq!(
        normalize_api_base_url("127.0.0.1:8000/api"),
        "http://127.0.0.1:8000/api"
    );
    assert_eq!(normalize_api_base_url("[::1]:8000"), "http://[::1]:8000");
    assert_eq!(normalize_api_base_url("::1"), "http://::1");
}

#[test]
fn normalize_uses_https_for_remote_hosts() {
    assert_eq!(
        normalize_api_base_url("prospect.example.org"),
        "https://prospect.example.org"
    );
    assert_eq!(
        normalize_api_base_url("localhost.example.org"),
        "https://localhost.example.org"
    );
}
