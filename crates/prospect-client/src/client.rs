//! HTTP client for the prospect search API.
//!
//! One endpoint: `GET {base}/prospects?{query}`. Non-2xx responses are turned
//! into [`ClientError::Api`] carrying the server's `detail` text so the
//! classifier can decide whether to retry.

use std::time::Duration;

use prospect_core::{AppConfig, SearchQuery};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use crate::error::ClientError;
use crate::types::SearchResponse;

/// Fallback message when a failure response has no parseable body.
pub const UNKNOWN_ERROR: &str = "Erreur inconnue";

/// Client for the prospect search API.
///
/// Use [`ProspectClient::from_config`] in the binary or
/// [`ProspectClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct ProspectClient {
    client: Client,
    base_url: Url,
}

impl ProspectClient {
    /// # Errors
    ///
    /// See [`ProspectClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Self::with_base_url(
            &config.api_url,
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` is not an absolute http(s) URL.
    pub fn with_base_url(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash, so `prospects` is appended as a new
        // path segment instead of replacing the last one.
        let normalised = format!("{}/", base_url.trim().trim_end_matches('/'));
        let invalid = |reason: String| ClientError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason,
        };
        let parsed = Url::parse(&normalised).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
        }
        if parsed.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_owned()));
        }

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full request URL for `query`, with every parameter percent-encoded.
    #[must_use]
    pub fn prospects_url(&self, query: &SearchQuery) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("prospects");
        }
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.query_pairs() {
                pairs.append_pair(key, &value);
            }
        }
        url
    }

    /// Runs one search request. No retry happens here; that is the
    /// session's job.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] on network failure or timeout.
    /// - [`ClientError::Api`] on a non-2xx status.
    /// - [`ClientError::Deserialize`] if a 2xx body is not a search response.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, ClientError> {
        let url = self.prospects_url(query);
        tracing::debug!(url = %url, "requesting prospects");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                detail: extract_detail(status, &body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: format!("search({})", query.summary()),
            source: e,
        })
    }
}

/// Pulls the server's `detail` message out of a failure body.
fn extract_detail(status: StatusCode, body: &str) -> String {
    let fallback = || format!("HTTP error {}", status.as_u16());
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return UNKNOWN_ERROR.to_owned();
    };
    match json.get("detail") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        None | Some(Value::Null | Value::String(_)) => fallback(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospect_core::{build_query, FilterState};

    fn test_client(base_url: &str) -> ProspectClient {
        ProspectClient::with_base_url(base_url, 30, "test-agent")
            .expect("client construction should not fail")
    }

    fn paris() -> SearchQuery {
        build_query(&FilterState {
            place: "Paris".to_owned(),
            ..FilterState::default()
        })
        .unwrap()
    }

    #[test]
    fn prospects_url_appends_path_and_query() {
        let client = test_client("https://api.example.com");
        let url = client.prospects_url(&paris());
        assert_eq!(url.path(), "/prospects");
        assert!(url.query().unwrap().starts_with("where=Paris&radius_km=5"));
    }

    #[test]
    fn prospects_url_keeps_base_path_prefix() {
        let client = test_client("http://localhost:8000/api/");
        let url = client.prospects_url(&paris());
        assert_eq!(url.path(), "/api/prospects");
    }

    #[test]
    fn prospects_url_percent_encodes_values() {
        let client = test_client("https://api.example.com");
        let query = build_query(&FilterState {
            place: "Saint-Étienne & co".to_owned(),
            ..FilterState::default()
        })
        .unwrap();
        let url = client.prospects_url(&query);
        let (_, value) = url.query_pairs().find(|(k, _)| k == "where").unwrap();
        assert_eq!(value, "Saint-Étienne & co");
        assert!(!url.query().unwrap().contains(" & "));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = ProspectClient::with_base_url("ftp://example.com", 30, "ua").unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl { .. }));
        let err = ProspectClient::with_base_url("not a url", 30, "ua").unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn detail_string_is_used_verbatim() {
        let detail = extract_detail(StatusCode::BAD_REQUEST, r#"{"detail": "Lieu introuvable"}"#);
        assert_eq!(detail, "Lieu introuvable");
    }

    #[test]
    fn missing_or_blank_detail_falls_back_to_status() {
        assert_eq!(
            extract_detail(StatusCode::BAD_GATEWAY, r#"{"error": "x"}"#),
            "HTTP error 502"
        );
        assert_eq!(
            extract_detail(StatusCode::BAD_GATEWAY, r#"{"detail": ""}"#),
            "HTTP error 502"
        );
        assert_eq!(extract_detail(StatusCode::BAD_GATEWAY, "[1, 2]"), "HTTP error 502");
    }

    #[test]
    fn structured_detail_is_rendered_as_json() {
        let detail = extract_detail(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"loc": ["query", "number"], "msg": "too large"}]}"#,
        );
        assert_eq!(detail, r#"[{"loc":["query","number"],"msg":"too large"}]"#);
    }

    #[test]
    fn empty_or_invalid_body_is_unknown_error() {
        assert_eq!(extract_detail(StatusCode::INTERNAL_SERVER_ERROR, ""), UNKNOWN_ERROR);
        assert_eq!(
            extract_detail(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>"),
            UNKNOWN_ERROR
        );
    }
}
