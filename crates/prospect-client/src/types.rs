//! Search API response types.
//!
//! Only `results` is required. Everything else the API may add is either
//! modelled as optional or kept as raw JSON in [`SearchResponse::other`].

use prospect_core::CoverageStats;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Body of a successful `GET /prospects` call.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    /// Raw records, one per business, in the server's order.
    pub results: Vec<Value>,
    #[serde(default)]
    pub count: Option<u64>,
    /// Echo of the query as the server understood it.
    #[serde(default)]
    pub query: Option<Value>,
    #[serde(default)]
    pub timings: Option<Timings>,
    #[serde(default)]
    pub coverage: Option<Value>,
    #[serde(default)]
    pub enrich_max: Option<u64>,
    /// Remaining top-level keys (`requested`, `postprocess`, ...).
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl SearchResponse {
    /// The server-side coverage block, if present and well-formed.
    #[must_use]
    pub fn coverage_stats(&self) -> Option<CoverageStats> {
        self.coverage
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Timings {
    #[serde(default)]
    pub total_seconds: Option<f64>,
    #[serde(default)]
    pub enrichment: Option<EnrichmentTiming>,
}

/// Website-scraping enrichment pass run by the server after the map query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnrichmentTiming {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub enriched_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_body_parses() {
        let resp: SearchResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(resp.results.is_empty());
        assert!(resp.count.is_none());
        assert!(resp.timings.is_none());
        assert!(resp.coverage_stats().is_none());
    }

    #[test]
    fn full_body_keeps_unknown_keys() {
        let resp: SearchResponse = serde_json::from_value(serde_json::json!({
            "count": 1,
            "results": [{"nom": "A"}],
            "query": {"where": "Paris"},
            "timings": {"total_seconds": 3.5, "enrichment": {"enabled": true, "enriched_count": 1}},
            "enrich_max": 10,
            "requested": 20,
            "postprocess": {"dedupe": "smart"}
        }))
        .unwrap();
        assert_eq!(resp.count, Some(1));
        let timings = resp.timings.unwrap();
        assert_eq!(timings.enrichment.unwrap().enriched_count, 1);
        assert!(resp.other.contains_key("requested"));
        assert!(resp.other.contains_key("postprocess"));
    }

    #[test]
    fn malformed_coverage_is_ignored() {
        let resp: SearchResponse =
            serde_json::from_str(r#"{"results": [], "coverage": "n/a"}"#).unwrap();
        assert!(resp.coverage.is_some());
        assert!(resp.coverage_stats().is_none());
    }

    #[test]
    fn missing_results_is_an_error() {
        assert!(serde_json::from_str::<SearchResponse>(r#"{"count": 0}"#).is_err());
    }
}
