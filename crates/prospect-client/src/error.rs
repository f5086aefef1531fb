use thiserror::Error;

/// Errors returned by the prospect search API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status. `detail` is the server's own
    /// message, or a status-derived fallback when the body carried none.
    #[error("{detail}")]
    Api { status: u16, detail: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl ClientError {
    /// HTTP status attached to the failure, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Deserialize { .. } | Self::InvalidBaseUrl { .. } => None,
        }
    }

    /// Message suitable for display to the user.
    ///
    /// Timeouts always mention "timed out" so that they classify as
    /// transient regardless of how `reqwest` words the underlying error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { detail, .. } => detail.clone(),
            Self::Http(e) if e.is_timeout() => format!("request timed out: {e}"),
            Self::Http(e) if e.is_connect() => format!("could not reach the search API: {e}"),
            other => other.to_string(),
        }
    }
}
