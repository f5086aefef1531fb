//! Maps a failed search to the kind of failure it represents.
//!
//! The upstream map data service (Overpass) is slow and often overloaded.
//! Its failures surface as 5xx or 504 responses whose detail text mentions
//! the service, a mirror host, or a timeout, in English or French. Those are
//! worth retrying. Anything the server rejects with a 4xx is a problem with
//! the query itself.

use std::fmt;

use crate::error::ClientError;

/// Case-insensitive markers of a transient upstream failure.
const TRANSIENT_MARKERS: &[&str] = &[
    "overpass",
    "overpass-api.de",
    "overpass.kumi.systems",
    "overpass.private.coffee",
    "timeout",
    "timed out",
    "temps écoulé",
    "unavailable",
    "indisponible",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The upstream data source is overloaded or timing out; retry later.
    TransientUpstream,
    /// The request was rejected because of its parameters.
    ClientInput,
    Fatal,
}

impl ErrorKind {
    #[must_use]
    pub fn is_retriable(self) -> bool {
        self == Self::TransientUpstream
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransientUpstream => "transient_upstream",
            Self::ClientInput => "client_input",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a failure from its HTTP status (if any) and message.
///
/// The message is checked first: a 4xx whose detail names the upstream
/// service is still transient.
#[must_use]
pub fn classify(status: Option<u16>, message: &str) -> ErrorKind {
    let lowered = message.to_lowercase();
    if TRANSIENT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return ErrorKind::TransientUpstream;
    }
    match status {
        Some(s) if (400..500).contains(&s) => ErrorKind::ClientInput,
        _ => ErrorKind::Fatal,
    }
}

/// A classified search failure, ready to show and to drive retry decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFailure {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl SearchFailure {
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }
}

impl From<&ClientError> for SearchFailure {
    fn from(err: &ClientError) -> Self {
        let status = err.status();
        let message = err.user_message();
        Self {
            kind: classify(status, &message),
            status,
            message,
        }
    }
}

impl From<ClientError> for SearchFailure {
    fn from(err: ClientError) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
