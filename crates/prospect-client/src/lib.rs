pub mod classify;
pub mod client;
pub mod controller;
pub mod error;
pub mod normalize;
pub mod progress;
pub mod session;
pub mod types;

pub use classify::{classify, ErrorKind, SearchFailure};
pub use client::ProspectClient;
pub use controller::SearchController;
pub use error::ClientError;
pub use normalize::{normalize, normalize_all, RawRecord};
pub use progress::ProgressEstimator;
pub use session::{
    RetryPolicy, SearchResults, SearchSession, SessionHandle, SessionSettings, SessionSnapshot,
    SessionStatus,
};
pub use types::{EnrichmentTiming, SearchResponse, Timings};
