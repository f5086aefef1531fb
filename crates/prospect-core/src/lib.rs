pub mod app_config;
pub mod config;
pub mod coverage;
pub mod error;
pub mod prospect;
pub mod query;

pub use app_config::AppConfig;
pub use coverage::CoverageStats;
pub use config::{load_app_config, load_app_config_from_env, normalize_api_base_url};
pub use error::{ConfigError, CoreError};
pub use prospect::{Address, Attributes, Category, Contacts, Prospect};
pub use query::{
    build_query, DedupePolicy, DetailLevel, FilterState, GeoPoint, Location, LocationMode,
    MapOverlay, SearchQuery, SortKey,
};
