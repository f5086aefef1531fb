//! Filter state as edited by the user and the canonical [`SearchQuery`]
//! built from it.
//!
//! [`build_query`] is the only validation gate: it returns `None` when no
//! location is available and clamps every numeric field into range instead
//! of rejecting it.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreError};

pub const MIN_RESULT_LIMIT: u32 = 1;
pub const MAX_RESULT_LIMIT: u32 = 200;
pub const MAX_RADIUS_KM: f64 = 100.0;

/// Amount the minimum radius is pulled below the maximum when the two collide.
pub const RADIUS_EPSILON_KM: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}

/// Which location input the form is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    #[default]
    Place,
    Point,
}

/// Server-side ordering requested from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Contacts,
    Distance,
    Name,
    Random,
}

impl SortKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Contacts => "contacts",
            SortKey::Distance => "distance",
            SortKey::Name => "name",
            SortKey::Random => "random",
        }
    }
}

impl FromStr for SortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contacts" => Ok(SortKey::Contacts),
            "distance" => Ok(SortKey::Distance),
            "name" => Ok(SortKey::Name),
            "random" => Ok(SortKey::Random),
            _ => Err(CoreError::UnknownVariant {
                kind: "sort key",
                value: s.to_owned(),
            }),
        }
    }
}

/// Server-side deduplication policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupePolicy {
    None,
    Strict,
    #[default]
    Smart,
}

impl DedupePolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DedupePolicy::None => "none",
            DedupePolicy::Strict => "strict",
            DedupePolicy::Smart => "smart",
        }
    }
}

impl FromStr for DedupePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(DedupePolicy::None),
            "strict" => Ok(DedupePolicy::Strict),
            "smart" => Ok(DedupePolicy::Smart),
            _ => Err(CoreError::UnknownVariant {
                kind: "dedupe policy",
                value: s.to_owned(),
            }),
        }
    }
}

/// Shape of the records the API returns: every field, or a flattened subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    #[default]
    Full,
    Light,
}

impl DetailLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Full => "full",
            DetailLevel::Light => "light",
        }
    }
}

impl FromStr for DetailLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(DetailLevel::Full),
            "light" => Ok(DetailLevel::Light),
            _ => Err(CoreError::UnknownVariant {
                kind: "detail level",
                value: s.to_owned(),
            }),
        }
    }
}

/// Raw form state. Text lists are kept exactly as typed (comma-separated)
/// and numbers as wide signed integers so out-of-range input survives until
/// [`build_query`] clamps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub mode: LocationMode,
    pub place: String,
    pub point: Option<GeoPoint>,
    pub radius_enabled: bool,
    pub radius_max_km: f64,
    pub radius_min_km: f64,
    pub tags: String,
    pub category: String,
    pub result_limit: i64,
    pub enrich_limit: i64,
    pub required_fields: String,
    pub min_contacts: i64,
    pub exclude_names: String,
    pub exclude_brands: String,
    pub sort: SortKey,
    pub dedupe: DedupePolicy,
    pub detail: DetailLevel,
    pub include_coverage: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            mode: LocationMode::Place,
            place: String::new(),
            point: None,
            radius_enabled: true,
            radius_max_km: 5.0,
            radius_min_km: 0.0,
            tags: String::new(),
            category: String::new(),
            result_limit: 20,
            enrich_limit: 10,
            required_fields: String::new(),
            min_contacts: 0,
            exclude_names: String::new(),
            exclude_brands: String::new(),
            sort: SortKey::Contacts,
            dedupe: DedupePolicy::Smart,
            detail: DetailLevel::Full,
            include_coverage: true,
        }
    }
}

/// Center and radii handed back to the map widget for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapOverlay {
    pub center: GeoPoint,
    pub radius_max_km: f64,
    pub radius_min_km: f64,
}

impl FilterState {
    /// Loads a filter state from a YAML preset. Missing keys keep their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PresetIo`] if the file cannot be read and
    /// [`ConfigError::PresetParse`] if it is not a valid preset.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::PresetIo {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::PresetParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Map click: remember the point and switch the form to point mode.
    pub fn select_point(&mut self, lat: f64, lon: f64) {
        self.point = Some(GeoPoint { lat, lon });
        self.mode = LocationMode::Point;
    }

    pub fn clear_point(&mut self) {
        self.point = None;
    }

    /// Back to the form's initial values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// What the map widget should draw for the selected point, if any.
    #[must_use]
    pub fn map_overlay(&self) -> Option<MapOverlay> {
        let center = self.point.and_then(clamp_point)?;
        let (radius_max_km, radius_min_km) = self.effective_radii();
        Some(MapOverlay {
            center,
            radius_max_km,
            radius_min_km,
        })
    }

    fn effective_radii(&self) -> (f64, f64) {
        if self.radius_enabled {
            normalize_radii(self.radius_max_km, self.radius_min_km)
        } else {
            (0.0, 0.0)
        }
    }
}

/// The place or point a search is centred on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Place(String),
    Point(GeoPoint),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Place(place) => f.write_str(place),
            Location::Point(point) => point.fmt(f),
        }
    }
}

/// Canonical, validated search intent. Only [`build_query`] constructs it,
/// so every value satisfies the range invariants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    location: Location,
    radius_max_km: f64,
    radius_min_km: f64,
    osm_tags: BTreeSet<String>,
    category: Option<String>,
    result_limit: u32,
    enrich_limit: u32,
    required_contact_fields: BTreeSet<String>,
    min_contact_count: u32,
    excluded_name_substrings: BTreeSet<String>,
    excluded_brands: BTreeSet<String>,
    sort_key: SortKey,
    dedupe_policy: DedupePolicy,
    detail_level: DetailLevel,
    include_coverage_stats: bool,
}

/// Builds the canonical query for the current form state.
///
/// Returns `None` when neither a non-blank place nor a point is available.
/// The active [`LocationMode`] wins when both are present; otherwise
/// whichever input exists is used.
#[must_use]
pub fn build_query(state: &FilterState) -> Option<SearchQuery> {
    let location = resolve_location(state)?;
    let (radius_max_km, radius_min_km) = state.effective_radii();

    Some(SearchQuery {
        location,
        radius_max_km,
        radius_min_km,
        osm_tags: split_list(&state.tags),
        category: non_blank(&state.category).map(str::to_owned),
        result_limit: clamp_count(state.result_limit, MIN_RESULT_LIMIT, MAX_RESULT_LIMIT),
        enrich_limit: clamp_count(state.enrich_limit, 0, u32::MAX),
        required_contact_fields: split_list(&state.required_fields.to_lowercase()),
        min_contact_count: clamp_count(state.min_contacts, 0, u32::MAX),
        excluded_name_substrings: split_list(&state.exclude_names),
        excluded_brands: split_list(&state.exclude_brands),
        sort_key: state.sort,
        dedupe_policy: state.dedupe,
        detail_level: state.detail,
        include_coverage_stats: state.include_coverage,
    })
}

impl SearchQuery {
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn radius_max_km(&self) -> f64 {
        self.radius_max_km
    }

    #[must_use]
    pub fn radius_min_km(&self) -> f64 {
        self.radius_min_km
    }

    #[must_use]
    pub fn osm_tags(&self) -> &BTreeSet<String> {
        &self.osm_tags
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn result_limit(&self) -> u32 {
        self.result_limit
    }

    #[must_use]
    pub fn enrich_limit(&self) -> u32 {
        self.enrich_limit
    }

    #[must_use]
    pub fn required_contact_fields(&self) -> &BTreeSet<String> {
        &self.required_contact_fields
    }

    #[must_use]
    pub fn min_contact_count(&self) -> u32 {
        self.min_contact_count
    }

    #[must_use]
    pub fn excluded_name_substrings(&self) -> &BTreeSet<String> {
        &self.excluded_name_substrings
    }

    #[must_use]
    pub fn excluded_brands(&self) -> &BTreeSet<String> {
        &self.excluded_brands
    }

    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    #[must_use]
    pub fn dedupe_policy(&self) -> DedupePolicy {
        self.dedupe_policy
    }

    #[must_use]
    pub fn detail_level(&self) -> DetailLevel {
        self.detail_level
    }

    #[must_use]
    pub fn include_coverage_stats(&self) -> bool {
        self.include_coverage_stats
    }

    /// Query-string pairs for `GET /prospects`, in the order the API
    /// documents them. Optional filters are omitted when empty and radii
    /// when zero.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(17);

        match &self.location {
            Location::Place(place) => pairs.push(("where", place.clone())),
            Location::Point(point) => {
                pairs.push(("lat", point.lat.to_string()));
                pairs.push(("lon", point.lon.to_string()));
            }
        }

        if self.radius_max_km > 0.0 {
            pairs.push(("radius_km", self.radius_max_km.to_string()));
        }
        if self.radius_min_km > 0.0 {
            pairs.push(("radius_min_km", self.radius_min_km.to_string()));
        }
        if !self.osm_tags.is_empty() {
            pairs.push(("tags", join(&self.osm_tags)));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }

        pairs.push(("number", self.result_limit.to_string()));
        pairs.push(("enrich_max", self.enrich_limit.to_string()));

        if !self.required_contact_fields.is_empty() {
            pairs.push(("has", join(&self.required_contact_fields)));
        }
        pairs.push(("min_contacts", self.min_contact_count.to_string()));
        if !self.excluded_name_substrings.is_empty() {
            pairs.push(("exclude_names", join(&self.excluded_name_substrings)));
        }
        if !self.excluded_brands.is_empty() {
            pairs.push(("exclude_brands", join(&self.excluded_brands)));
        }

        pairs.push(("sort", self.sort_key.as_str().to_owned()));
        pairs.push(("dedupe", self.dedupe_policy.as_str().to_owned()));
        pairs.push(("view", self.detail_level.as_str().to_owned()));
        pairs.push(("include_coverage", self.include_coverage_stats.to_string()));

        pairs
    }

    /// One-line description for report headers and logs, e.g.
    /// `"Paris, category restaurant, radius 2-5 km"`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = self.location.to_string();
        if let Some(category) = &self.category {
            out.push_str(&format!(", category {category}"));
        }
        if !self.osm_tags.is_empty() {
            out.push_str(&format!(", tags {}", join(&self.osm_tags)));
        }
        if self.radius_max_km > 0.0 {
            if self.radius_min_km > 0.0 {
                out.push_str(&format!(
                    ", radius {}-{} km",
                    self.radius_min_km, self.radius_max_km
                ));
            } else {
                out.push_str(&format!(", radius {} km", self.radius_max_km));
            }
        }
        out
    }
}

fn resolve_location(state: &FilterState) -> Option<Location> {
    let place = non_blank(&state.place).map(|p| Location::Place(p.to_owned()));
    let point = state.point.and_then(clamp_point).map(Location::Point);
    match state.mode {
        LocationMode::Place => place.or(point),
        LocationMode::Point => point.or(place),
    }
}

fn clamp_point(point: GeoPoint) -> Option<GeoPoint> {
    if !point.lat.is_finite() || !point.lon.is_finite() {
        return None;
    }
    Some(GeoPoint {
        lat: point.lat.clamp(-90.0, 90.0),
        lon: point.lon.clamp(-180.0, 180.0),
    })
}

fn clamp_km(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, MAX_RADIUS_KM)
    } else {
        0.0
    }
}

/// Clamps both radii and keeps `min < max` whenever `max > 0` by pulling the
/// minimum down to `max - RADIUS_EPSILON_KM`.
pub(crate) fn normalize_radii(max_km: f64, min_km: f64) -> (f64, f64) {
    let max_km = clamp_km(max_km);
    let mut min_km = clamp_km(min_km);
    if max_km > 0.0 && min_km >= max_km {
        min_km = (max_km - RADIUS_EPSILON_KM).max(0.0);
    }
    (max_km, min_km)
}

fn clamp_count(value: i64, min: u32, max: u32) -> u32 {
    let clamped = value.clamp(i64::from(min), i64::from(max));
    u32::try_from(clamped).unwrap_or(min)
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn split_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
