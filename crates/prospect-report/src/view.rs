//! Filtered and sorted projection of a result set.
//!
//! [`ResultView`] owns the canonical list and never reorders or mutates it;
//! [`ResultView::visible`] derives the rows to show from the current filter
//! and sort settings each time it is called.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use prospect_core::{CoreError, CoverageStats, Prospect};

use crate::collate::{fold, natural_cmp};

/// Column a view can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSortKey {
    Name,
    Address,
    City,
    Postcode,
    Category,
    Email,
    Phone,
    Website,
    Contacts,
    Distance,
    Brand,
    Operator,
    Cuisine,
    Stars,
    Hours,
}

impl ViewSortKey {
    pub const ALL: [Self; 15] = [
        Self::Name,
        Self::Address,
        Self::City,
        Self::Postcode,
        Self::Category,
        Self::Email,
        Self::Phone,
        Self::Website,
        Self::Contacts,
        Self::Distance,
        Self::Brand,
        Self::Operator,
        Self::Cuisine,
        Self::Stars,
        Self::Hours,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::City => "city",
            Self::Postcode => "postcode",
            Self::Category => "category",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Website => "website",
            Self::Contacts => "contacts",
            Self::Distance => "distance",
            Self::Brand => "brand",
            Self::Operator => "operator",
            Self::Cuisine => "cuisine",
            Self::Stars => "stars",
            Self::Hours => "hours",
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Contacts | Self::Distance)
    }

    fn numeric_value(self, p: &Prospect) -> f64 {
        match self {
            Self::Contacts => f64::from(p.contact_method_count),
            Self::Distance => p.distance_km.unwrap_or(0.0),
            _ => 0.0,
        }
    }

    fn text_value(self, p: &Prospect) -> &str {
        let attrs = &p.attributes;
        let value = match self {
            Self::Name => Some(p.name.as_str()),
            Self::Address => Some(p.address.full.as_str()),
            Self::City => p.address.city.as_deref(),
            Self::Postcode => p.address.postcode.as_deref(),
            Self::Category => p.category.label(),
            Self::Email => p.contacts.emails.first().map(String::as_str),
            Self::Phone => p.contacts.phones.first().map(String::as_str),
            Self::Website => p.contacts.website.as_deref(),
            Self::Brand => attrs.brand.as_deref(),
            Self::Operator => attrs.operator.as_deref(),
            Self::Cuisine => attrs.cuisine.as_deref(),
            Self::Stars => attrs.stars.as_deref(),
            Self::Hours => attrs.hours.as_deref(),
            Self::Contacts | Self::Distance => None,
        };
        value.unwrap_or("")
    }

    fn compare(self, a: &Prospect, b: &Prospect) -> Ordering {
        if self.is_numeric() {
            self.numeric_value(a).total_cmp(&self.numeric_value(b))
        } else {
            natural_cmp(self.text_value(a), self.text_value(b))
        }
    }
}

impl FromStr for ViewSortKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let alias = match wanted.as_str() {
            "nom" => "name",
            "adresse" => "address",
            "ville" => "city",
            "emails" => "email",
            "phones" | "telephone" | "telephones" => "phone",
            "site" => "website",
            "contact_count" | "contact_method_count" => "contacts",
            "distance_km" => "distance",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == alias)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "sort column",
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for ViewSortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultView {
    rows: Vec<Prospect>,
    text_filter: String,
    category_filter: Option<String>,
    sort_key: Option<ViewSortKey>,
    sort_dir: SortDirection,
}

impl ResultView {
    #[must_use]
    pub fn new(rows: Vec<Prospect>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// The canonical list, in server order.
    #[must_use]
    pub fn rows(&self) -> &[Prospect] {
        &self.rows
    }

    #[must_use]
    pub fn text_filter(&self) -> &str {
        &self.text_filter
    }

    pub fn set_text_filter(&mut self, filter: impl Into<String>) {
        self.text_filter = filter.into();
    }

    #[must_use]
    pub fn category_filter(&self) -> Option<&str> {
        self.category_filter.as_deref()
    }

    /// `None` or a blank string clears the filter.
    pub fn set_category_filter(&mut self, category: Option<String>) {
        self.category_filter = category
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());
    }

    #[must_use]
    pub fn sort(&self) -> (Option<ViewSortKey>, SortDirection) {
        (self.sort_key, self.sort_dir)
    }

    pub fn set_sort(&mut self, key: Option<ViewSortKey>, dir: SortDirection) {
        self.sort_key = key;
        self.sort_dir = dir;
    }

    /// Clicking a column header: the same key flips direction, a new key
    /// starts ascending.
    pub fn toggle_sort(&mut self, key: ViewSortKey) {
        if self.sort_key == Some(key) {
            self.sort_dir = self.sort_dir.flipped();
        } else {
            self.sort_key = Some(key);
            self.sort_dir = SortDirection::Asc;
        }
    }

    /// Rows passing the category filter, then the text filter, in sort order.
    #[must_use]
    pub fn visible(&self) -> Vec<&Prospect> {
        let needle = fold(self.text_filter.trim());
        let mut out: Vec<&Prospect> = self
            .rows
            .iter()
            .filter(|p| {
                self.category_filter
                    .as_deref()
                    .is_none_or(|wanted| p.category.matches(wanted))
            })
            .filter(|p| needle.is_empty() || matches_text(p, &needle))
            .collect();

        if let Some(key) = self.sort_key {
            // `sort_by` is stable: ties keep server order.
            out.sort_by(|a, b| {
                let ord = key.compare(a, b);
                match self.sort_dir {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        out
    }

    /// Distinct category labels for a filter dropdown, naturally ordered.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for label in self.rows.iter().filter_map(|p| p.category.label()) {
            let label = label.trim();
            if !label.is_empty() && !labels.iter().any(|l| l.eq_ignore_ascii_case(label)) {
                labels.push(label.to_owned());
            }
        }
        labels.sort_by(|a, b| natural_cmp(a, b));
        labels
    }

    /// Contact coverage over the visible rows.
    #[must_use]
    pub fn coverage(&self) -> CoverageStats {
        CoverageStats::from_prospects(self.visible())
    }
}

/// `needle` must already be folded.
fn matches_text(p: &Prospect, needle: &str) -> bool {
    let attrs = &p.attributes;
    let fields = [
        Some(p.name.as_str()),
        Some(p.address.full.as_str()),
        p.address.city.as_deref(),
        p.category.value.as_deref(),
        p.category.kind.as_deref(),
        attrs.brand.as_deref(),
        attrs.operator.as_deref(),
        attrs.cuisine.as_deref(),
    ];
    fields
        .into_iter()
        .flatten()
        .chain(p.contacts.emails.iter().map(String::as_str))
        .chain(p.contacts.phones.iter().map(String::as_str))
        .any(|field| fold(field).contains(needle))
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
