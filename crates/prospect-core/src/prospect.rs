use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::query::GeoPoint;

/// Placeholder shown for a missing name or address.
pub const MISSING_VALUE: &str = "-";

/// A business record returned by the search API, normalized so that every
/// upstream shape reads the same way. Built once per search and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    /// Stable key taken from the source record, or a digest of position and
    /// name when the record carries none.
    pub id: String,
    pub name: String,
    pub address: Address,
    pub category: Category,
    pub position: Option<GeoPoint>,
    pub contacts: Contacts,
    pub attributes: Attributes,
    /// Upstream tag map, passed through untouched.
    pub tags_raw: BTreeMap<String, String>,
    /// Every raw field the normalizer did not map, stringified.
    pub extras: BTreeMap<String, String>,
    pub payment_methods: BTreeMap<String, String>,
    /// Link to the origin record (e.g. an OpenStreetMap URL).
    pub source_ref: Option<String>,
    pub distance_km: Option<f64>,
    /// Derived from [`Contacts::method_count`], never read from upstream.
    pub contact_method_count: u8,
}

impl Prospect {
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            MISSING_VALUE
        } else {
            &self.name
        }
    }

    #[must_use]
    pub fn is_contactable(&self) -> bool {
        self.contact_method_count > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub house_number: Option<String>,
    pub street: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
    /// Comma-joined components, the upstream full address, or `"-"`.
    pub full: String,
}

impl Address {
    /// Joins the present components with `", "`, falling back to
    /// `raw_full` and then to `"-"`.
    #[must_use]
    pub fn compose(
        house_number: Option<String>,
        street: Option<String>,
        postcode: Option<String>,
        city: Option<String>,
        raw_full: Option<String>,
    ) -> Self {
        let parts: Vec<&str> = [&house_number, &street, &postcode, &city]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        let full = if parts.is_empty() {
            raw_full
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| MISSING_VALUE.to_owned())
        } else {
            parts.join(", ")
        };

        Self {
            house_number,
            street,
            postcode,
            city,
            full,
        }
    }
}

/// Activity classification, e.g. `kind = "amenity"`, `value = "restaurant"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub kind: Option<String>,
    pub value: Option<String>,
}

impl Category {
    /// The most specific label available.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.value.as_deref().or(self.kind.as_deref())
    }

    /// Case-insensitive match against either the value or the kind.
    #[must_use]
    pub fn matches(&self, wanted: &str) -> bool {
        [&self.value, &self.kind]
            .into_iter()
            .flatten()
            .any(|s| s.trim().eq_ignore_ascii_case(wanted.trim()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contacts {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub whatsapp: Vec<String>,
    pub website: Option<String>,
}

impl Contacts {
    /// Number of contact channels present: emails, phones, website, WhatsApp.
    #[must_use]
    pub fn method_count(&self) -> u8 {
        let website = self
            .website
            .as_deref()
            .is_some_and(|w| !w.trim().is_empty());
        [
            !self.emails.is_empty(),
            !self.phones.is_empty(),
            website,
            !self.whatsapp.is_empty(),
        ]
        .into_iter()
        .map(u8::from)
        .sum()
    }

    /// First email, else first phone, else first WhatsApp number, else the
    /// website.
    #[must_use]
    pub fn primary(&self) -> Option<&str> {
        self.emails
            .first()
            .or_else(|| self.phones.first())
            .or_else(|| self.whatsapp.first())
            .map(String::as_str)
            .or(self.website.as_deref().filter(|w| !w.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub hours: Option<String>,
    pub cuisine: Option<String>,
    pub stars: Option<String>,
    pub operator: Option<String>,
    pub brand: Option<String>,
}
