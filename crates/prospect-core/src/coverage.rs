//! Contact coverage over a result set: how many prospects expose each
//! contact channel. Same shape as the `coverage` block the search API
//! returns, so the two can be compared or substituted.

use serde::{Deserialize, Serialize};

use crate::prospect::Prospect;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub total: u64,
    #[serde(default)]
    pub counts: CoverageCounts,
    #[serde(default)]
    pub percents: CoveragePercents,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageCounts {
    pub has_site: u64,
    pub has_email: u64,
    pub has_phone: u64,
    pub has_whatsapp: u64,
    pub contactable: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoveragePercents {
    pub has_site: f64,
    pub has_email: f64,
    pub has_phone: f64,
    pub has_whatsapp: f64,
    pub contactable: f64,
}

impl CoverageStats {
    #[must_use]
    pub fn from_prospects<'a, I>(prospects: I) -> Self
    where
        I: IntoIterator<Item = &'a Prospect>,
    {
        let mut total = 0u64;
        let mut counts = CoverageCounts::default();

        for prospect in prospects {
            let contacts = &prospect.contacts;
            total += 1;
            counts.has_site += u64::from(
                contacts
                    .website
                    .as_deref()
                    .is_some_and(|w| !w.trim().is_empty()),
            );
            counts.has_email += u64::from(!contacts.emails.is_empty());
            counts.has_phone += u64::from(!contacts.phones.is_empty());
            counts.has_whatsapp += u64::from(!contacts.whatsapp.is_empty());
            counts.contactable += u64::from(prospect.is_contactable());
        }

        let percents = CoveragePercents {
            has_site: percent(counts.has_site, total),
            has_email: percent(counts.has_email, total),
            has_phone: percent(counts.has_phone, total),
            has_whatsapp: percent(counts.has_whatsapp, total),
            contactable: percent(counts.contactable, total),
        };

        Self {
            total,
            counts,
            percents,
        }
    }
}

/// Percentage rounded to one decimal place; `0.0` for an empty set.
fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    // Result counts are capped at a few hundred rows by the API.
    #[allow(clippy::cast_precision_loss)]
    let raw = count as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}
