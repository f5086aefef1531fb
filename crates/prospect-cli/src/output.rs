//! Terminal rendering. Results go to stdout; progress and summaries to
//! stderr so stdout can be piped.

use indicatif::{ProgressBar, ProgressStyle};
use prospect_client::{SearchResults, SessionSnapshot, SessionStatus};
use prospect_core::{AppConfig, CoverageStats, Prospect};

const TABLE_COLUMNS: [(&str, usize); 6] = [
    ("Name", 28),
    ("Category", 14),
    ("City", 16),
    ("#", 2),
    ("km", 6),
    ("Contact", 32),
];

pub fn print_config(config: &AppConfig) {
    println!("api_url               {}", config.api_url);
    println!("log_level             {}", config.log_level);
    println!("request_timeout_secs  {}", config.request_timeout_secs);
    println!("user_agent            {}", config.user_agent);
    println!("max_retries           {}", config.max_retries);
    println!("retry_base_delay_ms   {}", config.retry_base_delay_ms);
    println!("progress_tick_ms      {}", config.progress_tick_ms);
    println!("progress_ceiling_pct  {}", config.progress_ceiling_pct);
    println!("progress_hold_ms      {}", config.progress_hold_ms);
}

pub fn print_table(rows: &[&Prospect]) {
    let header: Vec<String> = TABLE_COLUMNS
        .iter()
        .map(|(title, width)| cell(title, *width))
        .collect();
    println!("{}", header.join(" "));
    for p in rows {
        println!("{}", table_row(p));
    }
}

pub(crate) fn table_row(p: &Prospect) -> String {
    let values = [
        p.display_name().to_owned(),
        p.category.label().unwrap_or("-").to_owned(),
        p.address.city.clone().unwrap_or_else(|| "-".to_owned()),
        p.contact_method_count.to_string(),
        p.distance_km.map_or_else(|| "-".to_owned(), |d| format!("{d:.2}")),
        p.contacts.primary().unwrap_or("-").to_owned(),
    ];
    TABLE_COLUMNS
        .iter()
        .zip(values)
        .map(|((_, width), value)| cell(&value, *width))
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_owned()
}

pub fn print_summary(results: &SearchResults, shown: usize) {
    let total = results.prospects.len();
    let mut parts = vec![format!(
        "{total} results ({shown} shown) in {:.1} s",
        results.elapsed_secs()
    )];
    if let Some(enriched) = results.enriched_count() {
        parts.push(format!("{enriched} enriched"));
    }
    if results.retries > 0 {
        parts.push(format!("{} retries", results.retries));
    }
    eprintln!("{}", parts.join(", "));
}

pub fn print_coverage(coverage: &CoverageStats) {
    if coverage.total == 0 {
        return;
    }
    let c = &coverage.counts;
    let p = &coverage.percents;
    eprintln!(
        "coverage: website {} ({:.1}%), email {} ({:.1}%), phone {} ({:.1}%), whatsapp {} ({:.1}%), contactable {} ({:.1}%)",
        c.has_site, p.has_site,
        c.has_email, p.has_email,
        c.has_phone, p.has_phone,
        c.has_whatsapp, p.has_whatsapp,
        c.contactable, p.contactable,
    );
}

fn progress_message(snapshot: &SessionSnapshot) -> String {
    match snapshot.status {
        SessionStatus::Retrying => {
            format!("upstream busy, retry {} scheduled", snapshot.attempt)
        }
        status => status.to_string(),
    }
}

/// Session progress as an `indicatif` bar on stderr, scaled 0-100.
pub struct SearchProgress {
    bar: ProgressBar,
}

impl SearchProgress {
    /// A drawn bar, or a hidden one that still tracks state.
    pub fn new(visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(100)
        } else {
            ProgressBar::hidden()
        };
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {bar:40.cyan/blue} {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉ ");
        bar.set_style(style);
        bar.set_length(100);
        Self { bar }
    }

    pub fn update(&self, snapshot: &SessionSnapshot) {
        self.bar.set_position(percent_position(snapshot.progress_pct));
        self.bar.set_message(progress_message(snapshot));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_position(pct: f64) -> u64 {
    if pct.is_finite() {
        pct.round().clamp(0.0, 100.0) as u64
    } else {
        0
    }
}

/// Pads or truncates to exactly `width` characters.
fn cell(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len > width {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        format!("{text:<width$}")
    }
}
