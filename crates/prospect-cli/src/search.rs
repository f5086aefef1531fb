//! `prospect search`: build the query, run a session, show and export.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use prospect_client::{
    ProspectClient, SearchController, SessionHandle, SessionSettings, SessionSnapshot,
    SessionStatus,
};
use prospect_core::{build_query, AppConfig, DedupePolicy, DetailLevel, FilterState, SortKey};
use prospect_report::{
    export, suggested_file_name, ExportFormat, ExportMetadata, ResultView, SortDirection,
    ViewSortKey,
};

use crate::output;

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub filters: FilterArgs,
    #[command(flatten)]
    pub display: ViewArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

/// Search form fields. Each flag overrides the preset, which overrides the
/// defaults.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// YAML file with a saved filter state
    #[arg(long)]
    pub preset: Option<PathBuf>,
    /// Place name or address to search around
    #[arg(long = "where", value_name = "PLACE")]
    pub place: Option<String>,
    /// Latitude of a map point (use with --lon)
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    /// Longitude of a map point (use with --lat)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
    /// Outer search radius in km
    #[arg(long)]
    pub radius_km: Option<f64>,
    /// Inner radius in km; closer results are excluded
    #[arg(long)]
    pub radius_min_km: Option<f64>,
    /// Search the whole place instead of a radius
    #[arg(long)]
    pub no_radius: bool,
    /// Comma-separated OpenStreetMap tags, e.g. amenity=restaurant
    #[arg(long)]
    pub tags: Option<String>,
    /// Business category, e.g. restaurant
    #[arg(long)]
    pub category: Option<String>,
    /// Maximum number of results (1-200)
    #[arg(long)]
    pub number: Option<i64>,
    /// How many results to enrich from their websites
    #[arg(long)]
    pub enrich_max: Option<i64>,
    /// Required contact fields, comma-separated (email, phone, site, whatsapp)
    #[arg(long)]
    pub has: Option<String>,
    /// Minimum number of contact methods
    #[arg(long)]
    pub min_contacts: Option<i64>,
    /// Comma-separated name fragments to exclude
    #[arg(long)]
    pub exclude_names: Option<String>,
    /// Comma-separated brands to exclude
    #[arg(long)]
    pub exclude_brands: Option<String>,
    /// Server-side ordering: contacts, distance, name, random
    #[arg(long)]
    pub sort: Option<SortKey>,
    /// Duplicate handling: none, strict, smart
    #[arg(long)]
    pub dedupe: Option<DedupePolicy>,
    /// Record detail: full or light
    #[arg(long)]
    pub view: Option<DetailLevel>,
    /// Skip the server-side coverage statistics
    #[arg(long)]
    pub no_coverage: bool,
}

impl FilterArgs {
    /// Loads the preset (if any) and applies the flags on top.
    pub fn to_filter_state(&self) -> anyhow::Result<FilterState> {
        let mut state = match &self.preset {
            Some(path) => FilterState::from_yaml_file(path)?,
            None => FilterState::default(),
        };
        self.apply(&mut state);
        Ok(state)
    }

    fn apply(&self, state: &mut FilterState) {
        if let Some(place) = &self.place {
            state.place.clone_from(place);
            state.mode = prospect_core::LocationMode::Place;
        }
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            state.select_point(lat, lon);
        }
        if let Some(km) = self.radius_km {
            state.radius_max_km = km;
            state.radius_enabled = true;
        }
        if let Some(km) = self.radius_min_km {
            state.radius_min_km = km;
        }
        if self.no_radius {
            state.radius_enabled = false;
        }
        let text_fields = [
            (&self.tags, &mut state.tags),
            (&self.category, &mut state.category),
            (&self.has, &mut state.required_fields),
            (&self.exclude_names, &mut state.exclude_names),
            (&self.exclude_brands, &mut state.exclude_brands),
        ];
        for (flag, field) in text_fields {
            if let Some(value) = flag {
                field.clone_from(value);
            }
        }
        if let Some(n) = self.number {
            state.result_limit = n;
        }
        if let Some(n) = self.enrich_max {
            state.enrich_limit = n;
        }
        if let Some(n) = self.min_contacts {
            state.min_contacts = n;
        }
        if let Some(sort) = self.sort {
            state.sort = sort;
        }
        if let Some(dedupe) = self.dedupe {
            state.dedupe = dedupe;
        }
        if let Some(detail) = self.view {
            state.detail = detail;
        }
        if self.no_coverage {
            state.include_coverage = false;
        }
    }
}

/// Client-side filtering and ordering of the printed and exported rows.
#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Keep rows where any of name, address, city, category, email, phone,
    /// brand, operator or cuisine contains this text
    #[arg(long)]
    pub filter: Option<String>,
    /// Keep rows of this category only
    #[arg(long)]
    pub only_category: Option<String>,
    /// Column to order rows by
    #[arg(long)]
    pub order_by: Option<ViewSortKey>,
    /// Descending order
    #[arg(long, requires = "order_by")]
    pub desc: bool,
}

impl ViewArgs {
    pub fn apply(&self, view: &mut ResultView) {
        if let Some(filter) = &self.filter {
            view.set_text_filter(filter.clone());
        }
        view.set_category_filter(self.only_category.clone());
        let dir = if self.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        view.set_sort(self.order_by, dir);
    }
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Write the visible rows to this file, or into this directory with a
    /// dated file name
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
    /// Export format: xlsx, pdf or csv (default: from the file extension,
    /// else xlsx)
    #[arg(long, value_parser = parse_format, requires = "export")]
    pub format: Option<ExportFormat>,
    /// Do not draw the progress line
    #[arg(long)]
    pub no_progress: bool,
}

fn parse_format(raw: &str) -> Result<ExportFormat, String> {
    raw.parse().map_err(|e: prospect_report::ExportError| e.to_string())
}

impl OutputArgs {
    /// Target file and format, if an export was requested.
    pub fn export_target(&self, today: chrono::NaiveDate) -> Option<(PathBuf, ExportFormat)> {
        let path = self.export.as_ref()?;
        let format = self
            .format
            .or_else(|| ExportFormat::from_path(path))
            .unwrap_or(ExportFormat::Xlsx);
        let path = if path.is_dir() {
            path.join(suggested_file_name(format, today))
        } else {
            path.clone()
        };
        Some((path, format))
    }
}

pub async fn run_search(args: SearchArgs, config: &AppConfig) -> anyhow::Result<()> {
    let state = args.filters.to_filter_state()?;
    let Some(query) = build_query(&state) else {
        anyhow::bail!("a place (--where) or a map point (--lat/--lon) is required");
    };

    let client = ProspectClient::from_config(config)?;
    let mut controller = SearchController::new(client, SessionSettings::from_config(config));
    tracing::info!(query = %query.summary(), api = %config.api_url, "starting search");

    let handle = controller.start_search(query.clone()).await;
    let progress = output::SearchProgress::new(!args.output.no_progress);
    let outcome = tokio::select! {
        snapshot = follow(&handle, &progress) => snapshot,
        () = crate::shutdown_signal() => {
            controller.cancel_current().await;
            handle.snapshot()
        }
    };
    progress.finish();

    match outcome.status {
        SessionStatus::Succeeded => {}
        SessionStatus::Cancelled => {
            eprintln!("search cancelled");
            return Ok(());
        }
        status => {
            let message = outcome
                .last_error
                .map_or_else(|| format!("search ended in state {status}"), |f| f.message);
            anyhow::bail!(message);
        }
    }
    let Some(results) = outcome.results else {
        anyhow::bail!("search succeeded without results");
    };

    let mut view = ResultView::new(results.prospects.clone());
    args.display.apply(&mut view);
    let visible = view.visible();

    output::print_table(&visible);
    output::print_summary(&results, visible.len());
    let coverage = results.coverage.clone().unwrap_or_else(|| view.coverage());
    output::print_coverage(&coverage);

    let today = Utc::now().date_naive();
    if let Some((path, format)) = args.output.export_target(today) {
        let metadata = ExportMetadata {
            query_summary: query.summary(),
            result_count: visible.len(),
            elapsed_secs: Some(results.elapsed_secs()),
            enriched_count: results.enriched_count(),
            exported_at: Utc::now(),
            coverage: Some(view.coverage()),
        };
        write_export(&path, &export(&visible, &metadata, format)?)?;
        eprintln!("exported {} rows to {}", visible.len(), path.display());
    }
    Ok(())
}

/// Follows the session until it is terminal, mirroring progress on stderr.
async fn follow(handle: &SessionHandle, progress: &output::SearchProgress) -> SessionSnapshot {
    let mut rx = handle.subscribe();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        progress.update(&snapshot);
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        if rx.changed().await.is_err() {
            return handle.snapshot();
        }
    }
}

fn write_export(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}
