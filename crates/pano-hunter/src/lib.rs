//! High-level facade crate for the `pano-hunter-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core, search and Street View crates
//! - configuration documents (`io`), result writers (`output`, `report`)
//! - [`run_search`], which ties a resolved document to a lookup client
//!
//! ## Quickstart
//!
//! ```no_run
//! use pano_hunter::io::ConfigDocument;
//! use pano_hunter::streetview::{StreetViewClient, StreetViewOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let search = ConfigDocument::load("syktyvkar.toml")?.resolve()?;
//! let options = StreetViewOptions { source: search.source, ..Default::default() };
//! let client = StreetViewClient::with_options("API_KEY", options)?;
//!
//! let report = pano_hunter::run_search(&search, client)?;
//! pano_hunter::report::write_outputs(&search.output, &report)?;
//! println!("{}", report.stats.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `pano_hunter::core`: bounding boxes, grid sampling, records, presets.
//! - `pano_hunter::search`: the rate-limited deduplicating orchestrator.
//! - `pano_hunter::streetview`: the metadata endpoint client.

pub use pano_hunter_core as core;
pub use pano_hunter_search as search;
pub use pano_hunter_streetview as streetview;

pub use pano_hunter_core::{AreaPreset, BoundingBox, GeoPoint, PanoramaRecord, SearchConfig};
pub use pano_hunter_search::{RunState, SearchOrchestrator, SearchOutcome, SearchStats};

pub mod io;
pub mod output;
pub mod report;

use chrono::Utc;
use pano_hunter_core::{ConfigError, GridPlan, GridSampler};
use pano_hunter_search::{CancelToken, LookupClient};

use crate::io::ResolvedSearch;
use crate::report::SearchReport;

/// Grid size of a resolved search, without touching the network.
pub fn plan(search: &ResolvedSearch) -> Result<GridPlan, ConfigError> {
    let sampler = GridSampler::new(search.bounds, search.config.step_km)?;
    Ok(sampler.plan(search.config.max_points))
}

/// Run `search` against `client` and collect the report.
pub fn run_search<C: LookupClient>(
    search: &ResolvedSearch,
    client: C,
) -> Result<SearchReport, ConfigError> {
    run_search_with_cancel(search, client, CancelToken::new())
}

/// Like [`run_search`], stopping early once `cancel` is triggered.
pub fn run_search_with_cancel<C: LookupClient>(
    search: &ResolvedSearch,
    client: C,
    cancel: CancelToken,
) -> Result<SearchReport, ConfigError> {
    let started_at = Utc::now();
    let orchestrator =
        SearchOrchestrator::new(client, search.config.clone())?.with_cancel_token(cancel);
    let outcome = orchestrator.run(search.bounds)?;
    Ok(SearchReport::new(
        started_at,
        search.bounds,
        search.config.clone(),
        outcome,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ConfigDocument;
    use pano_hunter_core::PanoramaMetadata;
    use pano_hunter_search::{FnLookup, LookupError};

    fn search() -> ResolvedSearch {
        let mut doc = ConfigDocument::new(BoundingBox::new(61.66, 61.69, 50.81, 50.86).expect("box"));
        doc.search_params.delay = 1e-6;
        doc.search_params.max_points = 30;
        doc.resolve().expect("resolve")
    }

    #[test]
    fn plan_reports_truncation() {
        let plan = plan(&search()).expect("plan");
        assert_eq!(plan.limit, 30);
        assert!(plan.total > 30);
    }

    #[test]
    fn run_search_fills_the_report() {
        let search = search();
        let client = FnLookup::new(|at, _| {
            Ok(PanoramaMetadata {
                pano_id: "P1".into(),
                location: GeoPoint::new(at.lat.min(61.67), 50.83),
                capture_date: None,
                copyright: None,
            })
        });
        let report = run_search(&search, client).expect("run");
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.stats.points_probed, 30);
        assert_eq!(report.bounds, search.bounds);
        assert!(report.stats.is_balanced());
    }

    #[test]
    fn cancelled_search_is_aborted() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let client = FnLookup::new(|_, _| Err(LookupError::NotFound));
        let report = run_search_with_cancel(&search(), client, cancel).expect("run");
        assert_eq!(report.state, RunState::Aborted);
        assert_eq!(report.stats.points_probed, 0);
        assert_eq!(report.stats.skipped, 30);
    }
}
