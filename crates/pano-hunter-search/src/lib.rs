//! Grid search engine for panorama discovery.
//!
//! Turns a bounding box and a [`SearchConfig`] into a deduplicated set of
//! [`PanoramaRecord`]s by probing a [`LookupClient`] through a shared
//! [`RateLimiter`].
//!
//! ```no_run
//! use pano_hunter_search::{BoundingBox, FnLookup, LookupError, SearchConfig, SearchOrchestrator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FnLookup::new(|_at, _radius| Err(LookupError::NotFound));
//! let orchestrator = SearchOrchestrator::new(client, SearchConfig::default())?;
//! let outcome = orchestrator.run(BoundingBox::new(61.66, 61.69, 50.81, 50.86)?)?;
//! println!("{}", outcome.summary());
//! # Ok(())
//! # }
//! ```

mod cancel;
mod dedup;
mod lookup;
mod orchestrator;
mod rate;
mod stats;

pub use cancel::CancelToken;
pub use dedup::{Deduplicator, OfferOutcome};
pub use lookup::{FnLookup, LookupClient, LookupError};
pub use orchestrator::{AbortCause, RunState, SearchOrchestrator, SearchOutcome};
pub use rate::{RatePermit, RateLimiter};
pub use stats::{RecordSummary, RunSummary, SearchStats, PROGRESS_EVERY};

pub use pano_hunter_core::{
    BoundingBox, GeoPoint, GridPoint, PanoramaMetadata, PanoramaRecord, RetryPolicy, SearchConfig,
};
