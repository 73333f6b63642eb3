//! Core types for Street View panorama discovery.
//!
//! This crate is purely geometric and has no I/O: it validates search areas,
//! lays out the probe grid and defines the records that the search engine
//! produces. Lookups, deduplication and scheduling live in
//! `pano-hunter-search`.

mod config;
mod error;
mod geo;
mod grid;
mod logger;
mod preset;
mod record;

pub use config::{RetryPolicy, SearchConfig};
pub use error::ConfigError;
pub use geo::{km_per_deg_lon, BoundingBox, GeoPoint, KM_PER_DEG_LAT, MAX_SPAN_DEG, M_PER_DEG_LAT};
pub use grid::{generate, GridPlan, GridPoint, GridPoints, GridSampler};
pub use preset::AreaPreset;
pub use record::{CaptureDate, CaptureDateError, PanoramaMetadata, PanoramaRecord};

#[cfg(feature = "tracing")]
pub use logger::{init_tracing, DEFAULT_TRACING_FILTER};

pub use logger::{init_with_level, level_from_verbosity};
