//! Street View Static API metadata client.
//!
//! [`StreetViewClient`] implements [`pano_hunter_search::LookupClient`] over
//! the free metadata endpoint, mapping response statuses onto
//! [`LookupError`](pano_hunter_search::LookupError) kinds so that the search
//! engine can retry, skip or abort.

mod client;
mod error;
mod key_check;
mod response;

pub use client::{ImagerySource, StreetViewClient, StreetViewOptions, DEFAULT_TIMEOUT, METADATA_URL};
pub use error::StreetViewError;
pub use key_check::{probe_api_key, KeyCheck, KeyVerdict, CHECK_LOCATIONS, CHECK_RADIUS_M};
pub use response::{interpret, MetadataResponse, MetadataStatus};
