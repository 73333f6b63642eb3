use std::sync::Arc;

use pano_hunter_core::{GeoPoint, PanoramaMetadata};

/// Failure modes of a single metadata lookup.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No panorama within the search radius. Not an error for the run.
    #[error("no panorama within the search radius")]
    NotFound,
    /// Network trouble, throttling or a server-side error; worth retrying.
    #[error("transient lookup failure: {0}")]
    Transient(String),
    /// Bad credentials, exhausted quota or a malformed request; aborts the run.
    #[error("fatal lookup failure: {0}")]
    Fatal(String),
}

impl LookupError {
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Transient(_))
    }
}

/// Panorama metadata service: nearest panorama to a point within a radius.
pub trait LookupClient: Send + Sync {
    fn lookup(&self, at: GeoPoint, radius_m: f64) -> Result<PanoramaMetadata, LookupError>;
}

impl<T: LookupClient + ?Sized> LookupClient for &T {
    fn lookup(&self, at: GeoPoint, radius_m: f64) -> Result<PanoramaMetadata, LookupError> {
        (**self).lookup(at, radius_m)
    }
}

impl<T: LookupClient + ?Sized> LookupClient for Box<T> {
    fn lookup(&self, at: GeoPoint, radius_m: f64) -> Result<PanoramaMetadata, LookupError> {
        (**self).lookup(at, radius_m)
    }
}

impl<T: LookupClient + ?Sized> LookupClient for Arc<T> {
    fn lookup(&self, at: GeoPoint, radius_m: f64) -> Result<PanoramaMetadata, LookupError> {
        (**self).lookup(at, radius_m)
    }
}

/// Adapt a closure into a [`LookupClient`].
pub struct FnLookup<F>(pub F);

impl<F> FnLookup<F>
where
    F: Fn(GeoPoint, f64) -> Result<PanoramaMetadata, LookupError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> LookupClient for FnLookup<F>
where
    F: Fn(GeoPoint, f64) -> Result<PanoramaMetadata, LookupError> + Send + Sync,
{
    fn lookup(&self, at: GeoPoint, radius_m: f64) -> Result<PanoramaMetadata, LookupError> {
        (self.0)(at, radius_m)
    }
}
