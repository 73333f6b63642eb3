/// Invalid search area or search parameters.
///
/// Every variant is raised before any network activity starts.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a finite number (got {value})")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field}={value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{min_field} ({min}) must be less than {max_field} ({max})")]
    InvertedRange {
        min_field: &'static str,
        max_field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{axis} span of {span:.2}° exceeds the {limit}° limit")]
    SpanTooLarge {
        axis: &'static str,
        span: f64,
        limit: f64,
    },
    #[error("step_km must be > 0 (got {0})")]
    NonPositiveStep(f64),
    #[error("step_km={step_km} yields more grid points than can be indexed")]
    GridTooLarge { step_km: f64 },
    #[error("search_radius_m must be >= 0 (got {0})")]
    NegativeRadius(f64),
    #[error("request_interval_s must be > 0 (got {0})")]
    NonPositiveInterval(f64),
    #[error("{field} must be >= 1")]
    ZeroCount { field: &'static str },
    #[error("unknown preset '{0}' (expected one of: small, medium, large, metropolis)")]
    UnknownPreset(String),
    #[error("invalid coordinate pair '{0}' (expected LAT,LON)")]
    InvalidCoordinate(String),
}
