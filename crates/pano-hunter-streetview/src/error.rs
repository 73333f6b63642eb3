/// Errors raised while building a [`StreetViewClient`](crate::StreetViewClient).
#[derive(thiserror::Error, Debug)]
pub enum StreetViewError {
    #[error("API key is empty")]
    EmptyApiKey,
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("request timeout must be positive")]
    ZeroTimeout,
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}
