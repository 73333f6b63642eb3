use std::fmt;
use std::time::Duration;

use log::trace;
use pano_hunter_core::{GeoPoint, PanoramaMetadata};
use pano_hunter_search::{LookupClient, LookupError};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::StreetViewError;
use crate::response::interpret;

pub const METADATA_URL: &str = "https://maps.googleapis.com/maps/api/streetview/metadata";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which panoramas the service may return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagerySource {
    /// Any panorama, indoor ones included.
    #[default]
    Default,
    /// Outdoor panoramas only.
    Outdoor,
}

impl ImagerySource {
    fn as_param(self) -> Option<&'static str> {
        match self {
            ImagerySource::Default => None,
            ImagerySource::Outdoor => Some("outdoor"),
        }
    }
}

/// Transport settings for [`StreetViewClient`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreetViewOptions {
    pub endpoint: String,
    #[serde(with = "timeout_secs")]
    pub timeout: Duration,
    pub source: ImagerySource,
}

impl Default for StreetViewOptions {
    fn default() -> Self {
        Self {
            endpoint: METADATA_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            source: ImagerySource::Default,
        }
    }
}

mod timeout_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Blocking client for the Street View Static API metadata endpoint.
///
/// Metadata requests are not billed but count against the key's quota.
pub struct StreetViewClient {
    http: Client,
    endpoint: Url,
    api_key: String,
    source: ImagerySource,
}

impl StreetViewClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, StreetViewError> {
        Self::with_options(api_key, StreetViewOptions::default())
    }

    pub fn with_options(
        api_key: impl Into<String>,
        options: StreetViewOptions,
    ) -> Result<Self, StreetViewError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(StreetViewError::EmptyApiKey);
        }
        if options.timeout.is_zero() {
            return Err(StreetViewError::ZeroTimeout);
        }
        let endpoint = parse_endpoint(&options.endpoint)?;
        let http = Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("pano-hunter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            api_key,
            source: options.source,
        })
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[inline]
    pub fn source(&self) -> ImagerySource {
        self.source
    }

    fn query(&self, at: GeoPoint, radius_m: f64) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("location", at.to_string()),
            ("radius", format!("{radius_m:.0}")),
            ("key", self.api_key.clone()),
        ];
        if let Some(source) = self.source.as_param() {
            query.push(("source", source.to_string()));
        }
        query
    }
}

impl fmt::Debug for StreetViewClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreetViewClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

fn parse_endpoint(url: &str) -> Result<Url, StreetViewError> {
    let invalid = |reason: String| StreetViewError::InvalidEndpoint {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

/// Network errors never carry the request URL, which holds the key.
fn transport_error(err: reqwest::Error) -> LookupError {
    let err = err.without_url();
    if err.is_builder() {
        LookupError::Fatal(err.to_string())
    } else {
        LookupError::Transient(err.to_string())
    }
}

impl LookupClient for StreetViewClient {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip_all, fields(at = %at, radius_m = radius_m))
    )]
    fn lookup(&self, at: GeoPoint, radius_m: f64) -> Result<PanoramaMetadata, LookupError> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&self.query(at, radius_m))
            .send()
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(transport_error)?;
        trace!("metadata {at} r={radius_m:.0}: HTTP {status}, {} bytes", body.len());
        interpret(status, &body)
    }
}
