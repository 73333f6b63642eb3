//! Metadata endpoint responses and their mapping onto [`LookupError`].

use std::fmt;

use log::debug;
use pano_hunter_core::{CaptureDate, GeoPoint, PanoramaMetadata};
use pano_hunter_search::LookupError;
use serde::Deserialize;

/// `status` field of a metadata response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataStatus {
    Ok,
    ZeroResults,
    NotFound,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
    Other(String),
}

impl MetadataStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "OK" => Self::Ok,
            "ZERO_RESULTS" => Self::ZeroResults,
            "NOT_FOUND" => Self::NotFound,
            "OVER_QUERY_LIMIT" => Self::OverQueryLimit,
            "REQUEST_DENIED" => Self::RequestDenied,
            "INVALID_REQUEST" => Self::InvalidRequest,
            "UNKNOWN_ERROR" => Self::UnknownError,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::NotFound => "NOT_FOUND",
            Self::OverQueryLimit => "OVER_QUERY_LIMIT",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for MetadataStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Raw JSON body of the metadata endpoint.
#[derive(Debug, Deserialize)]
pub struct MetadataResponse {
    pub status: String,
    #[serde(default)]
    pub pano_id: Option<String>,
    #[serde(default)]
    location: Option<LatLng>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl MetadataResponse {
    pub fn status(&self) -> MetadataStatus {
        MetadataStatus::parse(&self.status)
    }

    pub fn location(&self) -> Option<GeoPoint> {
        self.location.as_ref().map(|l| GeoPoint::new(l.lat, l.lng))
    }

    fn describe(&self) -> String {
        match &self.error_message {
            Some(msg) => format!("{}: {msg}", self.status),
            None => self.status.clone(),
        }
    }

    /// Map the decoded body to a lookup result.
    pub fn into_result(self) -> Result<PanoramaMetadata, LookupError> {
        match self.status() {
            MetadataStatus::Ok => {}
            MetadataStatus::ZeroResults | MetadataStatus::NotFound => {
                return Err(LookupError::NotFound)
            }
            MetadataStatus::UnknownError => return Err(LookupError::Transient(self.describe())),
            MetadataStatus::OverQueryLimit => {
                return Err(LookupError::Fatal(format!(
                    "{} (daily quota exhausted; wait or raise the quota)",
                    self.describe()
                )))
            }
            MetadataStatus::RequestDenied
            | MetadataStatus::InvalidRequest
            | MetadataStatus::Other(_) => return Err(LookupError::Fatal(self.describe())),
        }

        let location = self.location();
        let (Some(pano_id), Some(location)) = (self.pano_id, location) else {
            return Err(LookupError::Fatal(
                "OK response without pano_id or location".to_string(),
            ));
        };
        let capture_date = self.date.as_deref().and_then(|d| match d.parse::<CaptureDate>() {
            Ok(date) => Some(date),
            Err(err) => {
                debug!("{pano_id}: {err}");
                None
            }
        });

        Ok(PanoramaMetadata {
            pano_id,
            location,
            capture_date,
            copyright: self.copyright.filter(|c| !c.is_empty()),
        })
    }
}

/// Interpret an HTTP status code and body from the metadata endpoint.
pub fn interpret(http_status: u16, body: &str) -> Result<PanoramaMetadata, LookupError> {
    match http_status {
        401 | 403 => {
            return Err(LookupError::Fatal(format!(
                "HTTP {http_status}: API key rejected"
            )))
        }
        429 => return Err(LookupError::Transient("HTTP 429: throttled".to_string())),
        500..=599 => return Err(LookupError::Transient(format!("HTTP {http_status}"))),
        _ => {}
    }

    match serde_json::from_str::<MetadataResponse>(body) {
        Ok(response) => response.into_result(),
        Err(_) if !(200..300).contains(&http_status) => {
            Err(LookupError::Fatal(format!("HTTP {http_status}")))
        }
        Err(err) => Err(LookupError::Fatal(format!("undecodable metadata response: {err}"))),
    }
}
