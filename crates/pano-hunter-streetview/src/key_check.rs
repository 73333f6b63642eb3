use log::{info, warn};
use pano_hunter_core::GeoPoint;
use pano_hunter_search::{LookupClient, LookupError};

/// Places with long-standing Street View coverage.
pub const CHECK_LOCATIONS: [(&str, GeoPoint); 3] = [
    ("Moscow, Red Square", GeoPoint::new(55.7558, 37.6173)),
    ("New York", GeoPoint::new(40.7128, -74.0060)),
    ("Paris", GeoPoint::new(48.8566, 2.3522)),
];

pub const CHECK_RADIUS_M: f64 = 100.0;

/// What the service said about a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyVerdict {
    /// A panorama was returned.
    Valid,
    /// The service answered but none of the locations had coverage.
    NoCoverage,
    /// The key was refused or the quota is exhausted.
    Rejected(String),
    /// Every request failed in transit.
    Unreachable(String),
}

impl KeyVerdict {
    /// `true` when a search with this key can be expected to work.
    pub fn is_usable(&self) -> bool {
        matches!(self, KeyVerdict::Valid | KeyVerdict::NoCoverage)
    }
}

/// Per-location results of [`probe_api_key`].
#[derive(Clone, Debug)]
pub struct KeyCheck {
    pub verdict: KeyVerdict,
    pub attempts: Vec<(&'static str, Result<String, LookupError>)>,
}

/// Try the check locations in order until one gives a definite answer.
pub fn probe_api_key<C: LookupClient + ?Sized>(client: &C) -> KeyCheck {
    let mut attempts = Vec::with_capacity(CHECK_LOCATIONS.len());
    let mut answered = false;
    let mut last_transient = String::new();

    for (name, at) in CHECK_LOCATIONS {
        let result = client.lookup(at, CHECK_RADIUS_M);
        let verdict = match &result {
            Ok(meta) => {
                info!("{name}: panorama {}", meta.pano_id);
                Some(KeyVerdict::Valid)
            }
            Err(LookupError::NotFound) => {
                info!("{name}: no panorama, but the API answered");
                answered = true;
                None
            }
            Err(LookupError::Fatal(reason)) => {
                warn!("{name}: {reason}");
                Some(KeyVerdict::Rejected(reason.clone()))
            }
            Err(LookupError::Transient(reason)) => {
                warn!("{name}: {reason}");
                last_transient.clone_from(reason);
                None
            }
        };
        attempts.push((name, result.map(|meta| meta.pano_id)));
        if let Some(verdict) = verdict {
            return KeyCheck { verdict, attempts };
        }
    }

    let verdict = if answered {
        KeyVerdict::NoCoverage
    } else {
        KeyVerdict::Unreachable(last_transient)
    };
    KeyCheck { verdict, attempts }
}
