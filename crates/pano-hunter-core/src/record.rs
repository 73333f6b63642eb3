use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geo::GeoPoint;
use crate::grid::GridPoint;

/// Month-granularity capture date as reported by the metadata service
/// (`"2019-07"`, sometimes only `"2019"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureDate {
    pub year: u16,
    pub month: Option<u8>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid capture date '{0}' (expected YYYY or YYYY-MM)")]
pub struct CaptureDateError(pub String);

impl FromStr for CaptureDate {
    type Err = CaptureDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CaptureDateError(s.to_string());
        let s = s.trim();
        let (year, month) = match s.split_once('-') {
            Some((y, m)) => (y, Some(m)),
            None => (s, None),
        };
        if year.len() != 4 {
            return Err(invalid());
        }
        let year: u16 = year.parse().map_err(|_| invalid())?;
        let month = match month {
            Some(m) => {
                let m: u8 = m.parse().map_err(|_| invalid())?;
                if !(1..=12).contains(&m) {
                    return Err(invalid());
                }
                Some(m)
            }
            None => None,
        };
        Ok(Self { year, month })
    }
}

impl fmt::Display for CaptureDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{:04}-{:02}", self.year, m),
            None => write!(f, "{:04}", self.year),
        }
    }
}

impl Serialize for CaptureDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CaptureDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// What a metadata lookup returns for one probe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanoramaMetadata {
    pub pano_id: String,
    /// True panorama position, not the probe position.
    pub location: GeoPoint,
    #[serde(default)]
    pub capture_date: Option<CaptureDate>,
    #[serde(default)]
    pub copyright: Option<String>,
}

/// A discovered panorama together with the probe that found it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanoramaRecord {
    pub pano_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub capture_date: Option<CaptureDate>,
    #[serde(default)]
    pub copyright: Option<String>,
    pub discovered_from: GridPoint,
    /// Distance between `discovered_from` and the panorama position.
    pub distance_m: f64,
}

impl PanoramaRecord {
    /// Attach probe provenance to a lookup result.
    pub fn from_metadata(meta: PanoramaMetadata, probe: GridPoint) -> Self {
        let distance_m = probe.location().distance_m(&meta.location);
        Self {
            pano_id: meta.pano_id,
            latitude: meta.location.lat,
            longitude: meta.location.lon,
            capture_date: meta.capture_date,
            copyright: meta.copyright,
            discovered_from: probe,
            distance_m,
        }
    }

    #[inline]
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_month_and_year_dates() {
        let d: CaptureDate = "2019-07".parse().expect("date");
        assert_eq!(
            d,
            CaptureDate {
                year: 2019,
                month: Some(7)
            }
        );
        assert_eq!(d.to_string(), "2019-07");

        let y: CaptureDate = "2021".parse().expect("year");
        assert_eq!(y.month, None);
        assert_eq!(y.to_string(), "2021");
    }

    #[test]
    fn rejects_malformed_dates() {
        for s in ["", "19-07", "2019-13", "2019-00", "2019-xx", "July 2019"] {
            assert!(s.parse::<CaptureDate>().is_err(), "accepted '{s}'");
        }
    }

    #[test]
    fn capture_date_serializes_as_string() {
        let d = CaptureDate {
            year: 2015,
            month: Some(3),
        };
        let json = serde_json::to_string(&d).expect("json");
        assert_eq!(json, "\"2015-03\"");
        let back: CaptureDate = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, d);
    }

    #[test]
    fn record_measures_distance_from_probe() {
        let probe = GridPoint {
            lat: 61.67,
            lon: 50.83,
            sequence_index: 7,
        };
        let meta = PanoramaMetadata {
            pano_id: "abc".into(),
            location: GeoPoint::new(61.6701, 50.83),
            capture_date: None,
            copyright: Some("© Google".into()),
        };
        let rec = PanoramaRecord::from_metadata(meta, probe);
        assert_eq!(rec.pano_id, "abc");
        assert_eq!(rec.discovered_from.sequence_index, 7);
        assert_relative_eq!(rec.distance_m, 11.132, epsilon = 1e-6);
    }
}
