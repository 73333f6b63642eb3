//! Local equirectangular geometry on latitude/longitude degrees.
//!
//! The search areas handled here are city-sized (a few kilometres), so a flat
//! approximation around the mean latitude is accurate to well under a metre at
//! probe distances and is much cheaper than a great-circle formula.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Kilometres per degree of latitude.
pub const KM_PER_DEG_LAT: f64 = 111.32;

/// Metres per degree of latitude.
pub const M_PER_DEG_LAT: f64 = KM_PER_DEG_LAT * 1000.0;

/// Largest accepted span of a bounding box along either axis, in degrees.
pub const MAX_SPAN_DEG: f64 = 10.0;

/// Kilometres per degree of longitude at the given latitude.
#[inline]
pub fn km_per_deg_lon(lat_deg: f64) -> f64 {
    KM_PER_DEG_LAT * lat_deg.to_radians().cos()
}

/// A WGS84 coordinate in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Approximate ground distance to `other` in metres.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let mean_lat = 0.5 * (self.lat + other.lat);
        let dy = (other.lat - self.lat) * M_PER_DEG_LAT;
        let dx = (other.lon - self.lon) * M_PER_DEG_LAT * mean_lat.to_radians().cos();
        dx.hypot(dy)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

impl FromStr for GeoPoint {
    type Err = ConfigError;

    /// Parse `"LAT,LON"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidCoordinate(s.to_string());
        let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
        if !lat.is_finite() || !lon.is_finite() {
            return Err(invalid());
        }
        Ok(Self { lat, lon })
    }
}

/// Rectangular search area in degrees.
///
/// Use [`BoundingBox::new`] to get a validated box; the fields stay public so
/// that callers can deserialize one and call [`BoundingBox::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Build and validate a bounding box.
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Result<Self, ConfigError> {
        let bbox = Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Box extending `half_extent_km` from `center` in each direction.
    pub fn around(center: GeoPoint, half_extent_km: f64) -> Result<Self, ConfigError> {
        if !half_extent_km.is_finite() || half_extent_km <= 0.0 {
            return Err(ConfigError::NonPositiveStep(half_extent_km));
        }
        let dlat = half_extent_km / KM_PER_DEG_LAT;
        let dlon = half_extent_km / km_per_deg_lon(center.lat);
        Self::new(
            center.lat - dlat,
            center.lat + dlat,
            center.lon - dlon,
            center.lon + dlon,
        )
    }

    /// Check ranges, ordering and the maximum span.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("lat_min", self.lat_min, 90.0),
            ("lat_max", self.lat_max, 90.0),
            ("lon_min", self.lon_min, 180.0),
            ("lon_max", self.lon_max, 180.0),
        ];
        for (field, value, limit) in fields {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { field, value });
            }
            if !(-limit..=limit).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    min: -limit,
                    max: limit,
                });
            }
        }
        if self.lat_min >= self.lat_max {
            return Err(ConfigError::InvertedRange {
                min_field: "lat_min",
                max_field: "lat_max",
                min: self.lat_min,
                max: self.lat_max,
            });
        }
        if self.lon_min >= self.lon_max {
            return Err(ConfigError::InvertedRange {
                min_field: "lon_min",
                max_field: "lon_max",
                min: self.lon_min,
                max: self.lon_max,
            });
        }
        for (axis, span) in [
            ("latitude", self.lat_span()),
            ("longitude", self.lon_span()),
        ] {
            if span > MAX_SPAN_DEG {
                return Err(ConfigError::SpanTooLarge {
                    axis,
                    span,
                    limit: MAX_SPAN_DEG,
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn lat_span(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    #[inline]
    pub fn lon_span(&self) -> f64 {
        self.lon_max - self.lon_min
    }

    #[inline]
    pub fn mean_lat(&self) -> f64 {
        0.5 * (self.lat_min + self.lat_max)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.mean_lat(), 0.5 * (self.lon_min + self.lon_max))
    }

    /// `(width_km, height_km)` of the box at its mean latitude.
    pub fn size_km(&self) -> (f64, f64) {
        let width = self.lon_span() * km_per_deg_lon(self.mean_lat());
        let height = self.lat_span() * KM_PER_DEG_LAT;
        (width, height)
    }

    pub fn area_km2(&self) -> f64 {
        let (w, h) = self.size_km();
        w * h
    }

    pub fn contains(&self, p: &GeoPoint) -> bool {
        (self.lat_min..=self.lat_max).contains(&p.lat)
            && (self.lon_min..=self.lon_max).contains(&p.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_is_zero_for_identical_points() {
        let p = GeoPoint::new(61.668742, 50.835369);
        assert!(p.distance_m(&p) < 0.1);
    }

    #[test]
    fn one_degree_of_latitude_is_111_km() {
        let a = GeoPoint::new(10.0, 20.0);
        let b = GeoPoint::new(11.0, 20.0);
        assert_relative_eq!(a.distance_m(&b), 111_320.0, epsilon = 1e-6);
    }

    #[test]
    fn longitude_distance_shrinks_with_latitude() {
        let eq = GeoPoint::new(0.0, 0.0).distance_m(&GeoPoint::new(0.0, 0.01));
        let north = GeoPoint::new(60.0, 0.0).distance_m(&GeoPoint::new(60.0, 0.01));
        assert_relative_eq!(north / eq, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn valid_box_passes() {
        assert!(BoundingBox::new(61.66, 61.69, 50.81, 50.86).is_ok());
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let err = BoundingBox::new(91.0, 61.69, 50.81, 50.86).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "lat_min",
                ..
            }
        ));
    }

    #[test]
    fn inverted_box_is_rejected() {
        let err = BoundingBox::new(61.69, 61.66, 50.86, 50.81).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvertedRange {
                min_field: "lat_min",
                ..
            }
        ));
    }

    #[test]
    fn oversized_box_is_rejected() {
        let err = BoundingBox::new(40.0, 60.0, 30.0, 60.0).unwrap_err();
        assert!(matches!(err, ConfigError::SpanTooLarge { axis: "latitude", .. }));
    }

    #[test]
    fn nan_is_rejected() {
        let err = BoundingBox::new(f64::NAN, 1.0, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, ConfigError::NotFinite { .. }));
    }

    #[test]
    fn size_of_small_box_is_positive_and_small() {
        let (w, h) = BoundingBox::new(61.66, 61.67, 50.83, 50.84)
            .expect("box")
            .size_km();
        assert!(w > 0.0 && w < 1.0);
        assert!(h > 0.0 && h < 2.0);
        assert_relative_eq!(h, 1.1132, epsilon = 1e-9);
    }

    #[test]
    fn box_around_center_has_requested_extent() {
        let center = GeoPoint::new(55.75, 37.62);
        let bbox = BoundingBox::around(center, 5.0).expect("box");
        let (w, h) = bbox.size_km();
        assert_relative_eq!(h, 10.0, epsilon = 1e-9);
        assert_relative_eq!(w, 10.0, epsilon = 0.05);
        assert!(bbox.contains(&center));
    }

    #[test]
    fn parses_coordinate_pairs() {
        let p: GeoPoint = "55.7558, 37.6173".parse().expect("point");
        assert_relative_eq!(p.lat, 55.7558);
        assert_relative_eq!(p.lon, 37.6173);
        assert!("55.7558".parse::<GeoPoint>().is_err());
        assert!("a,b".parse::<GeoPoint>().is_err());
    }
}
