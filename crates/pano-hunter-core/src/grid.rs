//! Uniform probe grid over a bounding box.
//!
//! The grid is spaced `step_km` apart on the ground in both directions. The
//! longitude step is widened by `1 / cos(mean_lat)` so that east-west spacing
//! stays `step_km` away from the equator.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::geo::{km_per_deg_lon, BoundingBox, GeoPoint, KM_PER_DEG_LAT};
use crate::ConfigError;

/// Tolerance (in steps) under which a span is considered an exact multiple of
/// the step.
const EDGE_EPS: f64 = 1e-9;

/// A candidate probe coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub lat: f64,
    pub lon: f64,
    /// Position in generation order, starting at 0.
    pub sequence_index: usize,
}

impl GridPoint {
    #[inline]
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Size of a grid before and after the `max_points` limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPlan {
    pub rows: usize,
    pub cols: usize,
    /// `rows * cols`.
    pub total: usize,
    /// Number of points that will actually be probed.
    pub limit: usize,
}

impl GridPlan {
    #[inline]
    pub fn truncated(&self) -> usize {
        self.total - self.limit
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.limit < self.total
    }
}

/// Row-major grid generator. Cheap to copy; holds no iteration state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSampler {
    bbox: BoundingBox,
    step_km: f64,
    lat_step: f64,
    lon_step: f64,
    rows: usize,
    cols: usize,
}

/// Points along one axis, or `None` when the count does not fit a `usize`.
fn axis_count(span: f64, step: f64) -> Option<usize> {
    let steps = (span / step - EDGE_EPS).ceil().max(0.0);
    if steps >= usize::MAX as f64 {
        return None;
    }
    (steps as usize).checked_add(1)
}

impl GridSampler {
    /// Build a sampler for `bbox` with ground spacing `step_km`.
    pub fn new(bbox: BoundingBox, step_km: f64) -> Result<Self, ConfigError> {
        if !step_km.is_finite() || step_km <= 0.0 {
            return Err(ConfigError::NonPositiveStep(step_km));
        }
        bbox.validate()?;

        let lat_step = step_km / KM_PER_DEG_LAT;
        let lon_step = step_km / km_per_deg_lon(bbox.mean_lat());
        let too_large = || ConfigError::GridTooLarge { step_km };
        let rows = axis_count(bbox.lat_span(), lat_step).ok_or_else(too_large)?;
        let cols = axis_count(bbox.lon_span(), lon_step).ok_or_else(too_large)?;
        rows.checked_mul(cols).ok_or_else(too_large)?;

        Ok(Self {
            bbox,
            step_km,
            lat_step,
            lon_step,
            rows,
            cols,
        })
    }

    #[inline]
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    #[inline]
    pub fn step_km(&self) -> f64 {
        self.step_km
    }

    /// `(lat_step, lon_step)` in degrees.
    #[inline]
    pub fn steps_deg(&self) -> (f64, f64) {
        (self.lat_step, self.lon_step)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grid dimensions with an optional upper bound on probed points.
    pub fn plan(&self, max_points: Option<usize>) -> GridPlan {
        let total = self.len();
        let limit = max_points.map_or(total, |m| m.min(total));
        GridPlan {
            rows: self.rows,
            cols: self.cols,
            total,
            limit,
        }
    }

    /// Point at generation index `index`, if inside the grid.
    pub fn point(&self, index: usize) -> Option<GridPoint> {
        if index >= self.len() {
            return None;
        }
        let row = index / self.cols;
        let col = index % self.cols;
        let lat = (self.bbox.lat_min + row as f64 * self.lat_step).min(self.bbox.lat_max);
        let lon = (self.bbox.lon_min + col as f64 * self.lon_step).min(self.bbox.lon_max);
        Some(GridPoint {
            lat,
            lon,
            sequence_index: index,
        })
    }

    /// All grid points in row-major order.
    pub fn points(&self) -> GridPoints {
        GridPoints {
            sampler: *self,
            next: 0,
            end: self.len(),
        }
    }

    /// The first `max_points` grid points (all of them for `None`).
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn limited(&self, max_points: Option<usize>) -> GridPoints {
        let plan = self.plan(max_points);
        GridPoints {
            sampler: *self,
            next: 0,
            end: plan.limit,
        }
    }
}

/// Lazy iterator over [`GridSampler`] points.
#[derive(Clone, Debug)]
pub struct GridPoints {
    sampler: GridSampler,
    next: usize,
    end: usize,
}

impl Iterator for GridPoints {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        if self.next >= self.end {
            return None;
        }
        let p = self.sampler.point(self.next);
        self.next += 1;
        p
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for GridPoints {}

/// Convenience wrapper: validated sampler plus its (possibly limited) points.
pub fn generate(
    bbox: BoundingBox,
    step_km: f64,
    max_points: Option<usize>,
) -> Result<GridPoints, ConfigError> {
    Ok(GridSampler::new(bbox, step_km)?.limited(max_points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn syktyvkar() -> BoundingBox {
        BoundingBox::new(61.66, 61.69, 50.81, 50.86).expect("box")
    }

    fn expected_count(bbox: &BoundingBox, step_km: f64) -> usize {
        let lat_step = step_km / 111.32;
        let lon_step = step_km / (111.32 * bbox.mean_lat().to_radians().cos());
        let rows = (bbox.lat_span() / lat_step + 1.0).ceil() as usize;
        let cols = (bbox.lon_span() / lon_step + 1.0).ceil() as usize;
        rows * cols
    }

    #[test]
    fn count_matches_closed_form() {
        let cases = [
            (syktyvkar(), 0.12),
            (syktyvkar(), 0.37),
            (BoundingBox::new(55.75, 55.78, 37.60, 37.65).expect("box"), 0.15),
            (BoundingBox::new(-33.95, -33.85, 151.15, 151.30).expect("box"), 0.5),
        ];
        for (bbox, step) in cases {
            let sampler = GridSampler::new(bbox, step).expect("sampler");
            assert_eq!(sampler.points().count(), expected_count(&bbox, step));
            assert_eq!(sampler.points().len(), sampler.len());
        }
    }

    #[test]
    fn max_points_truncates_in_generation_order() {
        let sampler = GridSampler::new(syktyvkar(), 0.12).expect("sampler");
        let all: Vec<_> = sampler.points().collect();
        let limited: Vec<_> = sampler.limited(Some(100)).collect();
        assert_eq!(limited.len(), 100);
        assert_eq!(&all[..100], &limited[..]);

        let plan = sampler.plan(Some(100));
        assert!(plan.is_truncated());
        assert_eq!(plan.truncated(), all.len() - 100);

        let plan = sampler.plan(Some(1_000_000));
        assert!(!plan.is_truncated());
        assert_eq!(plan.limit, all.len());
    }

    #[test]
    fn generation_is_idempotent() {
        let a: Vec<_> = generate(syktyvkar(), 0.12, Some(500)).expect("grid").collect();
        let b: Vec<_> = generate(syktyvkar(), 0.12, Some(500)).expect("grid").collect();
        assert_eq!(a, b);
    }

    #[test]
    fn points_are_row_major_and_inside_box() {
        let bbox = syktyvkar();
        let sampler = GridSampler::new(bbox, 0.12).expect("sampler");
        let pts: Vec<_> = sampler.points().collect();
        for (i, p) in pts.iter().enumerate() {
            assert_eq!(p.sequence_index, i);
            assert!(bbox.contains(&p.location()), "point {i} outside box");
        }
        // first row shares latitude, longitude increases
        let cols = sampler.cols();
        assert!(pts[..cols].iter().all(|p| p.lat == bbox.lat_min));
        assert!(pts[..cols].windows(2).all(|w| w[0].lon < w[1].lon));
        assert_relative_eq!(pts[cols].lat - pts[0].lat, 0.12 / 111.32, epsilon = 1e-12);
    }

    #[test]
    fn boundary_rows_are_probed() {
        let bbox = syktyvkar();
        let sampler = GridSampler::new(bbox, 0.12).expect("sampler");
        let last = sampler.points().last().expect("last");
        assert_eq!(last.lat, bbox.lat_max);
        assert_eq!(last.lon, bbox.lon_max);
    }

    #[test]
    fn exact_multiple_does_not_add_a_row() {
        // 0.11132 km / 111.32 km/deg = 1e-3 deg exactly, span 10 steps
        let bbox = BoundingBox::new(0.0, 0.01, 0.0, 0.5).expect("box");
        let sampler = GridSampler::new(bbox, 0.11132).expect("sampler");
        assert_eq!(sampler.rows(), 11);
    }

    #[test]
    fn longitude_step_is_corrected_for_latitude() {
        let north = GridSampler::new(syktyvkar(), 0.12).expect("sampler");
        let (lat_step, lon_step) = north.steps_deg();
        let expected = lat_step / 61.675_f64.to_radians().cos();
        assert_relative_eq!(lon_step, expected, epsilon = 1e-12);
        assert!(lon_step > 2.0 * lat_step);
    }

    #[test]
    fn step_larger_than_box_still_covers_corners() {
        let bbox = syktyvkar();
        let pts: Vec<_> = generate(bbox, 50.0, None).expect("grid").collect();
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[3].lat, bbox.lat_max);
        assert_eq!(pts[3].lon, bbox.lon_max);
    }

    #[test]
    fn unindexable_grid_is_rejected() {
        let bbox = BoundingBox::new(50.0, 60.0, 10.0, 20.0).expect("box");
        let err = GridSampler::new(bbox, 1e-7).unwrap_err();
        assert_eq!(err, ConfigError::GridTooLarge { step_km: 1e-7 });
        assert!(generate(bbox, 1e-7, Some(1000)).is_err());

        // fine but indexable grids still plan without overflow
        let sampler = GridSampler::new(bbox, 1e-3).expect("sampler");
        let plan = sampler.plan(Some(1000));
        assert_eq!(plan.limit, 1000);
        assert_eq!(plan.total, sampler.rows() * sampler.cols());
    }

    #[test]
    fn non_positive_step_is_rejected() {
        for step in [0.0, -0.1, f64::NAN] {
            let err = GridSampler::new(syktyvkar(), step).unwrap_err();
            assert!(matches!(err, ConfigError::NonPositiveStep(_)));
        }
    }
}
