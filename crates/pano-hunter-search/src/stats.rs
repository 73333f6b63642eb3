//! Run counters and summaries.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::info;
use pano_hunter_core::{GridPlan, PanoramaRecord};
use serde::{Deserialize, Serialize};

use crate::dedup::OfferOutcome;

/// Progress is logged every this many probed points.
pub const PROGRESS_EVERY: usize = 50;

/// Counters of one search run.
///
/// Every dispatched point lands in exactly one bucket:
/// `points_probed = unique_panoramas + duplicate_hits + not_found + lookup_failures`
/// and `points_dispatched = points_probed + skipped`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Grid size before the `max_points` limit.
    pub points_planned: usize,
    /// Points handed to the workers (after the limit).
    pub points_dispatched: usize,
    /// Points dropped by the `max_points` limit.
    pub points_truncated: usize,
    /// Points for which at least one lookup was issued.
    pub points_probed: usize,
    pub unique_panoramas: usize,
    /// Sightings of already known panoramas (closer or not).
    pub duplicate_hits: usize,
    pub not_found: usize,
    /// Points given up after transient failures, plus the point that hit a fatal error.
    pub lookup_failures: usize,
    /// Lookup attempts beyond the first one.
    pub retries: usize,
    /// Total lookups issued, retries included.
    pub requests_issued: usize,
    /// Dispatched points never probed because the run stopped early.
    pub skipped: usize,
    pub elapsed_s: f64,
}

impl SearchStats {
    #[inline]
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_s)
    }

    /// Share of probed points that discovered a new panorama.
    pub fn efficiency(&self) -> f64 {
        if self.points_probed == 0 {
            0.0
        } else {
            self.unique_panoramas as f64 / self.points_probed as f64
        }
    }

    /// True when every dispatched point is accounted for exactly once.
    pub fn is_balanced(&self) -> bool {
        self.points_probed
            == self.unique_panoramas + self.duplicate_hits + self.not_found + self.lookup_failures
            && self.points_dispatched == self.points_probed + self.skipped
            && self.points_planned == self.points_dispatched + self.points_truncated
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.points_probed,
            unique: self.unique_panoramas,
            duplicates: self.duplicate_hits,
            failures: self.lookup_failures,
            elapsed_s: self.elapsed_s,
        }
    }
}

/// Short run summary returned to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub failures: usize,
    pub elapsed_s: f64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "probed {} points: {} unique panoramas, {} duplicates, {} failures in {:.1}s",
            self.total, self.unique, self.duplicates, self.failures, self.elapsed_s
        )
    }
}

/// Statistics derived from the final record set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub count: usize,
    pub avg_distance_m: f64,
    pub max_distance_m: f64,
    /// Distinct capture dates present in the set.
    pub unique_capture_dates: usize,
}

impl RecordSummary {
    pub fn from_records(records: &[PanoramaRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let total: f64 = records.iter().map(|r| r.distance_m).sum();
        let max_distance_m = records.iter().map(|r| r.distance_m).fold(0.0, f64::max);
        let dates: BTreeSet<_> = records.iter().filter_map(|r| r.capture_date).collect();
        Self {
            count: records.len(),
            avg_distance_m: total / records.len() as f64,
            max_distance_m,
            unique_capture_dates: dates.len(),
        }
    }
}

/// How one dispatched point ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PointResult {
    Offered(OfferOutcome),
    NotFound,
    Failed,
    Skipped,
}

/// Shared, mutex-guarded counters updated by the workers.
pub(crate) struct StatsAccumulator {
    stats: Mutex<SearchStats>,
    started: Instant,
}

impl StatsAccumulator {
    pub(crate) fn new(plan: &GridPlan) -> Self {
        Self {
            stats: Mutex::new(SearchStats {
                points_planned: plan.total,
                points_dispatched: plan.limit,
                points_truncated: plan.truncated(),
                ..SearchStats::default()
            }),
            started: Instant::now(),
        }
    }

    pub(crate) fn record(&self, result: PointResult, requests: usize) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.requests_issued += requests;
        stats.retries += requests.saturating_sub(1);
        match result {
            PointResult::Skipped => {
                stats.skipped += 1;
                return;
            }
            PointResult::Offered(OfferOutcome::Inserted) => stats.unique_panoramas += 1,
            PointResult::Offered(_) => stats.duplicate_hits += 1,
            PointResult::NotFound => stats.not_found += 1,
            PointResult::Failed => stats.lookup_failures += 1,
        }
        stats.points_probed += 1;
        if stats.points_probed % PROGRESS_EVERY == 0 {
            self.log_progress(&stats);
        }
    }

    /// Count `n` dispatched points that no worker picked up.
    pub(crate) fn record_skipped(&self, n: usize) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.skipped += n;
    }

    fn log_progress(&self, stats: &SearchStats) {
        let elapsed = self.started.elapsed().as_secs_f64();
        let speed = if elapsed > 0.0 {
            stats.points_probed as f64 / elapsed
        } else {
            0.0
        };
        let left = stats.points_dispatched.saturating_sub(stats.points_probed);
        let remaining_min = if speed > 0.0 {
            left as f64 / speed / 60.0
        } else {
            0.0
        };
        info!(
            "{}/{} points | found {} | {:.1} points/s | ~{:.1} min left",
            stats.points_probed,
            stats.points_dispatched,
            stats.unique_panoramas,
            speed,
            remaining_min
        );
    }

    pub(crate) fn finish(self) -> SearchStats {
        let mut stats = self
            .stats
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        stats.elapsed_s = self.started.elapsed().as_secs_f64();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pano_hunter_core::{CaptureDate, GridPoint};

    fn plan(total: usize, limit: usize) -> GridPlan {
        GridPlan {
            rows: 1,
            cols: total,
            total,
            limit,
        }
    }

    #[test]
    fn accumulator_accounts_for_every_point() {
        let acc = StatsAccumulator::new(&plan(10, 8));
        acc.record(PointResult::Offered(OfferOutcome::Inserted), 1);
        acc.record(PointResult::Offered(OfferOutcome::DuplicateIgnored), 1);
        acc.record(PointResult::Offered(OfferOutcome::DuplicateReplaced), 2);
        acc.record(PointResult::NotFound, 1);
        acc.record(PointResult::Failed, 3);
        acc.record(PointResult::Skipped, 0);
        acc.record_skipped(2);
        let stats = acc.finish();

        assert_eq!(stats.points_probed, 5);
        assert_eq!(stats.unique_panoramas, 1);
        assert_eq!(stats.duplicate_hits, 2);
        assert_eq!(stats.not_found, 1);
        assert_eq!(stats.lookup_failures, 1);
        assert_eq!(stats.skipped, 3);
        assert_eq!(stats.requests_issued, 8);
        assert_eq!(stats.retries, 3);
        assert_eq!(stats.points_truncated, 2);
        assert!(stats.is_balanced());
    }

    #[test]
    fn summary_mirrors_counters() {
        let stats = SearchStats {
            points_probed: 12,
            unique_panoramas: 4,
            duplicate_hits: 5,
            lookup_failures: 1,
            not_found: 2,
            elapsed_s: 2.5,
            ..SearchStats::default()
        };
        let s = stats.summary();
        assert_eq!((s.total, s.unique, s.duplicates, s.failures), (12, 4, 5, 1));
        assert_eq!(stats.efficiency(), 4.0 / 12.0);
        assert!(s.to_string().contains("4 unique panoramas"));
    }

    #[test]
    fn record_summary_counts_dates_and_distances() {
        let rec = |id: &str, d: f64, date: Option<&str>| PanoramaRecord {
            pano_id: id.into(),
            latitude: 0.0,
            longitude: 0.0,
            capture_date: date.map(|s| s.parse::<CaptureDate>().expect("date")),
            copyright: None,
            discovered_from: GridPoint {
                lat: 0.0,
                lon: 0.0,
                sequence_index: 0,
            },
            distance_m: d,
        };
        let records = [
            rec("a", 10.0, Some("2019-07")),
            rec("b", 20.0, Some("2019-07")),
            rec("c", 30.0, Some("2021-03")),
            rec("d", 40.0, None),
        ];
        let s = RecordSummary::from_records(&records);
        assert_eq!(s.count, 4);
        assert_eq!(s.avg_distance_m, 25.0);
        assert_eq!(s.max_distance_m, 40.0);
        assert_eq!(s.unique_capture_dates, 2);
        assert_eq!(RecordSummary::from_records(&[]), RecordSummary::default());
    }
}
