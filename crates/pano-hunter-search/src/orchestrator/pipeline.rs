use std::sync::{Mutex, PoisonError};
use std::thread;

use log::{error, info, trace, warn};
use pano_hunter_core::{BoundingBox, ConfigError, GridPlan, GridPoint, GridSampler, PanoramaRecord, SearchConfig};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::control::RunControl;
use super::probe::{probe_point, Probe};
use super::state::StateCell;
use super::{AbortCause, RunState, SearchOutcome};
use crate::cancel::CancelToken;
use crate::dedup::Deduplicator;
use crate::lookup::LookupClient;
use crate::rate::RateLimiter;
use crate::stats::{PointResult, StatsAccumulator};

/// Drives a probe grid through a rate-limited worker pool.
///
/// One limiter, one deduplicator and one stats accumulator are shared by all
/// workers of a run, so the aggregate request rate and the final record set do
/// not depend on the worker count.
pub struct SearchOrchestrator<C> {
    client: C,
    config: SearchConfig,
    cancel: CancelToken,
    state: StateCell,
}

impl<C: LookupClient> SearchOrchestrator<C> {
    /// Validate `config` and build an idle orchestrator.
    pub fn new(client: C, config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            client,
            config,
            cancel: CancelToken::new(),
            state: StateCell::new(),
        })
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the current run when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[inline]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// State of the current (or last) run.
    pub fn state(&self) -> RunState {
        self.state.get()
    }

    /// Search `bbox` on a grid built from the configured step.
    ///
    /// Fails only on an invalid area; lookup problems are reported through
    /// the returned outcome.
    pub fn run(&self, bbox: BoundingBox) -> Result<SearchOutcome, ConfigError> {
        self.state.set(RunState::Sampling);
        let sampler = match GridSampler::new(bbox, self.config.step_km) {
            Ok(sampler) => sampler,
            Err(err) => {
                self.state.set(RunState::Idle);
                return Err(err);
            }
        };

        let plan = sampler.plan(self.config.max_points);
        let (width_km, height_km) = bbox.size_km();
        info!(
            "area {:.5}..{:.5} x {:.5}..{:.5} ({:.2} x {:.2} km), step {} km, radius {} m",
            bbox.lat_min,
            bbox.lat_max,
            bbox.lon_min,
            bbox.lon_max,
            width_km,
            height_km,
            self.config.step_km,
            self.config.search_radius_m
        );
        if plan.is_truncated() {
            warn!(
                "limiting search to {} of {} grid points",
                plan.limit, plan.total
            );
        }

        Ok(self.dispatch(sampler.limited(self.config.max_points), plan))
    }

    /// Probe an explicit list of points (still subject to `max_points`).
    pub fn run_points(&self, points: Vec<GridPoint>) -> SearchOutcome {
        self.state.set(RunState::Sampling);
        let total = points.len();
        let limit = self.config.max_points.map_or(total, |m| m.min(total));
        let plan = GridPlan {
            rows: 1,
            cols: total,
            total,
            limit,
        };
        let mut points = points;
        points.truncate(limit);
        self.dispatch(points.into_iter(), plan)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(points = plan.limit, workers = self.config.workers))
    )]
    fn dispatch<I>(&self, points: I, plan: GridPlan) -> SearchOutcome
    where
        I: Iterator<Item = GridPoint> + Send,
    {
        self.state.set(RunState::Dispatching);
        info!(
            "{} points to probe with {} worker(s); at least {:.1} min at {} s/request",
            plan.limit,
            self.config.workers,
            self.config.estimated_duration(plan.limit).as_secs_f64() / 60.0,
            self.config.request_interval_s
        );

        let mut limiter = RateLimiter::new(self.config.request_interval());
        if let Some(max) = self.config.max_in_flight {
            limiter = limiter.with_max_in_flight(max);
        }
        let dedup = Deduplicator::new();
        let stats = StatsAccumulator::new(&plan);
        let control = RunControl::new(self.cancel.clone());
        let queue = Mutex::new(points);
        let workers = self.config.workers.clamp(1, plan.limit.max(1));

        thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| self.work(&queue, &limiter, &dedup, &stats, &control));
            }
        });

        let leftover = queue
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .count();
        stats.record_skipped(leftover);

        let stats = stats.finish();
        let records = dedup.into_records();
        let abort = control.into_cause();
        let state = match &abort {
            Some(cause) => {
                error!("run aborted: {cause}; keeping {} record(s)", records.len());
                RunState::Aborted
            }
            None => RunState::Completed,
        };
        self.state.set(state);

        info!("{}", stats.summary());
        if state == RunState::Completed && stats.points_probed > 0 && records.is_empty() {
            warn!(
                "no panoramas found: check the API key, that the Street View Static API is \
                 enabled, the daily quota and whether the area has coverage"
            );
        }

        SearchOutcome {
            state,
            records,
            stats,
            abort,
        }
    }

    fn work<I>(
        &self,
        queue: &Mutex<I>,
        limiter: &RateLimiter,
        dedup: &Deduplicator,
        stats: &StatsAccumulator,
        control: &RunControl,
    ) where
        I: Iterator<Item = GridPoint>,
    {
        loop {
            if control.should_stop() {
                break;
            }
            let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
            let Some(point) = next else {
                break;
            };

            let report = probe_point(
                &self.client,
                limiter,
                &self.config.retry,
                self.config.search_radius_m,
                &point,
                control,
            );
            let result = match report.probe {
                Probe::Found(meta) => {
                    let record = PanoramaRecord::from_metadata(meta, point);
                    trace!(
                        "point #{} -> {} at {:.1} m",
                        point.sequence_index,
                        record.pano_id,
                        record.distance_m
                    );
                    PointResult::Offered(dedup.offer(record))
                }
                Probe::NotFound => PointResult::NotFound,
                Probe::Failed(reason) => {
                    warn!(
                        "skipping point #{} ({:.5},{:.5}) after {} request(s): {reason}",
                        point.sequence_index, point.lat, point.lon, report.requests
                    );
                    PointResult::Failed
                }
                Probe::Fatal(reason) => {
                    control.abort(AbortCause::Fatal {
                        reason,
                        sequence_index: point.sequence_index,
                    });
                    PointResult::Failed
                }
                Probe::Skipped => PointResult::Skipped,
            };
            stats.record(result, report.requests);
        }
        self.state.begin_draining();
    }
}
