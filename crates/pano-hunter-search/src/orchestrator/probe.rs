use std::thread;

use log::{debug, trace};
use pano_hunter_core::{GridPoint, PanoramaMetadata, RetryPolicy};

#[cfg(feature = "tracing")]
use tracing::instrument;

use super::control::RunControl;
use crate::lookup::{LookupClient, LookupError};
use crate::rate::RateLimiter;

pub(super) enum Probe {
    Found(PanoramaMetadata),
    NotFound,
    /// Transient failures exhausted the retry budget (or the run stopped mid-retry).
    Failed(String),
    Fatal(String),
    /// The run stopped before the first lookup was issued.
    Skipped,
}

pub(super) struct ProbeReport {
    pub probe: Probe,
    pub requests: usize,
}

/// Look up one grid point, retrying transient failures with backoff.
///
/// Every attempt waits on the shared limiter first.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "trace", skip_all, fields(seq = point.sequence_index))
)]
pub(super) fn probe_point<C: LookupClient + ?Sized>(
    client: &C,
    limiter: &RateLimiter,
    retry: &RetryPolicy,
    radius_m: f64,
    point: &GridPoint,
    control: &RunControl,
) -> ProbeReport {
    let mut requests = 0usize;
    loop {
        let permit = limiter.acquire();
        if control.should_stop() {
            let probe = if requests == 0 {
                Probe::Skipped
            } else {
                Probe::Failed("run stopped during retries".to_string())
            };
            return ProbeReport { probe, requests };
        }

        requests += 1;
        let result = client.lookup(point.location(), radius_m);
        drop(permit);

        let probe = match result {
            Ok(meta) => Probe::Found(meta),
            Err(LookupError::NotFound) => Probe::NotFound,
            Err(LookupError::Fatal(reason)) => Probe::Fatal(reason),
            Err(LookupError::Transient(reason)) => {
                let attempts = u32::try_from(requests).unwrap_or(u32::MAX);
                if attempts >= retry.max_attempts {
                    Probe::Failed(reason)
                } else {
                    let delay = retry.backoff(attempts - 1);
                    debug!(
                        "point #{} attempt {attempts} failed ({reason}); retrying in {:?}",
                        point.sequence_index, delay
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    continue;
                }
            }
        };
        trace!("point #{} resolved after {requests} request(s)", point.sequence_index);
        return ProbeReport { probe, requests };
    }
}
