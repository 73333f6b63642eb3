//! System-wide request pacing.
//!
//! A single [`RateLimiter`] is shared by every worker of a run. Grants are
//! serialized through one mutex that also holds the last grant instant, so two
//! grants are never closer than the configured interval no matter how many
//! threads call [`RateLimiter::acquire`].

use std::sync::{Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

struct Slots {
    max: usize,
    in_use: Mutex<usize>,
    freed: Condvar,
}

impl Slots {
    fn take(&self) {
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        while *in_use >= self.max {
            in_use = self
                .freed
                .wait(in_use)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *in_use += 1;
    }

    fn release(&self) {
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        *in_use = in_use.saturating_sub(1);
        self.freed.notify_one();
    }
}

/// Fixed-interval gate with an optional cap on concurrent permits.
pub struct RateLimiter {
    interval: Duration,
    last_grant: Mutex<Option<Instant>>,
    slots: Option<Slots>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_grant: Mutex::new(None),
            slots: None,
        }
    }

    /// Limit the number of permits alive at the same time.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.slots = Some(Slots {
            max: max.max(1),
            in_use: Mutex::new(0),
            freed: Condvar::new(),
        });
        self
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until a request may be issued.
    ///
    /// The returned permit must be kept alive for the duration of the request
    /// when a concurrency cap is configured.
    pub fn acquire(&self) -> RatePermit<'_> {
        if let Some(slots) = &self.slots {
            slots.take();
        }

        // The lock is held while sleeping: waiters queue behind it and each one
        // measures its interval from the grant before it.
        let mut last = self
            .last_grant
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = *last {
            let ready = prev + self.interval;
            let now = Instant::now();
            if ready > now {
                thread::sleep(ready - now);
            }
        }
        let granted_at = Instant::now();
        *last = Some(granted_at);
        drop(last);

        RatePermit {
            granted_at,
            slots: self.slots.as_ref(),
        }
    }
}

/// Proof that the rate limiter admitted one request.
pub struct RatePermit<'a> {
    granted_at: Instant,
    slots: Option<&'a Slots>,
}

impl RatePermit<'_> {
    #[inline]
    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }
}

impl Drop for RatePermit<'_> {
    fn drop(&mut self) {
        if let Some(slots) = self.slots {
            slots.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn grants_are_spaced_system_wide() {
        let interval = Duration::from_millis(8);
        let limiter = RateLimiter::new(interval);
        let grants = Mutex::new(Vec::new());

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..5 {
                        let permit = limiter.acquire();
                        grants.lock().expect("grants").push(permit.granted_at());
                    }
                });
            }
        });

        let mut grants = grants.into_inner().expect("grants");
        grants.sort();
        assert_eq!(grants.len(), 20);
        for pair in grants.windows(2) {
            assert!(
                pair[1] - pair[0] >= interval,
                "grants {:?} apart",
                pair[1] - pair[0]
            );
        }
    }

    #[test]
    fn first_grant_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let t0 = Instant::now();
        let _permit = limiter.acquire();
        assert!(t0.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn concurrency_cap_is_respected() {
        let limiter = RateLimiter::new(Duration::from_micros(10)).with_max_in_flight(2);
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..6 {
                s.spawn(|| {
                    for _ in 0..4 {
                        let _permit = limiter.acquire();
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(2));
                        active.fetch_sub(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }
}
