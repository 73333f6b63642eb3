use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Reject seconds values a [`Duration`] cannot hold.
fn check_duration(field: &'static str, value: f64) -> Result<(), ConfigError> {
    Duration::try_from_secs_f64(value)
        .map(drop)
        .map_err(|_| ConfigError::OutOfRange {
            field,
            value,
            min: 0.0,
            max: Duration::MAX.as_secs_f64(),
        })
}

/// Bounded exponential backoff for transient lookup failures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per point, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry, in seconds.
    pub base_delay_s: f64,
    /// Growth factor between consecutive retries.
    pub multiplier: f64,
    /// Upper bound of a single backoff delay, in seconds.
    pub max_delay_s: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_s: 0.5,
            multiplier: 2.0,
            max_delay_s: 8.0,
        }
    }
}

impl RetryPolicy {
    /// Retry immediately; useful for tests and replayed lookups.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_s: 0.0,
            multiplier: 1.0,
            max_delay_s: 0.0,
        }
    }

    /// Sleep before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = (self.base_delay_s * self.multiplier.powi(exp)).min(self.max_delay_s);
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroCount {
                field: "retry.max_attempts",
            });
        }
        for (field, value) in [
            ("retry.base_delay_s", self.base_delay_s),
            ("retry.multiplier", self.multiplier),
            ("retry.max_delay_s", self.max_delay_s),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { field, value });
            }
            if value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: f64::INFINITY,
                });
            }
        }
        check_duration("retry.base_delay_s", self.base_delay_s)?;
        check_duration("retry.max_delay_s", self.max_delay_s)
    }
}

/// Parameters of one search run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Ground spacing of the probe grid.
    pub step_km: f64,
    /// Radius passed to each lookup.
    pub search_radius_m: f64,
    /// Upper bound on probed points; the grid is truncated in generation order.
    pub max_points: Option<usize>,
    /// Minimum spacing between two lookups, system-wide.
    pub request_interval_s: f64,
    /// Worker thread count.
    pub workers: usize,
    /// Optional cap on simultaneously running lookups.
    pub max_in_flight: Option<usize>,
    pub retry: RetryPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            step_km: 0.15,
            search_radius_m: 50.0,
            max_points: Some(1000),
            request_interval_s: 0.03,
            workers: 1,
            max_in_flight: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.step_km.is_finite() || self.step_km <= 0.0 {
            return Err(ConfigError::NonPositiveStep(self.step_km));
        }
        if !self.search_radius_m.is_finite() || self.search_radius_m < 0.0 {
            return Err(ConfigError::NegativeRadius(self.search_radius_m));
        }
        if !self.request_interval_s.is_finite() || self.request_interval_s <= 0.0 {
            return Err(ConfigError::NonPositiveInterval(self.request_interval_s));
        }
        check_duration("request_interval_s", self.request_interval_s)?;
        if self.max_points == Some(0) {
            return Err(ConfigError::ZeroCount { field: "max_points" });
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroCount { field: "workers" });
        }
        if self.max_in_flight == Some(0) {
            return Err(ConfigError::ZeroCount {
                field: "max_in_flight",
            });
        }
        self.retry.validate()
    }

    /// Saturates at [`Duration::MAX`] for intervals `validate` rejects.
    #[inline]
    pub fn request_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_interval_s).unwrap_or(Duration::MAX)
    }

    /// Lower bound on the wall time of a run over `points` probes, saturating.
    pub fn estimated_duration(&self, points: usize) -> Duration {
        Duration::try_from_secs_f64(self.request_interval_s * points as f64)
            .unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_parameters() {
        let base = SearchConfig::default();
        let cases = [
            SearchConfig {
                step_km: 0.0,
                ..base.clone()
            },
            SearchConfig {
                search_radius_m: -1.0,
                ..base.clone()
            },
            SearchConfig {
                request_interval_s: 0.0,
                ..base.clone()
            },
            SearchConfig {
                workers: 0,
                ..base.clone()
            },
            SearchConfig {
                max_points: Some(0),
                ..base.clone()
            },
            SearchConfig {
                retry: RetryPolicy {
                    max_attempts: 0,
                    ..RetryPolicy::default()
                },
                ..base.clone()
            },
        ];
        for cfg in cases {
            assert!(cfg.validate().is_err(), "accepted {cfg:?}");
        }
    }

    #[test]
    fn unrepresentable_delays_are_out_of_range() {
        let cfg = SearchConfig {
            request_interval_s: 1e20,
            ..SearchConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange {
                field: "request_interval_s",
                ..
            })
        ));

        let cfg = SearchConfig {
            retry: RetryPolicy {
                max_delay_s: 1e300,
                ..RetryPolicy::default()
            },
            ..SearchConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange {
                field: "retry.max_delay_s",
                ..
            })
        ));
    }

    #[test]
    fn long_estimates_saturate() {
        let cfg = SearchConfig {
            request_interval_s: 1e17,
            ..SearchConfig::default()
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.estimated_duration(1000), Duration::MAX);
        assert_eq!(cfg.estimated_duration(2), Duration::from_secs(200_000_000_000_000_000));
    }

    #[test]
    fn backoff_never_panics() {
        let policy = RetryPolicy {
            base_delay_s: 1.0,
            multiplier: 1e10,
            max_delay_s: f64::MAX,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(40), Duration::MAX);
    }

    #[test]
    fn zero_radius_is_allowed() {
        let cfg = SearchConfig {
            search_radius_m: 0.0,
            ..SearchConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(10), Duration::from_secs(8));
        assert_eq!(RetryPolicy::immediate(3).backoff(4), Duration::ZERO);
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let cfg: SearchConfig = serde_json::from_str(r#"{"step_km": 0.2}"#).expect("cfg");
        assert_eq!(cfg.step_km, 0.2);
        assert_eq!(cfg.search_radius_m, 50.0);
        assert_eq!(cfg.retry.max_attempts, 3);
    }
}
