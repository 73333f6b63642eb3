use pano_hunter_core::PanoramaRecord;
use serde::{Deserialize, Serialize};

use super::RunState;
use crate::stats::{RecordSummary, RunSummary, SearchStats};

/// Why a run stopped before probing every point.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortCause {
    #[error("fatal lookup error at grid point #{sequence_index}: {reason}")]
    Fatal {
        reason: String,
        sequence_index: usize,
    },
    #[error("run cancelled")]
    Cancelled,
}

/// Everything a run produced, complete or partial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// `Completed` or `Aborted`.
    pub state: RunState,
    /// Deduplicated records in discovery order.
    pub records: Vec<PanoramaRecord>,
    pub stats: SearchStats,
    #[serde(default)]
    pub abort: Option<AbortCause>,
}

impl SearchOutcome {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state == RunState::Completed
    }

    pub fn summary(&self) -> RunSummary {
        self.stats.summary()
    }

    pub fn record_summary(&self) -> RecordSummary {
        RecordSummary::from_records(&self.records)
    }
}
