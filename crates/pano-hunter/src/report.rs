//! JSON run report and result writers.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use pano_hunter_core::{BoundingBox, PanoramaRecord, SearchConfig};
use pano_hunter_search::{AbortCause, RecordSummary, RunState, SearchOutcome, SearchStats};
use serde::{Deserialize, Serialize};

use crate::io::IoError;
use crate::output::{details_path, write_csv, write_links, OutputFormat, OutputSpec};

/// Everything needed to reproduce and inspect a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub started_at: DateTime<Utc>,
    pub bounds: BoundingBox,
    pub config: SearchConfig,
    pub state: RunState,
    #[serde(default)]
    pub abort: Option<AbortCause>,
    pub stats: SearchStats,
    pub records: Vec<PanoramaRecord>,
}

impl SearchReport {
    pub fn new(
        started_at: DateTime<Utc>,
        bounds: BoundingBox,
        config: SearchConfig,
        outcome: SearchOutcome,
    ) -> Self {
        Self {
            started_at,
            bounds,
            config,
            state: outcome.state,
            abort: outcome.abort,
            stats: outcome.stats,
            records: outcome.records,
        }
    }

    pub fn record_summary(&self) -> RecordSummary {
        RecordSummary::from_records(&self.records)
    }

    /// Load a report written by [`SearchReport::write_json`].
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, IoError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Write the report in the requested format; returns the files written.
///
/// Nothing is written for a run without records, except the JSON report.
pub fn write_outputs(spec: &OutputSpec, report: &SearchReport) -> Result<Vec<PathBuf>, IoError> {
    let records = &report.records;
    let written = match spec.format {
        OutputFormat::Json => {
            if let Some(dir) = spec.path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            report.write_json(&spec.path)?;
            vec![spec.path.clone()]
        }
        _ if records.is_empty() => Vec::new(),
        OutputFormat::Csv => {
            write_csv(create(&spec.path)?, records, &spec.domain)?;
            vec![spec.path.clone()]
        }
        OutputFormat::Txt => {
            let details = details_path(&spec.path);
            write_links(create(&spec.path)?, records, &spec.domain)?;
            write_csv(create(&details)?, records, &spec.domain)?;
            vec![spec.path.clone(), details]
        }
    };
    for path in &written {
        info!("wrote {}", path.display());
    }
    Ok(written)
}
