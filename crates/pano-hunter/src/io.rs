//! Search configuration documents (TOML, JSON or YAML).

use std::fs;
use std::path::{Path, PathBuf};

use pano_hunter_core::{AreaPreset, BoundingBox, ConfigError, GeoPoint, RetryPolicy, SearchConfig};
use pano_hunter_streetview::ImagerySource;
use serde::{Deserialize, Serialize};

use crate::output::{OutputFormat, OutputSpec, DEFAULT_DOMAIN, DEFAULT_OUTPUT};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("unsupported config file '{0}' (expected .toml, .json, .yaml or .yml)")]
    UnsupportedExtension(PathBuf),
}

/// Failure to turn a document into a runnable search.
#[derive(thiserror::Error, Debug)]
pub enum ConfigDocError {
    #[error("failed to read config: {0}")]
    Io(#[from] IoError),
    #[error("invalid config: {0}")]
    Invalid(#[from] ConfigError),
    #[error("no search area: pass --config, all four --lat/--lon bounds, or --preset with --center")]
    MissingArea,
}

/// Serialization of a config document, picked from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocFormat {
    Toml,
    Json,
    Yaml,
}

impl DocFormat {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("toml") => Ok(DocFormat::Toml),
            Some("json") => Ok(DocFormat::Json),
            Some("yaml" | "yml") => Ok(DocFormat::Yaml),
            _ => Err(IoError::UnsupportedExtension(path.to_path_buf())),
        }
    }
}

fn default_step_km() -> f64 {
    0.15
}

fn default_search_radius() -> f64 {
    50.0
}

fn default_max_points() -> usize {
    1000
}

fn default_delay() -> f64 {
    0.03
}

fn default_workers() -> usize {
    1
}

/// `[search_params]` section. `max_points = 0` lifts the limit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default = "default_step_km")]
    pub step_km: f64,
    /// Lookup radius in metres.
    #[serde(default = "default_search_radius")]
    pub search_radius: f64,
    #[serde(default = "default_max_points")]
    pub max_points: usize,
    /// Seconds between two requests, across all workers.
    #[serde(default = "default_delay")]
    pub delay: f64,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<usize>,
    #[serde(default)]
    pub outdoor: bool,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            step_km: default_step_km(),
            search_radius: default_search_radius(),
            max_points: default_max_points(),
            delay: default_delay(),
            workers: default_workers(),
            max_in_flight: None,
            outdoor: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl SearchParams {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            step_km: config.step_km,
            search_radius: config.search_radius_m,
            max_points: config.max_points.unwrap_or(0),
            delay: config.request_interval_s,
            workers: config.workers,
            max_in_flight: config.max_in_flight,
            outdoor: false,
            retry: config.retry.clone(),
        }
    }

    pub fn to_config(&self) -> SearchConfig {
        SearchConfig {
            step_km: self.step_km,
            search_radius_m: self.search_radius,
            max_points: (self.max_points > 0).then_some(self.max_points),
            request_interval_s: self.delay,
            workers: self.workers,
            max_in_flight: self.max_in_flight,
            retry: self.retry.clone(),
        }
    }

    pub fn source(&self) -> ImagerySource {
        if self.outdoor {
            ImagerySource::Outdoor
        } else {
            ImagerySource::Default
        }
    }
}

fn default_filename() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

/// `[output]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_domain")]
    pub domain: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            format: OutputFormat::Txt,
            domain: default_domain(),
        }
    }
}

/// A whole search described in one file.
///
/// Unknown keys are ignored so that documents written for other tools load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub bounds: BoundingBox,
    #[serde(default)]
    pub search_params: SearchParams,
    #[serde(default)]
    pub output: OutputSection,
}

/// A validated document, ready to run.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSearch {
    pub bounds: BoundingBox,
    pub config: SearchConfig,
    pub source: ImagerySource,
    pub output: OutputSpec,
}

/// Command-line values that take precedence over the document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overrides {
    pub step_km: Option<f64>,
    pub search_radius: Option<f64>,
    pub max_points: Option<usize>,
    pub delay: Option<f64>,
    pub workers: Option<usize>,
    pub outdoor: bool,
    pub filename: Option<String>,
    pub format: Option<OutputFormat>,
    pub domain: Option<String>,
}

impl ConfigDocument {
    pub fn new(bounds: BoundingBox) -> Self {
        Self {
            bounds,
            search_params: SearchParams::default(),
            output: OutputSection::default(),
        }
    }

    /// A box of the preset's size around `center`, with its tuned parameters.
    pub fn from_preset(preset: AreaPreset, center: GeoPoint) -> Result<Self, ConfigError> {
        Ok(Self {
            bounds: preset.bbox_around(center)?,
            search_params: SearchParams::from_config(&preset.search_config()),
            output: OutputSection::default(),
        })
    }

    pub fn parse(text: &str, format: DocFormat) -> Result<Self, IoError> {
        Ok(match format {
            DocFormat::Toml => toml::from_str(text)?,
            DocFormat::Json => serde_json::from_str(text)?,
            DocFormat::Yaml => serde_yaml::from_str(text)?,
        })
    }

    pub fn render(&self, format: DocFormat) -> Result<String, IoError> {
        Ok(match format {
            DocFormat::Toml => toml::to_string_pretty(self)?,
            DocFormat::Json => serde_json::to_string_pretty(self)?,
            DocFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }

    /// Load a `.toml`, `.json` or `.yaml` document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let format = DocFormat::from_path(path)?;
        Self::parse(&fs::read_to_string(path)?, format)
    }

    /// Write the document, format chosen by extension.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let path = path.as_ref();
        let text = self.render(DocFormat::from_path(path)?)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        let params = &mut self.search_params;
        if let Some(v) = overrides.step_km {
            params.step_km = v;
        }
        if let Some(v) = overrides.search_radius {
            params.search_radius = v;
        }
        if let Some(v) = overrides.max_points {
            params.max_points = v;
        }
        if let Some(v) = overrides.delay {
            params.delay = v;
        }
        if let Some(v) = overrides.workers {
            params.workers = v;
        }
        params.outdoor |= overrides.outdoor;

        let output = &mut self.output;
        if let Some(v) = &overrides.filename {
            output.filename.clone_from(v);
        }
        if let Some(v) = overrides.format {
            output.format = v;
        }
        if let Some(v) = &overrides.domain {
            output.domain.clone_from(v);
        }
    }

    pub fn resolve(&self) -> Result<ResolvedSearch, ConfigError> {
        self.bounds.validate()?;
        let config = self.search_params.to_config();
        config.validate()?;
        Ok(ResolvedSearch {
            bounds: self.bounds,
            config,
            source: self.search_params.source(),
            output: OutputSpec {
                path: PathBuf::from(&self.output.filename),
                format: self.output.format,
                domain: self.output.domain.trim_start_matches('.').to_string(),
            },
        })
    }
}
