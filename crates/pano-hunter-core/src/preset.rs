//! Area presets sized for typical settlements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::geo::{BoundingBox, GeoPoint};
use crate::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaPreset {
    Small,
    Medium,
    Large,
    Metropolis,
}

impl AreaPreset {
    pub const ALL: [AreaPreset; 4] = [
        AreaPreset::Small,
        AreaPreset::Medium,
        AreaPreset::Large,
        AreaPreset::Metropolis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AreaPreset::Small => "small",
            AreaPreset::Medium => "medium",
            AreaPreset::Large => "large",
            AreaPreset::Metropolis => "metropolis",
        }
    }

    /// Distance from the centre to each edge of the search box.
    pub fn half_extent_km(self) -> f64 {
        match self {
            AreaPreset::Small => 5.0,
            AreaPreset::Medium => 7.5,
            AreaPreset::Large => 10.0,
            AreaPreset::Metropolis => 12.5,
        }
    }

    /// Search parameters tuned for this settlement size.
    pub fn search_config(self) -> SearchConfig {
        let (step_km, search_radius_m, max_points, request_interval_s) = match self {
            AreaPreset::Small => (0.08, 40.0, 500, 0.04),
            AreaPreset::Medium => (0.12, 60.0, 1000, 0.03),
            AreaPreset::Large => (0.18, 80.0, 1500, 0.03),
            AreaPreset::Metropolis => (0.25, 100.0, 2000, 0.02),
        };
        SearchConfig {
            step_km,
            search_radius_m,
            max_points: Some(max_points),
            request_interval_s,
            ..SearchConfig::default()
        }
    }

    pub fn bbox_around(self, center: GeoPoint) -> Result<BoundingBox, ConfigError> {
        BoundingBox::around(center, self.half_extent_km())
    }
}

impl fmt::Display for AreaPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AreaPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}
