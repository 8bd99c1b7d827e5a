use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::date::DEFAULT_ASSUMED_OFFSET_MINUTES;
use crate::error::Result;
use crate::track::{MatchOptions, DEFAULT_ELEVATION_THRESHOLD_M, DEFAULT_TIME_THRESHOLD_SECS};

fn default_time_threshold() -> i64 {
    DEFAULT_TIME_THRESHOLD_SECS
}

fn default_elevation_threshold() -> f64 {
    DEFAULT_ELEVATION_THRESHOLD_M
}

fn default_assumed_offset() -> i32 {
    DEFAULT_ASSUMED_OFFSET_MINUTES
}

/// Tunables for matching and date parsing. Every field has a default, so a
/// config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeotagOptions {
    /// Max seconds between capture and track point for auto-assignment
    #[serde(default = "default_time_threshold")]
    pub time_threshold_secs: i64,
    /// Max meters between a manual position and the track point lending elevation
    #[serde(default = "default_elevation_threshold")]
    pub elevation_threshold_m: f64,
    /// Zone assumed for filename timestamps without one, minutes east of UTC
    #[serde(default = "default_assumed_offset")]
    pub assumed_offset_minutes: i32,
    /// Zone for the capture side of the same-day check, minutes east of UTC
    #[serde(default)]
    pub media_day_offset_minutes: i32,
}

impl Default for GeotagOptions {
    fn default() -> Self {
        Self {
            time_threshold_secs: default_time_threshold(),
            elevation_threshold_m: default_elevation_threshold(),
            assumed_offset_minutes: default_assumed_offset(),
            media_day_offset_minutes: 0,
        }
    }
}

impl GeotagOptions {
    /// Load options from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let options = serde_json::from_reader(BufReader::new(file))?;
        Ok(options)
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            max_time_delta_secs: self.time_threshold_secs,
            media_day_offset_minutes: self.media_day_offset_minutes,
        }
    }
}
