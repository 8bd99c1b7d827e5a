pub mod gpx;
pub mod spatial;
pub mod temporal;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use spatial::{find_nearest_elevation, ElevationLookup, DEFAULT_ELEVATION_THRESHOLD_M};
pub use temporal::{find_closest_by_time, MatchOptions, MatchResult, DEFAULT_TIME_THRESHOLD_SECS};

/// A recorded GPS position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters
    pub elevation: Option<f64>,
    pub time: Option<DateTime<Utc>>,
}

/// The active GPS track. Never mutated after parsing, only replaced.
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub segments: Vec<Vec<TrackPoint>>,
    /// All segments flattened in recording order
    pub points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(name: impl Into<String>, segments: Vec<Vec<TrackPoint>>) -> Self {
        let points = segments.iter().flatten().cloned().collect();
        Self {
            name: name.into(),
            segments,
            points,
        }
    }

    /// Points that carry a timestamp, in recording order.
    pub fn timestamped_points(&self) -> Vec<TrackPoint> {
        self.points.iter().filter(|p| p.time.is_some()).cloned().collect()
    }

    /// First and last timestamp of the track.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut times = self.points.iter().filter_map(|p| p.time);
        let first = times.next()?;
        let last = times.last().unwrap_or(first);
        Some((first, last))
    }
}
