use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;

use super::{Track, TrackPoint};
use crate::error::{GeotagError, Result};

impl Track {
    /// Parse a GPX document and return its first track that has any points.
    ///
    /// Segments without points and tracks without segments are dropped before
    /// the first track is picked. A point whose timestamp cannot be read keeps
    /// its position but loses the time.
    pub fn from_gpx_reader<R: Read>(reader: R) -> Result<Track> {
        let doc = ::gpx::read(reader).map_err(|e| GeotagError::Gpx(e.to_string()))?;

        for (i, trk) in doc.tracks.into_iter().enumerate() {
            let segments: Vec<Vec<TrackPoint>> = trk
                .segments
                .iter()
                .map(|seg| seg.points.iter().map(convert_waypoint).collect::<Vec<_>>())
                .filter(|points| !points.is_empty())
                .collect();

            if segments.is_empty() {
                debug!("Skipping GPX track {} without points", i + 1);
                continue;
            }

            let name = trk.name.unwrap_or_else(|| format!("Track {}", i + 1));
            return Ok(Track::new(name, segments));
        }

        Err(GeotagError::NoTracks)
    }

    pub fn from_gpx_str(text: &str) -> Result<Track> {
        Self::from_gpx_reader(text.as_bytes())
    }

    pub fn from_gpx_path(path: &Path) -> Result<Track> {
        let file = File::open(path).map_err(|source| GeotagError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_gpx_reader(BufReader::new(file))
    }
}

fn convert_waypoint(wpt: &::gpx::Waypoint) -> TrackPoint {
    let pos = wpt.point();
    let time = wpt.time.as_ref().and_then(|t| {
        let iso = t.format().ok()?;
        DateTime::parse_from_rfc3339(&iso)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    });

    TrackPoint {
        latitude: pos.y(),
        longitude: pos.x(),
        elevation: wpt.elevation,
        time,
    }
}
