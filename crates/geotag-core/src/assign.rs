use log::{info, warn};
use serde::Serialize;

use crate::media::{Coordinate, MediaEntry};
use crate::track::{find_closest_by_time, find_nearest_elevation, ElevationLookup, MatchOptions, MatchResult, Track};

/// Tally of one auto-assignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoAssignSummary {
    pub assigned_count: u64,
    pub date_mismatch_count: u64,
    pub time_threshold_count: u64,
    pub no_match_count: u64,
    /// Entries that received coordinates in this pass
    pub assigned: Vec<AutoAssignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AutoAssignment {
    /// Index into the media list
    pub index: usize,
    pub time_delta_ms: i64,
}

/// Give every unassigned, dated media entry the position of the track point
/// nearest in time.
///
/// Entries that already have coordinates are never touched, so repeated
/// passes only affect entries added since the last one. Elevation is copied
/// verbatim from the matched point.
pub fn auto_assign(media: &mut [MediaEntry], track: &Track, options: &MatchOptions) -> AutoAssignSummary {
    let mut summary = AutoAssignSummary::default();

    let points = track.timestamped_points();
    if points.is_empty() {
        warn!("GPX track has no timestamps - cannot auto-assign coordinates");
        return summary;
    }

    for (index, entry) in media.iter_mut().enumerate() {
        if entry.has_coordinates() {
            continue;
        }
        let Some(capture) = entry.capture else {
            continue;
        };

        match find_closest_by_time(capture.instant, &points, options) {
            MatchResult::Success { point, time_delta } => {
                entry.coordinates = Some(Coordinate::new(point.longitude, point.latitude));
                entry.elevation = point.elevation;
                summary.assigned_count += 1;
                summary.assigned.push(AutoAssignment {
                    index,
                    time_delta_ms: time_delta.num_milliseconds(),
                });

                let elevation_info = point.elevation.map(|e| format!(" at {}m", e)).unwrap_or_default();
                info!(
                    "Auto-assigned coords to {} ({:.1}s diff){}",
                    entry.filename,
                    time_delta.num_milliseconds() as f64 / 1000.0,
                    elevation_info
                );
            }
            MatchResult::DateMismatch => {
                summary.date_mismatch_count += 1;
                warn!("{}: date mismatch with GPX track", entry.filename);
            }
            MatchResult::TimeThresholdExceeded => {
                summary.time_threshold_count += 1;
                warn!(
                    "{}: time difference exceeds {}s threshold",
                    entry.filename, options.max_time_delta_secs
                );
            }
            MatchResult::NoMatch => {
                summary.no_match_count += 1;
                info!(
                    "{}: no matching GPX track point found (media date: {})",
                    entry.filename,
                    capture.instant.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }

    if summary.assigned_count > 0 {
        info!("Auto-assigned coordinates to {} media files from GPX track", summary.assigned_count);
    }
    if summary.date_mismatch_count > 0 {
        warn!(
            "{} media files excluded due to date mismatch with GPX track",
            summary.date_mismatch_count
        );
    }
    if summary.time_threshold_count > 0 {
        warn!(
            "{} media files excluded due to time difference exceeding {} second threshold",
            summary.time_threshold_count, options.max_time_delta_secs
        );
    }

    summary
}

/// Place a media entry by hand. Always overwrites earlier coordinates; the
/// elevation comes from the nearest track point within `threshold_m`.
pub fn assign_manual(entry: &mut MediaEntry, coord: Coordinate, track: Option<&Track>, threshold_m: f64) -> ElevationLookup {
    let lookup = find_nearest_elevation(coord, track, threshold_m);
    entry.coordinates = Some(coord);
    entry.elevation = lookup.elevation();

    info!(
        "Coordinates saved to \"{}\": {} ({})",
        entry.filename,
        coord,
        lookup.describe(threshold_m)
    );
    lookup
}
