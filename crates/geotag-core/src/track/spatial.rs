use serde::Serialize;

use super::{Track, TrackPoint};
use crate::media::Coordinate;

/// Default distance (meters) within which a track point lends its elevation.
pub const DEFAULT_ELEVATION_THRESHOLD_M: f64 = 5.0;

/// Rough meters per degree. Planar, only trustworthy for a few meters.
const METERS_PER_DEGREE: f64 = 111_000.0;

/// Outcome of looking up elevation for a manually placed coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ElevationLookup {
    Found {
        /// Elevation of the nearest point, which may itself be unknown
        elevation: Option<f64>,
        distance_m: f64,
        point: TrackPoint,
    },
    NoTrack,
    NoPoints,
    ThresholdExceeded {
        distance_m: f64,
        nearest: TrackPoint,
    },
    NoValidPoints,
}

impl ElevationLookup {
    /// Elevation to store on the media entry.
    pub fn elevation(&self) -> Option<f64> {
        match self {
            ElevationLookup::Found { elevation, .. } => *elevation,
            _ => None,
        }
    }

    /// Short human-readable explanation for the activity log.
    pub fn describe(&self, threshold_m: f64) -> String {
        match self {
            ElevationLookup::Found {
                elevation: Some(e),
                distance_m,
                ..
            } => format!("elevation: {}m from {:.1}m away", round_half_up(*e), distance_m),
            ElevationLookup::Found { distance_m, .. } => {
                format!("nearest GPX point {:.1}m away has no elevation", distance_m)
            }
            ElevationLookup::NoTrack => "no GPX track loaded".to_string(),
            ElevationLookup::NoPoints => "GPX track has no points".to_string(),
            ElevationLookup::ThresholdExceeded { distance_m, .. } => format!(
                "nearest GPX point: {:.1}m away, exceeds {}m threshold",
                distance_m, threshold_m
            ),
            ElevationLookup::NoValidPoints => "no elevation data available".to_string(),
        }
    }
}

/// Find the track point nearest to `coord` and take its elevation if it lies
/// within `threshold_m`.
///
/// Distance is Euclidean in degree space scaled by a fixed factor, not
/// geodesic. The first point at the minimum distance wins.
pub fn find_nearest_elevation(coord: Coordinate, track: Option<&Track>, threshold_m: f64) -> ElevationLookup {
    let Some(track) = track else {
        return ElevationLookup::NoTrack;
    };
    if track.points.is_empty() {
        return ElevationLookup::NoPoints;
    }

    let mut nearest: Option<&TrackPoint> = None;
    let mut smallest = f64::INFINITY;

    for point in &track.points {
        if !point.latitude.is_finite() || !point.longitude.is_finite() {
            continue;
        }
        let dlat = coord.lat - point.latitude;
        let dlon = coord.lon - point.longitude;
        let distance = (dlat * dlat + dlon * dlon).sqrt();
        if distance < smallest {
            smallest = distance;
            nearest = Some(point);
        }
    }

    let Some(nearest) = nearest else {
        return ElevationLookup::NoValidPoints;
    };

    let distance_m = smallest * METERS_PER_DEGREE;
    if distance_m <= threshold_m {
        ElevationLookup::Found {
            elevation: nearest.elevation,
            distance_m,
            point: nearest.clone(),
        }
    } else {
        ElevationLookup::ThresholdExceeded {
            distance_m,
            nearest: nearest.clone(),
        }
    }
}

/// Round to the nearest meter, halves towards positive infinity.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64, elevation: Option<f64>) -> TrackPoint {
        TrackPoint {
            latitude: lat,
            longitude: lon,
            elevation,
            time: None,
        }
    }

    fn track(points: Vec<TrackPoint>) -> Track {
        Track::new("t", vec![points])
    }

    #[test]
    fn test_found_within_threshold() {
        let t = track(vec![point(47.6, 13.8, Some(812.0)), point(47.7, 13.9, Some(900.0))]);
        // 0.00003 degrees north is 3.33 m
        let result = find_nearest_elevation(Coordinate::new(13.8, 47.60003), Some(&t), 5.0);
        match result {
            ElevationLookup::Found {
                elevation,
                distance_m,
                ..
            } => {
                assert_eq!(elevation, Some(812.0));
                assert!((distance_m - 3.33).abs() < 0.01);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_eight_meters_exceeds_five_meter_threshold() {
        let t = track(vec![point(47.6, 13.8, Some(812.0))]);
        // 8 m / 111000 m per degree
        let lat = 47.6 + 8.0 / 111_000.0;
        let result = find_nearest_elevation(Coordinate::new(13.8, lat), Some(&t), 5.0);
        match &result {
            ElevationLookup::ThresholdExceeded { distance_m, nearest } => {
                assert!((distance_m - 8.0).abs() < 1e-6);
                assert_eq!(nearest.elevation, Some(812.0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(result.elevation(), None);
    }

    #[test]
    fn test_found_point_without_elevation() {
        let t = track(vec![point(47.6, 13.8, None)]);
        let result = find_nearest_elevation(Coordinate::new(13.8, 47.6), Some(&t), 5.0);
        assert!(matches!(result, ElevationLookup::Found { elevation: None, .. }));
        assert_eq!(result.elevation(), None);
    }

    #[test]
    fn test_first_of_equidistant_points_wins() {
        let t = track(vec![point(1.0, 0.0, Some(1.0)), point(-1.0, 0.0, Some(2.0))]);
        let result = find_nearest_elevation(Coordinate::new(0.0, 0.0), Some(&t), f64::MAX);
        assert_eq!(result.elevation(), Some(1.0));
    }

    #[test]
    fn test_no_data_variants() {
        let coord = Coordinate::new(13.8, 47.6);
        assert_eq!(find_nearest_elevation(coord, None, 5.0), ElevationLookup::NoTrack);

        let empty = track(vec![]);
        assert_eq!(find_nearest_elevation(coord, Some(&empty), 5.0), ElevationLookup::NoPoints);

        let invalid = track(vec![point(f64::NAN, 13.8, Some(1.0))]);
        assert_eq!(find_nearest_elevation(coord, Some(&invalid), 5.0), ElevationLookup::NoValidPoints);
    }

    #[test]
    fn test_describe() {
        let t = track(vec![point(47.6, 13.8, Some(812.4))]);
        let found = find_nearest_elevation(Coordinate::new(13.8, 47.6), Some(&t), 5.0);
        assert_eq!(found.describe(5.0), "elevation: 812m from 0.0m away");
        assert_eq!(ElevationLookup::NoTrack.describe(5.0), "no GPX track loaded");
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(812.5), 813);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.6), -3);
    }
}
