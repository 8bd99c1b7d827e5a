use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::TrackPoint;

/// Default maximum distance in time between a capture and its track point.
pub const DEFAULT_TIME_THRESHOLD_SECS: i64 = 60;

/// Tolerance policy for time matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Largest accepted delta; a delta exactly at the limit is accepted
    pub max_time_delta_secs: i64,
    /// Shift applied to the capture instant before taking its calendar day.
    /// Track points always use their UTC day. Zero compares both sides in UTC;
    /// any other value compares mixed zones and can split one instant across
    /// two days near midnight.
    pub media_day_offset_minutes: i32,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            max_time_delta_secs: DEFAULT_TIME_THRESHOLD_SECS,
            media_day_offset_minutes: 0,
        }
    }
}

/// Outcome of matching one capture instant against a track.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Success {
        point: TrackPoint,
        /// Absolute distance in time between capture and point
        time_delta: TimeDelta,
    },
    /// Reserved for reporting; [`find_closest_by_time`] reports other-day
    /// tracks as [`MatchResult::NoMatch`].
    DateMismatch,
    TimeThresholdExceeded,
    NoMatch,
}

impl MatchResult {
    pub fn time_delta_seconds(&self) -> Option<f64> {
        match self {
            MatchResult::Success { time_delta, .. } => Some(time_delta.num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

/// Find the track point closest in time to `capture`.
///
/// Only points on the capture's calendar day are candidates. The nearest one
/// is returned only if it is within the threshold; a nearest point beyond the
/// threshold is withheld. Ties go to the earliest point in the slice.
pub fn find_closest_by_time(capture: DateTime<Utc>, points: &[TrackPoint], options: &MatchOptions) -> MatchResult {
    let media_day = media_day(capture, options.media_day_offset_minutes);
    let capture_ms = capture.timestamp_millis();

    let mut closest: Option<(&TrackPoint, i64)> = None;

    for point in points {
        let Some(time) = point.time else {
            continue;
        };
        if time.date_naive() != media_day {
            continue;
        }

        let diff_ms = (capture_ms - time.timestamp_millis()).abs();
        match closest {
            Some((_, best)) if diff_ms >= best => {}
            _ => closest = Some((point, diff_ms)),
        }
    }

    let Some((point, diff_ms)) = closest else {
        return MatchResult::NoMatch;
    };

    if diff_ms > options.max_time_delta_secs.saturating_mul(1000) {
        return MatchResult::TimeThresholdExceeded;
    }

    MatchResult::Success {
        point: point.clone(),
        time_delta: TimeDelta::milliseconds(diff_ms),
    }
}

fn media_day(capture: DateTime<Utc>, offset_minutes: i32) -> NaiveDate {
    (capture.naive_utc() + TimeDelta::minutes(i64::from(offset_minutes))).date()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn point(lat: f64, lon: f64, time: &str) -> TrackPoint {
        TrackPoint {
            latitude: lat,
            longitude: lon,
            elevation: Some(812.0),
            time: Some(utc(time)),
        }
    }

    #[test]
    fn test_match_within_threshold() {
        let points = vec![point(47.6, 13.8, "2025-08-04T11:27:30Z")];
        let result = find_closest_by_time(utc("2025-08-04T11:27:00Z"), &points, &MatchOptions::default());
        match &result {
            MatchResult::Success { point, time_delta } => {
                assert_eq!(point.latitude, 47.6);
                assert_eq!(point.longitude, 13.8);
                assert_eq!(*time_delta, TimeDelta::seconds(30));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(result.time_delta_seconds(), Some(30.0));
    }

    #[test]
    fn test_picks_nearest_point() {
        let points = vec![
            point(1.0, 1.0, "2025-08-04T11:26:00Z"),
            point(2.0, 2.0, "2025-08-04T11:27:10Z"),
            point(3.0, 3.0, "2025-08-04T11:28:00Z"),
        ];
        let result = find_closest_by_time(utc("2025-08-04T11:27:00Z"), &points, &MatchOptions::default());
        assert!(matches!(result, MatchResult::Success { ref point, .. } if point.latitude == 2.0));
    }

    #[test]
    fn test_tie_goes_to_first_point() {
        let points = vec![
            point(1.0, 1.0, "2025-08-04T11:26:50Z"),
            point(2.0, 2.0, "2025-08-04T11:27:10Z"),
        ];
        let result = find_closest_by_time(utc("2025-08-04T11:27:00Z"), &points, &MatchOptions::default());
        assert!(matches!(result, MatchResult::Success { ref point, .. } if point.latitude == 1.0));
    }

    #[test]
    fn test_threshold_boundary() {
        let capture = utc("2025-08-04T11:27:00Z");
        let opts = MatchOptions::default();

        let at = vec![point(1.0, 1.0, "2025-08-04T11:28:00Z")];
        assert!(matches!(find_closest_by_time(capture, &at, &opts), MatchResult::Success { .. }));

        let over = vec![point(1.0, 1.0, "2025-08-04T11:28:00.001Z")];
        assert_eq!(find_closest_by_time(capture, &over, &opts), MatchResult::TimeThresholdExceeded);
    }

    #[test]
    fn test_other_day_points_never_match() {
        let capture = utc("2025-08-04T11:27:00Z");
        let points = vec![point(47.6, 13.8, "2025-08-03T11:27:00Z")];
        assert_eq!(find_closest_by_time(capture, &points, &MatchOptions::default()), MatchResult::NoMatch);

        // One second apart but across UTC midnight
        let capture = utc("2025-08-04T00:00:00Z");
        let points = vec![point(47.6, 13.8, "2025-08-03T23:59:59Z")];
        let opts = MatchOptions {
            max_time_delta_secs: 3600,
            ..MatchOptions::default()
        };
        assert_eq!(find_closest_by_time(capture, &points, &opts), MatchResult::NoMatch);
    }

    #[test]
    fn test_empty_and_untimed_tracks() {
        let capture = utc("2025-08-04T11:27:00Z");
        assert_eq!(find_closest_by_time(capture, &[], &MatchOptions::default()), MatchResult::NoMatch);

        let untimed = vec![TrackPoint {
            latitude: 1.0,
            longitude: 1.0,
            elevation: None,
            time: None,
        }];
        assert_eq!(find_closest_by_time(capture, &untimed, &MatchOptions::default()), MatchResult::NoMatch);
    }

    #[test]
    fn test_nearest_over_threshold_is_withheld() {
        let points = vec![point(1.0, 1.0, "2025-08-04T12:00:00Z")];
        let result = find_closest_by_time(utc("2025-08-04T11:27:00Z"), &points, &MatchOptions::default());
        assert_eq!(result, MatchResult::TimeThresholdExceeded);
        assert_eq!(result.time_delta_seconds(), None);
    }

    /// With a media day offset the capture's day is read in one zone and the
    /// track's in UTC, so the very same instant can be rejected near midnight.
    #[test]
    fn test_mixed_zone_day_comparison_splits_same_instant() {
        let instant = "2025-08-04T23:30:00Z";
        let points = vec![point(1.0, 1.0, instant)];

        let utc_days = MatchOptions::default();
        assert!(matches!(
            find_closest_by_time(utc(instant), &points, &utc_days),
            MatchResult::Success { .. }
        ));

        let mixed = MatchOptions {
            media_day_offset_minutes: 120,
            ..MatchOptions::default()
        };
        assert_eq!(find_closest_by_time(utc(instant), &points, &mixed), MatchResult::NoMatch);
    }
}
