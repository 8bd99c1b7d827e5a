use chrono::{DateTime, TimeDelta, Utc};

/// Render a UTC instant as `dd/mm/yyyy HH:MM` in a fixed-offset zone.
pub fn format_wall_time(instant: DateTime<Utc>, offset_minutes: i32) -> String {
    (instant.naive_utc() + TimeDelta::minutes(i64::from(offset_minutes)))
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

/// Render a time range, dropping the repeated date when both ends share a day.
pub fn format_time_range(start: DateTime<Utc>, end: DateTime<Utc>, offset_minutes: i32) -> String {
    let start_str = format_wall_time(start, offset_minutes);
    let end_str = format_wall_time(end, offset_minutes);
    match (start_str.split_once(' '), end_str.split_once(' ')) {
        (Some((start_day, _)), Some((end_day, end_time))) if start_day == end_day => {
            format!("{} - {}", start_str, end_time)
        }
        _ => format!("{} - {}", start_str, end_str),
    }
}
