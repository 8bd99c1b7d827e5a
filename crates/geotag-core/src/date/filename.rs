use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use regex::{Captures, Regex};
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

/// Offset assumed for wall-clock timestamps without a zone (CEST).
pub const DEFAULT_ASSUMED_OFFSET_MINUTES: i32 = 120;

/// Timezone tokens are clamped to this range.
const MAX_ZONE_OFFSET_MINUTES: i32 = 14 * 60;

const MIN_YEAR: i32 = 1970;
const MAX_YEAR: i32 = 2100;

/// Which filename convention produced a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    IsoWithZone,
    IsoSeparated,
    CompactSeconds,
    CompactMinutes,
    DateOnly,
}

/// A capture instant recovered from a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParsedDate {
    /// The capture instant in UTC
    pub instant: DateTime<Utc>,
    /// Wall clock exactly as written in the filename
    pub wall_clock: NaiveDateTime,
    /// Offset (minutes east of UTC) used to turn the wall clock into `instant`
    pub offset_minutes: i32,
    pub pattern: PatternKind,
}

impl ParsedDate {
    /// Wall-clock label as written in the filename: `dd/mm/yyyy HH:MM`, or
    /// `dd/mm/yyyy` for date-only names.
    pub fn wall_clock_label(&self) -> String {
        match self.pattern {
            PatternKind::DateOnly => self.wall_clock.format("%d/%m/%Y").to_string(),
            _ => self.wall_clock.format("%d/%m/%Y %H:%M").to_string(),
        }
    }
}

type Extractor = fn(&Captures, i32) -> Option<ParsedDate>;

struct FilenamePattern {
    regex: &'static LazyLock<Regex>,
    extract: Extractor,
}

// Digit and word classes are ASCII-only. The regex crate has no lookahead, so
// "not followed by a digit" is spelled `(?:[^0-9]|$)`. Only the capture groups
// are read, never the match end.
static RE_ISO_ZONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})[-_.]?([0-9]{2})[-_.]?([0-9]{2})[Tt_ .-]?([0-9]{2})[:._-]?([0-9]{2})(?:[:._-]?([0-9]{2}))?\s*(Z|[+-][0-9]{2}(?::?[0-9]{2})?)").unwrap()
});
static RE_ISO_SEPARATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})[-_.]([0-9]{2})[-_.]([0-9]{2})[Tt_ .-]([0-9]{2})[:._-]([0-9]{2})(?:[:._-]([0-9]{2}))?(?-u:\b)").unwrap()
});
static RE_COMPACT_SECONDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})([0-9]{2})([0-9]{2})[_-]?([0-9]{2})([0-9]{2})([0-9]{2})(?:[^0-9]|$)").unwrap()
});
static RE_COMPACT_MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4})([0-9]{2})([0-9]{2})[_-]?([0-9]{2})([0-9]{2})(?:[^0-9]|$)").unwrap());
static RE_DATE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4})[-_.]?([0-9]{2})[-_.]?([0-9]{2})(?-u:\b)").unwrap());
static RE_ZONE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])([0-9]{2})(?::?([0-9]{2}))?$").unwrap());

/// Most specific first. The first pattern that matches decides the outcome.
static PATTERNS: &[FilenamePattern] = &[
    FilenamePattern { regex: &RE_ISO_ZONE, extract: extract_iso_zone },
    FilenamePattern { regex: &RE_ISO_SEPARATED, extract: extract_iso_separated },
    FilenamePattern { regex: &RE_COMPACT_SECONDS, extract: extract_compact_seconds },
    FilenamePattern { regex: &RE_COMPACT_MINUTES, extract: extract_compact_minutes },
    FilenamePattern { regex: &RE_DATE_ONLY, extract: extract_date_only },
];

/// Parse the capture instant out of a filename.
pub fn parse(filename: &str, assumed_offset_minutes: i32) -> Option<DateTime<Utc>> {
    parse_with_info(filename, assumed_offset_minutes).map(|p| p.instant)
}

/// Like [`parse`], but also reports which pattern matched and the offset used.
///
/// Once a pattern matches syntactically its verdict is final: a date that
/// fails validation yields `None` instead of falling through to a less
/// specific pattern.
pub fn parse_with_info(filename: &str, assumed_offset_minutes: i32) -> Option<ParsedDate> {
    let basename = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    for pat in PATTERNS {
        if let Some(caps) = pat.regex.captures(basename) {
            return (pat.extract)(&caps, assumed_offset_minutes);
        }
    }

    None
}

fn extract_iso_zone(caps: &Captures, _assumed: i32) -> Option<ParsedDate> {
    let (year, month, day) = ymd(caps)?;
    let offset = parse_zone_offset(caps.get(7)?.as_str())?;
    let wall = wall_clock(year, month, day, field(caps, 4)?, field(caps, 5)?, field_or_zero(caps, 6)?)?;
    Some(finish(wall, offset, PatternKind::IsoWithZone))
}

fn extract_iso_separated(caps: &Captures, assumed: i32) -> Option<ParsedDate> {
    let (year, month, day) = ymd(caps)?;
    let wall = wall_clock(year, month, day, field(caps, 4)?, field(caps, 5)?, field_or_zero(caps, 6)?)?;
    Some(finish(wall, assumed, PatternKind::IsoSeparated))
}

fn extract_compact_seconds(caps: &Captures, assumed: i32) -> Option<ParsedDate> {
    let (year, month, day) = ymd(caps)?;
    let wall = wall_clock(year, month, day, field(caps, 4)?, field(caps, 5)?, field(caps, 6)?)?;
    Some(finish(wall, assumed, PatternKind::CompactSeconds))
}

fn extract_compact_minutes(caps: &Captures, assumed: i32) -> Option<ParsedDate> {
    let (year, month, day) = ymd(caps)?;
    let wall = wall_clock(year, month, day, field(caps, 4)?, field(caps, 5)?, 0)?;
    Some(finish(wall, assumed, PatternKind::CompactMinutes))
}

fn extract_date_only(caps: &Captures, assumed: i32) -> Option<ParsedDate> {
    let (year, month, day) = ymd(caps)?;
    let wall = wall_clock(year, month, day, 0, 0, 0)?;
    Some(finish(wall, assumed, PatternKind::DateOnly))
}

fn finish(wall: NaiveDateTime, offset_minutes: i32, pattern: PatternKind) -> ParsedDate {
    let instant = Utc.from_utc_datetime(&wall) - TimeDelta::minutes(i64::from(offset_minutes));
    ParsedDate {
        instant,
        wall_clock: wall,
        offset_minutes,
        pattern,
    }
}

fn field(caps: &Captures, i: usize) -> Option<u32> {
    caps.get(i)?.as_str().parse().ok()
}

fn field_or_zero(caps: &Captures, i: usize) -> Option<u32> {
    match caps.get(i) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

fn ymd(caps: &Captures) -> Option<(i32, u32, u32)> {
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month = field(caps, 2)?;
    let day = field(caps, 3)?;
    is_valid_ymd(year, month, day).then_some((year, month, day))
}

fn is_valid_ymd(year: i32, month: u32, day: u32) -> bool {
    (1..=12).contains(&month) && (1..=31).contains(&day) && (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// Builds the wall clock with calendar rollover: day 31 of a 30-day month is
/// the 1st of the next month, hour 24 is midnight of the next day.
fn wall_clock(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Option<NaiveDateTime> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(u64::from(day - 1)))?;
    let secs = i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second);
    date.and_hms_opt(0, 0, 0)?.checked_add_signed(TimeDelta::seconds(secs))
}

/// `Z`, `+02`, `+0200`, `+02:00`, `-0530` ... to minutes east of UTC.
fn parse_zone_offset(token: &str) -> Option<i32> {
    if token.eq_ignore_ascii_case("z") {
        return Some(0);
    }
    let caps = RE_ZONE_TOKEN.captures(token)?;
    let sign = if &caps[1] == "+" { 1 } else { -1 };
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    Some((sign * (hours * 60 + minutes)).clamp(-MAX_ZONE_OFFSET_MINUTES, MAX_ZONE_OFFSET_MINUTES))
}
