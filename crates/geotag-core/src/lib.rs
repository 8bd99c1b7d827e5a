pub mod archive;
pub mod assign;
pub mod config;
pub mod date;
pub mod error;
pub mod ingest;
pub mod media;
pub mod session;
pub mod track;

use std::path::PathBuf;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub use assign::{AutoAssignSummary, AutoAssignment};
pub use config::GeotagOptions;
pub use error::GeotagError;
pub use media::{Coordinate, ManualAssignment, MediaEntry, MediaKind};
pub use session::{Session, SessionEvent};
pub use track::{ElevationLookup, MatchOptions, MatchResult, Track, TrackPoint};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Media files or directories to scan
    pub media_paths: Vec<PathBuf>,
    #[serde(default)]
    pub gpx: Option<PathBuf>,
    /// Applied before auto-assignment, so they are never overwritten by it
    #[serde(default)]
    pub manual: Vec<ManualAssignment>,
    /// Directory receiving the archive
    pub output: PathBuf,
    /// Pre-rendered overview image stored alongside the photos
    #[serde(default)]
    pub overview: Option<PathBuf>,
    /// Day used in the archive name, today when unset
    #[serde(default)]
    pub export_date: Option<NaiveDate>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub settings: GeotagOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessResult {
    pub total_media: u64,
    pub images: u64,
    pub videos: u64,
    pub with_coordinates: u64,
    pub with_elevation: u64,
    #[serde(default)]
    pub auto: Option<AutoAssignSummaryCounts>,
    pub files_written: u64,
    #[serde(default)]
    pub archive: Option<PathBuf>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Counters of the auto-assignment pass as reported in `ProcessResult`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoAssignSummaryCounts {
    pub assigned: u64,
    pub date_mismatch: u64,
    pub time_threshold: u64,
    pub no_match: u64,
}

impl From<&AutoAssignSummary> for AutoAssignSummaryCounts {
    fn from(s: &AutoAssignSummary) -> Self {
        Self {
            assigned: s.assigned_count,
            date_mismatch: s.date_mismatch_count,
            time_threshold: s.time_threshold_count,
            no_match: s.no_match_count,
        }
    }
}

/// Type alias for progress callback: (stage, current, total, message)
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

/// Throttled progress reporter, emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: std::sync::Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        Self {
            inner,
            last_emit: std::sync::Mutex::new(Instant::now() - std::time::Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let mut last = self.last_emit.lock().unwrap();
            if last.elapsed().as_millis() < 200 {
                return;
            }
            *last = Instant::now();
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Run the batch pipeline: ingest, load track, manual then auto assignment,
/// archive.
///
/// Per-file problems and a malformed GPX end up in `warnings`; only failing to
/// write the archive itself is an error.
pub fn process(options: &ProcessOptions, progress_callback: &ProgressCallback<'_>) -> anyhow::Result<ProcessResult> {
    let tp = ThrottledProgress::new(progress_callback);
    let settings = &options.settings;
    let mut warnings = Vec::new();

    // Stage 1: Ingest
    let paths = ingest::collect_media_paths(&options.media_paths);
    tp.report("scan", 0, 1, &format!("{} files found", paths.len()));
    let report = ingest::ingest_paths(&paths, settings.assumed_offset_minutes);
    warnings.extend(report.warnings);
    let mut media = report.media;

    if media.is_empty() {
        warn!("No photos or videos found");
        return Ok(ProcessResult {
            warnings,
            ..ProcessResult::default()
        });
    }

    // Stage 2: Track
    let track = match &options.gpx {
        Some(path) => match Track::from_gpx_path(path) {
            Ok(track) => {
                info!("GPX track loaded: {} ({} points)", track.name, track.points.len());
                if let Some((first, last)) = track.time_range() {
                    info!(
                        "Track time range: {}",
                        date::format_time_range(first, last, settings.assumed_offset_minutes)
                    );
                }
                Some(track)
            }
            Err(e) => {
                let msg = format!("{}: {}", path.display(), e);
                warn!("Error loading GPX file {}", msg);
                warnings.push(msg);
                None
            }
        },
        None => None,
    };

    // Stage 3: Manual assignments
    for manual in &options.manual {
        match media.iter().position(|m| m.filename == manual.filename) {
            Some(idx) => {
                assign::assign_manual(
                    &mut media[idx],
                    manual.coordinate,
                    track.as_ref(),
                    settings.elevation_threshold_m,
                );
            }
            None => {
                let err = GeotagError::UnknownMedia(manual.filename.clone());
                warn!("{}", err);
                warnings.push(err.to_string());
            }
        }
    }

    // Stage 4: Auto assignment
    let auto = track.as_ref().map(|t| {
        tp.report("match", 0, 1, &format!("Matching {} files against {}", media.len(), t.name));
        assign::auto_assign(&mut media, t, &settings.match_options())
    });

    // Stage 5: Archive
    let archive = if options.dry_run {
        info!("Dry run, no archive written");
        archive::ArchiveResult::default()
    } else {
        let day = options.export_date.unwrap_or_else(|| Local::now().date_naive());
        archive::write_archive(
            &media,
            &options.output,
            day,
            options.overview.as_deref(),
            &tp,
        )?
    };
    warnings.extend(archive.failures);

    let images = media.iter().filter(|m| m.kind == MediaKind::Image).count() as u64;
    Ok(ProcessResult {
        total_media: media.len() as u64,
        images,
        videos: media.len() as u64 - images,
        with_coordinates: media.iter().filter(|m| m.has_coordinates()).count() as u64,
        with_elevation: media.iter().filter(|m| m.elevation.is_some()).count() as u64,
        auto: auto.as_ref().map(AutoAssignSummaryCounts::from),
        files_written: archive.files_written,
        archive: archive.path,
        warnings,
    })
}
