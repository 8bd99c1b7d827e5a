use std::io::Read;
use std::path::PathBuf;

use chrono::{DateTime, TimeDelta, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::assign::{self, AutoAssignSummary};
use crate::config::GeotagOptions;
use crate::date;
use crate::error::{GeotagError, Result};
use crate::ingest;
use crate::media::{Coordinate, MediaEntry, MediaKind};
use crate::track::{ElevationLookup, Track};

/// How a media entry got its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentSource {
    Manual(ElevationLookup),
    Auto { time_delta: TimeDelta },
}

/// Notifications for whatever renders the session (map, list, log).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MediaLoaded {
        total: usize,
        images: usize,
        videos: usize,
    },
    TrackLoaded {
        name: String,
        points: usize,
        time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    },
    CoordinatesAssigned {
        index: usize,
        filename: String,
        coordinate: Coordinate,
        elevation: Option<f64>,
        source: AssignmentSource,
    },
}

/// Type alias for event listeners
pub type EventCallback = dyn Fn(&SessionEvent) + Send + Sync;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaStats {
    pub total: usize,
    pub with_coordinates: usize,
    pub with_elevation: usize,
    pub images: usize,
    pub videos: usize,
}

/// Files from a `load_media` batch that did not make it into the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Files that are neither image nor video
    pub skipped: Vec<PathBuf>,
    /// Per-file read failures
    pub warnings: Vec<String>,
}

/// In-memory state of one geotagging session: the media list, the active
/// track and the options. Every mutation goes through `&mut self`.
pub struct Session {
    options: GeotagOptions,
    media: Vec<MediaEntry>,
    track: Option<Track>,
    listener: Option<Box<EventCallback>>,
}

impl Session {
    pub fn new(options: GeotagOptions) -> Self {
        Self {
            options,
            media: Vec::new(),
            track: None,
            listener: None,
        }
    }

    /// Register the single listener that receives session events.
    pub fn with_listener(mut self, listener: Box<EventCallback>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn options(&self) -> &GeotagOptions {
        &self.options
    }

    pub fn media(&self) -> &[MediaEntry] {
        &self.media
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    /// Index of the first entry with this filename.
    pub fn find_media(&self, filename: &str) -> Option<usize> {
        self.media.iter().position(|m| m.filename == filename)
    }

    /// Replace the media list with freshly ingested files, then auto-assign if
    /// a track is active.
    pub fn load_media(&mut self, paths: &[PathBuf]) -> (LoadReport, Option<AutoAssignSummary>) {
        let report = ingest::ingest_paths(paths, self.options.assumed_offset_minutes);
        self.media = report.media;
        let report = LoadReport {
            skipped: report.skipped,
            warnings: report.warnings,
        };

        let stats = self.stats();
        self.emit(&SessionEvent::MediaLoaded {
            total: stats.total,
            images: stats.images,
            videos: stats.videos,
        });

        if self.track.is_some() {
            info!("GPX track detected - triggering auto-matching for {} files", stats.total);
        }
        let summary = self.run_auto_matching_if_ready();
        (report, summary)
    }

    /// Replace the active track with one parsed from GPX, then auto-assign.
    ///
    /// On error the previously active track stays in place.
    pub fn load_track<R: Read>(&mut self, reader: R) -> Result<Option<AutoAssignSummary>> {
        let track = match Track::from_gpx_reader(reader) {
            Ok(track) => track,
            Err(e) => {
                warn!("Error loading GPX file: {}", e);
                return Err(e);
            }
        };
        Ok(self.set_track(track))
    }

    /// Make `track` the active track, then auto-assign.
    pub fn set_track(&mut self, track: Track) -> Option<AutoAssignSummary> {
        info!("GPX track loaded: {} ({} points)", track.name, track.points.len());
        let time_range = track.time_range();
        if let Some((first, last)) = time_range {
            info!(
                "Track time range: {}",
                date::format_time_range(first, last, self.options.assumed_offset_minutes)
            );
        }

        self.emit(&SessionEvent::TrackLoaded {
            name: track.name.clone(),
            points: track.points.len(),
            time_range,
        });
        self.track = Some(track);
        self.run_auto_matching_if_ready()
    }

    /// Place entry `index` at `coord` as if clicked on the map.
    pub fn assign_manual(&mut self, index: usize, coord: Coordinate) -> Result<ElevationLookup> {
        let len = self.media.len();
        let entry = self
            .media
            .get_mut(index)
            .ok_or(GeotagError::MediaIndex { index, len })?;

        let lookup = assign::assign_manual(entry, coord, self.track.as_ref(), self.options.elevation_threshold_m);
        let event = SessionEvent::CoordinatesAssigned {
            index,
            filename: entry.filename.clone(),
            coordinate: coord,
            elevation: entry.elevation,
            source: AssignmentSource::Manual(lookup.clone()),
        };
        self.emit(&event);
        Ok(lookup)
    }

    /// Run auto-assignment against the active track. `None` without a track.
    pub fn auto_assign(&mut self) -> Option<AutoAssignSummary> {
        let track = self.track.as_ref()?;
        let summary = assign::auto_assign(&mut self.media, track, &self.options.match_options());

        for assigned in &summary.assigned {
            let entry = &self.media[assigned.index];
            let Some(coordinate) = entry.coordinates else {
                continue;
            };
            let event = SessionEvent::CoordinatesAssigned {
                index: assigned.index,
                filename: entry.filename.clone(),
                coordinate,
                elevation: entry.elevation,
                source: AssignmentSource::Auto {
                    time_delta: TimeDelta::milliseconds(assigned.time_delta_ms),
                },
            };
            self.emit(&event);
        }

        Some(summary)
    }

    pub fn stats(&self) -> MediaStats {
        let images = self.media.iter().filter(|m| m.kind == MediaKind::Image).count();
        MediaStats {
            total: self.media.len(),
            with_coordinates: self.media.iter().filter(|m| m.coordinates.is_some()).count(),
            with_elevation: self.media.iter().filter(|m| m.elevation.is_some()).count(),
            images,
            videos: self.media.len() - images,
        }
    }

    fn run_auto_matching_if_ready(&mut self) -> Option<AutoAssignSummary> {
        if self.media.is_empty() {
            return None;
        }
        self.auto_assign()
    }

    fn emit(&self, event: &SessionEvent) {
        if let Some(listener) = &self.listener {
            listener(event);
        }
    }
}
