use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date::ParsedDate;
use crate::error::GeotagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a file by its name, `None` for anything that is not media.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let mime = mime_guess::from_path(filename).first();
        match &mime {
            Some(m) if m.type_() == mime_guess::mime::IMAGE => Some(MediaKind::Image),
            Some(m) if m.type_() == mime_guess::mime::VIDEO => Some(MediaKind::Video),
            _ if filename.to_lowercase().ends_with(".mts") => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => f.write_str("image"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// WGS84 position, longitude first like the map widget reports it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Reject non-finite or out-of-range values.
    pub fn validated(lon: f64, lat: f64) -> Result<Self, GeotagError> {
        let ok = lon.is_finite() && lat.is_finite() && (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat);
        if ok {
            Ok(Self { lon, lat })
        } else {
            Err(GeotagError::InvalidCoordinate { lon, lat })
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lon, self.lat)
    }
}

/// A photo or video in the current session.
#[derive(Debug, Clone)]
pub struct MediaEntry {
    /// Just the filename
    pub filename: String,
    pub kind: MediaKind,
    /// Where the bytes live on disk
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    pub coordinates: Option<Coordinate>,
    /// Elevation in meters
    pub elevation: Option<f64>,
    /// Capture date parsed from the filename
    pub capture: Option<ParsedDate>,
}

impl MediaEntry {
    pub fn new(path: PathBuf, filename: String, kind: MediaKind, size: u64) -> Self {
        Self {
            filename,
            kind,
            path,
            size,
            coordinates: None,
            elevation: None,
            capture: None,
        }
    }

    /// Build an entry from a path, `None` if the file is not an image or video.
    pub fn from_path(path: &Path, size: u64) -> Option<Self> {
        let filename = path.file_name()?.to_str()?.to_string();
        let kind = MediaKind::from_filename(&filename)?;
        Some(Self::new(path.to_path_buf(), filename, kind, size))
    }

    pub fn has_coordinates(&self) -> bool {
        self.coordinates.is_some()
    }
}

/// A manual assignment given outside the map, `NAME=LON,LAT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualAssignment {
    pub filename: String,
    pub coordinate: Coordinate,
}

impl FromStr for ManualAssignment {
    type Err = GeotagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GeotagError::InvalidAssignment(s.to_string());
        let (name, coords) = s.rsplit_once('=').ok_or_else(invalid)?;
        let (lon, lat) = coords.split_once(',').ok_or_else(invalid)?;
        let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        if name.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            filename: name.to_string(),
            coordinate: Coordinate::validated(lon, lat)?,
        })
    }
}
