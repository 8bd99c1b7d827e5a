use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeotagError>;

#[derive(Debug, Error)]
pub enum GeotagError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse GPX: {0}")]
    Gpx(String),

    #[error("no tracks found in GPX file")]
    NoTracks,

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("media index {index} out of range ({len} entries)")]
    MediaIndex { index: usize, len: usize },

    #[error("no media file named {0:?}")]
    UnknownMedia(String),

    #[error("invalid manual assignment {0:?}, expected NAME=LON,LAT")]
    InvalidAssignment(String),

    #[error("coordinate out of range: lon {lon}, lat {lat}")]
    InvalidCoordinate { lon: f64, lat: f64 },
}
