use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::date;
use crate::media::{MediaEntry, MediaKind};

/// Result of ingesting a batch of files.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub media: Vec<MediaEntry>,
    /// Files that are neither image nor video
    pub skipped: Vec<PathBuf>,
    /// Per-file read failures; the rest of the batch still loads
    pub warnings: Vec<String>,
}

/// Expand directories (recursively) into the files they contain.
/// Plain file arguments are kept as given; directory contents are sorted.
pub fn collect_media_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            collect_recursive(input, &mut found);
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}

fn collect_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        warn!("Cannot read directory {}", dir.display());
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files);
        } else {
            files.push(path);
        }
    }
}

/// Turn paths into media entries with capture dates parsed from their names.
pub fn ingest_paths(paths: &[PathBuf], assumed_offset_minutes: i32) -> IngestReport {
    let mut report = IngestReport::default();

    for path in paths {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();

        if filename.is_empty() || MediaKind::from_filename(&filename).is_none() {
            report.skipped.push(path.clone());
            continue;
        }

        let size = match fs::metadata(path) {
            Ok(meta) if !meta.is_file() => {
                report.skipped.push(path.clone());
                continue;
            }
            Ok(meta) => meta.len(),
            Err(e) => {
                let msg = format!("{}: {}", path.display(), e);
                warn!("Failed to read {}", msg);
                report.warnings.push(msg);
                continue;
            }
        };

        let Some(mut entry) = MediaEntry::from_path(path, size) else {
            report.skipped.push(path.clone());
            continue;
        };

        entry.capture = date::parse_with_info(&entry.filename, assumed_offset_minutes);
        match &entry.capture {
            Some(parsed) => info!(
                "{}: date found from filename - {}",
                entry.filename,
                parsed.instant.format("%Y-%m-%d %H:%M:%S")
            ),
            None => info!(
                "{}: no date found - will be available for manual coordinate assignment only",
                entry.filename
            ),
        }

        report.media.push(entry);
    }

    let images = report.media.iter().filter(|m| m.kind == MediaKind::Image).count();
    info!(
        "Loaded {} files ({} images, {} videos)",
        report.media.len(),
        images,
        report.media.len() - images
    );

    report
}
