use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use log::{info, warn};
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{GeotagError, Result};
use crate::media::{MediaEntry, MediaKind};
use crate::track::spatial::round_half_up;
use crate::ThrottledProgress;

/// Stem of the optional overview image inside the archive.
pub const OVERVIEW_ENTRY_STEM: &str = "media_view_map";

/// Result of the archive phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveResult {
    /// Path of the written archive, `None` if nothing was exported
    pub path: Option<PathBuf>,
    pub files_written: u64,
    /// Per-file failures; the remaining files were still written
    pub failures: Vec<String>,
}

/// Archive filename for a given export day.
pub fn archive_name(day: NaiveDate) -> String {
    format!("noexif_geotagging_media_photos_{}.zip", day.format("%Y-%m-%d"))
}

/// `media_view_map.<ext>` with the overview file's own extension, png if it has none.
pub fn overview_entry_name(overview: &Path) -> String {
    let ext = overview
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
        .unwrap_or_else(|| "png".to_string());
    format!("{}.{}", OVERVIEW_ENTRY_STEM, ext)
}

/// Entry name carrying the position, e.g.
/// `noexif_media_IMG_1234___13.800000_47.600000___elev__812__.jpg`.
/// `None` for entries without coordinates.
pub fn geotagged_name(entry: &MediaEntry) -> Option<String> {
    let coords = entry.coordinates?;
    let path = Path::new(&entry.filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&entry.filename);

    let mut name = format!("noexif_media_{}___{:.6}_{:.6}___", stem, coords.lon, coords.lat);
    if let Some(elevation) = entry.elevation {
        name.push_str(&format!("elev__{}__", round_half_up(elevation)));
    }
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        name.push('.');
        name.push_str(&ext.to_lowercase());
    }
    Some(name)
}

/// Write every geotagged image into a zip under `output_dir`.
///
/// Image bytes are copied unmodified; the position only lives in the entry
/// name. Videos and images without coordinates are left out. A source that
/// cannot be read is reported and skipped. If no file could be written, no
/// archive is left behind.
pub fn write_archive(
    media: &[MediaEntry],
    output_dir: &Path,
    day: NaiveDate,
    overview: Option<&Path>,
    progress: &ThrottledProgress,
) -> Result<ArchiveResult> {
    let targets: Vec<&MediaEntry> = media
        .iter()
        .filter(|m| m.kind == MediaKind::Image && m.coordinates.is_some())
        .collect();

    if targets.is_empty() {
        warn!("No geotagged photos found. Please assign coordinates first.");
        return Ok(ArchiveResult::default());
    }

    fs::create_dir_all(output_dir)?;
    let final_path = output_dir.join(archive_name(day));
    let temp_path = output_dir.join(format!(".{}.tmp", archive_name(day)));

    let mut result = ArchiveResult::default();
    let written = write_entries(&temp_path, &targets, overview, progress, &mut result)
        .and_then(|()| {
            if result.files_written > 0 {
                fs::rename(&temp_path, &final_path)?;
            }
            Ok(())
        });

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if result.files_written == 0 {
        fs::remove_file(&temp_path)?;
        warn!("No files were successfully processed");
        return Ok(result);
    }

    info!(
        "Wrote {} geotagged photos to {}",
        result.files_written,
        final_path.display()
    );
    result.path = Some(final_path);
    Ok(result)
}

fn write_entries(
    temp_path: &Path,
    targets: &[&MediaEntry],
    overview: Option<&Path>,
    progress: &ThrottledProgress,
    result: &mut ArchiveResult,
) -> Result<()> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(temp_path)?));

    if let Some(overview) = overview {
        match fs::read(overview) {
            Ok(bytes) => {
                zip.start_file(overview_entry_name(overview), SimpleFileOptions::default())?;
                zip.write_all(&bytes)?;
            }
            Err(e) => {
                let msg = format!("{}: {}", overview.display(), e);
                warn!("Skipping overview image {}", msg);
                result.failures.push(msg);
            }
        }
    }

    // Collision handling needs the names assigned in order
    let mut name_counters: HashMap<String, u32> = HashMap::new();
    let mut used_names: HashSet<String> = HashSet::new();
    let total = targets.len() as u64;

    for (i, entry) in targets.iter().enumerate() {
        progress.report("archive", i as u64, total, &entry.filename);

        let Some(base) = geotagged_name(entry) else {
            continue;
        };

        let bytes = match fs::read(&entry.path) {
            Ok(bytes) => bytes,
            Err(source) => {
                let err = GeotagError::ReadFile {
                    path: entry.path.clone(),
                    source,
                };
                warn!("{}", err);
                result.failures.push(err.to_string());
                continue;
            }
        };

        let mut options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        if let Some(mtime) = entry.capture.and_then(|c| zip_time(c.wall_clock)) {
            options = options.last_modified_time(mtime);
        }

        let name = unique_name(&base, &mut name_counters, &used_names);
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&bytes)?;
        used_names.insert(name);
        result.files_written += 1;
    }

    zip.finish()?.flush()?;
    Ok(())
}

/// `name.jpg`, then `name(1).jpg`, `name(2).jpg`, ...
fn unique_name(base: &str, counters: &mut HashMap<String, u32>, used: &HashSet<String>) -> String {
    let counter = counters.entry(base.to_string()).or_insert(0);
    if *counter == 0 {
        *counter = 1;
        if !used.contains(base) {
            return base.to_string();
        }
    }

    let path = Path::new(base);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(base);
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    loop {
        let candidate = if ext.is_empty() {
            format!("{}({})", stem, counter)
        } else {
            format!("{}({}).{}", stem, counter, ext)
        };
        *counter += 1;
        if !used.contains(&candidate) {
            return candidate;
        }
    }
}

fn zip_time(wall: NaiveDateTime) -> Option<zip::DateTime> {
    zip::DateTime::from_date_and_time(
        u16::try_from(wall.year()).ok()?,
        wall.month() as u8,
        wall.day() as u8,
        wall.hour() as u8,
        wall.minute() as u8,
        wall.second() as u8,
    )
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date;
    use crate::media::Coordinate;
    use std::io::Read;
    use zip::ZipArchive;

    fn no_progress(_: &str, _: u64, _: u64, _: &str) {}

    fn quiet() -> ThrottledProgress<'static> {
        ThrottledProgress::new(&no_progress)
    }

    fn write_media(dir: &Path, name: &str, bytes: &[u8], kind: MediaKind) -> MediaEntry {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        let mut m = MediaEntry::new(path, name.to_string(), kind, bytes.len() as u64);
        m.capture = date::parse_with_info(name, date::DEFAULT_ASSUMED_OFFSET_MINUTES);
        m
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 20).unwrap()
    }

    #[test]
    fn test_geotagged_name() {
        let mut m = MediaEntry::new(PathBuf::from("IMG_1234.JPG"), "IMG_1234.JPG".into(), MediaKind::Image, 0);
        assert_eq!(geotagged_name(&m), None);

        m.coordinates = Some(Coordinate::new(13.8, 47.6));
        assert_eq!(
            geotagged_name(&m).unwrap(),
            "noexif_media_IMG_1234___13.800000_47.600000___.jpg"
        );

        m.elevation = Some(812.5);
        assert_eq!(
            geotagged_name(&m).unwrap(),
            "noexif_media_IMG_1234___13.800000_47.600000___elev__813__.jpg"
        );
    }

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name(day()), "noexif_geotagging_media_photos_2025-08-20.zip");
    }

    #[test]
    fn test_unique_name() {
        let mut counters = HashMap::new();
        let mut used = HashSet::new();
        for expected in ["a.jpg", "a(1).jpg", "a(2).jpg"] {
            let name = unique_name("a.jpg", &mut counters, &used);
            assert_eq!(name, expected);
            used.insert(name);
        }
    }

    #[test]
    fn test_unique_name_when_base_already_taken() {
        let mut counters = HashMap::new();
        let used: HashSet<String> = ["a.jpg".to_string()].into_iter().collect();
        assert_eq!(unique_name("a.jpg", &mut counters, &used), "a(1).jpg");
    }

    #[test]
    fn test_overview_entry_keeps_extension() {
        assert_eq!(overview_entry_name(Path::new("/tmp/map.JPG")), "media_view_map.jpg");
        assert_eq!(overview_entry_name(Path::new("map.png")), "media_view_map.png");
        assert_eq!(overview_entry_name(Path::new("map")), "media_view_map.png");
    }

    #[test]
    fn test_write_archive_copies_bytes_unmodified() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let mut tagged = write_media(src.path(), "IMG_20250804_132744.jpg", b"original jpeg bytes", MediaKind::Image);
        tagged.coordinates = Some(Coordinate::new(13.8, 47.6));
        tagged.elevation = Some(812.0);

        let untagged = write_media(src.path(), "IMG_0002.jpg", b"x", MediaKind::Image);
        let mut video = write_media(src.path(), "clip.mp4", b"video", MediaKind::Video);
        video.coordinates = Some(Coordinate::new(13.8, 47.6));

        let overview = src.path().join("overview.png");
        fs::write(&overview, b"png").unwrap();

        let result = write_archive(&[tagged, untagged, video], out.path(), day(), Some(&overview), &quiet()).unwrap();
        assert_eq!(result.files_written, 1);
        assert!(result.failures.is_empty());

        let path = result.path.unwrap();
        assert_eq!(path, out.path().join("noexif_geotagging_media_photos_2025-08-20.zip"));

        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "media_view_map.png".to_string(),
                "noexif_media_IMG_20250804_132744___13.800000_47.600000___elev__812__.jpg".to_string(),
            ]
        );

        let mut entry = archive
            .by_name("noexif_media_IMG_20250804_132744___13.800000_47.600000___elev__812__.jpg")
            .unwrap();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, b"original jpeg bytes");

        let mtime = entry.last_modified().unwrap();
        assert_eq!((mtime.year(), mtime.month(), mtime.day()), (2025, 8, 4));
        assert_eq!((mtime.hour(), mtime.minute()), (13, 27));
    }

    #[test]
    fn test_colliding_names_get_counter() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::create_dir(src.path().join("b")).unwrap();

        let mut a = write_media(src.path(), "IMG_1.jpg", b"a", MediaKind::Image);
        let mut b = write_media(&src.path().join("b"), "IMG_1.jpg", b"b", MediaKind::Image);
        a.coordinates = Some(Coordinate::new(1.0, 2.0));
        b.coordinates = Some(Coordinate::new(1.0, 2.0));

        let result = write_archive(&[a, b], out.path(), day(), None, &quiet()).unwrap();
        assert_eq!(result.files_written, 2);

        let archive = ZipArchive::new(File::open(result.path.unwrap()).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "noexif_media_IMG_1___1.000000_2.000000___(1).jpg",
                "noexif_media_IMG_1___1.000000_2.000000___.jpg",
            ]
        );
    }

    #[test]
    fn test_unreadable_file_is_reported_and_skipped() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let mut ok = write_media(src.path(), "ok.jpg", b"ok", MediaKind::Image);
        ok.coordinates = Some(Coordinate::new(1.0, 2.0));
        let mut gone = MediaEntry::new(src.path().join("gone.jpg"), "gone.jpg".into(), MediaKind::Image, 0);
        gone.coordinates = Some(Coordinate::new(1.0, 2.0));

        let result = write_archive(&[gone, ok], out.path(), day(), None, &quiet()).unwrap();
        assert_eq!(result.files_written, 1);
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].contains("gone.jpg"));
    }

    #[test]
    fn test_nothing_to_export_leaves_no_archive() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let untagged = write_media(src.path(), "a.jpg", b"a", MediaKind::Image);
        let result = write_archive(&[untagged], out.path(), day(), None, &quiet()).unwrap();
        assert!(result.path.is_none());

        let mut gone = MediaEntry::new(src.path().join("gone.jpg"), "gone.jpg".into(), MediaKind::Image, 0);
        gone.coordinates = Some(Coordinate::new(1.0, 2.0));
        let result = write_archive(&[gone], out.path(), day(), None, &quiet()).unwrap();
        assert!(result.path.is_none());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_source_that_opens_but_cannot_be_read() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        // A directory opens fine on unix but fails on read
        let folder = src.path().join("folder.jpg");
        fs::create_dir(&folder).unwrap();
        let mut broken = MediaEntry::new(folder, "folder.jpg".into(), MediaKind::Image, 0);
        broken.coordinates = Some(Coordinate::new(1.0, 2.0));
        let mut ok = write_media(src.path(), "ok.jpg", b"ok", MediaKind::Image);
        ok.coordinates = Some(Coordinate::new(1.0, 2.0));

        let result = write_archive(&[broken, ok], out.path(), day(), None, &quiet()).unwrap();
        assert_eq!(result.files_written, 1);
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].contains("folder.jpg"));

        let leftovers: Vec<String> = fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["noexif_geotagging_media_photos_2025-08-20.zip".to_string()]);
    }
}
