use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use geotag_core::{GeotagOptions, ManualAssignment};

#[derive(Parser)]
#[command(name = "geotag", version, about = "Assign coordinates to photos and videos from filename dates and a GPX track")]
struct Cli {
    /// Media files or directories
    #[arg(required = true)]
    media: Vec<PathBuf>,

    /// GPX track used for auto-assignment and elevation lookup
    #[arg(long)]
    gpx: Option<PathBuf>,

    /// Manual position for one file, NAME=LON,LAT (repeatable)
    #[arg(long = "assign", value_name = "NAME=LON,LAT")]
    assign: Vec<ManualAssignment>,

    /// Output directory for the archive
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Overview image stored in the archive as media_view_map.<ext>
    #[arg(long)]
    overview: Option<PathBuf>,

    /// JSON file with matching options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Max seconds between capture time and track point
    #[arg(long)]
    time_threshold: Option<i64>,

    /// Max meters between a manual position and the track point lending elevation
    #[arg(long)]
    elevation_threshold: Option<f64>,

    /// Zone assumed for filename timestamps without one, minutes east of UTC
    #[arg(long, allow_hyphen_values = true)]
    assume_offset: Option<i32>,

    /// Zone for the capture side of the same-day check, minutes east of UTC
    #[arg(long, allow_hyphen_values = true)]
    media_day_offset: Option<i32>,

    /// Match and report without writing the archive
    #[arg(long)]
    dry_run: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<GeotagOptions> {
        let mut settings = match &self.config {
            Some(path) => GeotagOptions::load(path)?,
            None => GeotagOptions::default(),
        };
        if let Some(secs) = self.time_threshold {
            settings.time_threshold_secs = secs;
        }
        if let Some(meters) = self.elevation_threshold {
            settings.elevation_threshold_m = meters;
        }
        if let Some(minutes) = self.assume_offset {
            settings.assumed_offset_minutes = minutes;
        }
        if let Some(minutes) = self.media_day_offset {
            settings.media_day_offset_minutes = minutes;
        }
        Ok(settings)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let t_total = std::time::Instant::now();

    let options = geotag_core::ProcessOptions {
        settings: cli.settings()?,
        media_paths: cli.media,
        gpx: cli.gpx,
        manual: cli.assign,
        output: cli.output,
        overview: cli.overview,
        export_date: None,
        dry_run: cli.dry_run,
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );

    let result = geotag_core::process(&options, &|stage, current, total, message| {
        if stage != "archive" {
            pb.println(format!("[{}] {}", stage, message));
            return;
        }
        pb.set_length(total);
        pb.set_position(current + 1);
        pb.set_message(message.to_string());
    })?;
    pb.finish_and_clear();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    for warning in &result.warnings {
        eprintln!("Warning: {}", warning);
    }
    eprintln!(
        "Done! {} media files ({} images, {} videos), {} with coordinates, {} with elevation, {} files written ({:.2}s)",
        result.total_media,
        result.images,
        result.videos,
        result.with_coordinates,
        result.with_elevation,
        result.files_written,
        t_total.elapsed().as_secs_f64()
    );
    if let Some(path) = &result.archive {
        eprintln!("Archive: {}", path.display());
    }

    Ok(())
}
