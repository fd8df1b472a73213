mod cli;

use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{Cli, Command, TrailsArgs};
use footage::{background_frame, extract_frames, record_observations, CropGeometry, CropJob, ImageFormat, ReplayTracker, TrailVideo, VideoSource};
use opencv::{core::{Mat, Vector}, highgui::{destroy_all_windows, imshow, wait_key}, imgcodecs::imwrite};
use tracklog::{measure, read_track_log, summary_path_for, PixelScale, RunSummary, TrackLog, TrackLogWriter};
use trailviz::{render_paths, render_track_heatmap, HeatmapConfig, PathPlotConfig};

const DEFAULT_FPS: f64 = 30.0;

fn main() -> anyhow::Result<()> {
    setup_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Heatmap { log, output, background, width, height, radius, blur, opacity, no_legend, show } => {
            let config = HeatmapConfig {
                width,
                height,
                disk_radius: radius,
                blur_kernel: (blur, blur),
                opacity,
                legend: !no_legend,
            };
            heatmap(&log, &output, background.as_deref(), &config, show)
        }
        Command::Paths { log, output, width, height, smoothness, raw, thickness, show } => {
            let config = PathPlotConfig {
                width,
                height,
                smoothness: if raw { None } else { Some(smoothness) },
                thickness,
                ..Default::default()
            };
            paths(&log, &output, &config, show)
        }
        Command::Distance { log, width, height, real_width, real_height, unit, source, summary } => {
            let scale = PixelScale::new(width, height, real_width, real_height)?;
            distance(&log, &scale, &unit, source, summary.as_deref())
        }
        Command::Crop { input, output, width, height, x, y, codec, preset } => {
            let job = CropJob::new(&input, &output, CropGeometry { width, height, x, y })
                .codec(codec)
                .preset(preset);
            job.run(|line| eprintln!("{line}"))
                .with_context(|| format!("Failed to crop {}", input.display()))
        }
        Command::Trails(args) => trails(&args),
        Command::Frames { video, output, format, skip } => frames(&video, &output, format, skip),
    }
}

fn setup_logging() {
    simple_log::quick!();
}

/// `None` when the log holds no rows, which is not an error.
fn load_log(path: &Path) -> anyhow::Result<Option<TrackLog>> {
    let log = read_track_log(path).with_context(|| format!("Failed to read track log {}", path.display()))?;
    if !log.has_data() {
        log::warn!("No data found in {}, nothing to do", path.display());
        return Ok(None);
    }
    Ok(Some(log))
}

fn heatmap(log_path: &Path, output: &Path, background: Option<&Path>, config: &HeatmapConfig, show: bool) -> anyhow::Result<()> {
    let Some(log) = load_log(log_path)? else {
        return Ok(());
    };

    let background = background.and_then(background_frame);
    let img = render_track_heatmap(&log.tracks, config, background.as_ref())?;

    save_image(output, &img)?;
    log::info!("Heatmap saved to {}", output.display());
    if show {
        show_image("Rat Movement Heatmap", &img)?;
    }
    Ok(())
}

fn paths(log_path: &Path, output: &Path, config: &PathPlotConfig, show: bool) -> anyhow::Result<()> {
    let Some(log) = load_log(log_path)? else {
        return Ok(());
    };

    let plot = render_paths(&log.tracks, config)?;
    for (track_id, error) in &plot.fallbacks {
        log::warn!("Track {track_id} was drawn unsmoothed: {error}");
    }

    save_image(output, &plot.canvas)?;
    log::info!("Path plot saved to {}", output.display());
    if show {
        show_image("Rat Path", &plot.canvas)?;
    }
    Ok(())
}

fn distance(log_path: &Path, scale: &PixelScale, unit: &str, source: Option<String>, summary: Option<&Path>) -> anyhow::Result<()> {
    let Some(log) = load_log(log_path)? else {
        return Ok(());
    };

    let report = measure(&log.tracks, scale);
    for (track_id, d) in &report.per_track {
        println!("Track {track_id}: {d:.2} {unit}");
    }
    println!("Total: {:.2} {unit}", report.total);

    let summary_path = summary.map(Path::to_path_buf).unwrap_or_else(|| summary_path_for(log_path));
    let summary = RunSummary {
        source: source.unwrap_or_else(|| log_path.display().to_string()),
        frames: log.tracks.last_frame().unwrap_or(0),
        total_distance: report.total,
        unit: unit.to_string(),
    };
    write_summary(&summary, &summary_path)
}

fn trails(args: &TrailsArgs) -> anyhow::Result<()> {
    let Some(log) = load_log(&args.log)? else {
        return Ok(());
    };

    let mut source = VideoSource::open(&args.video).with_context(|| format!("Failed to open video {}", args.video.display()))?;
    let (width, height) = (source.width(), source.height());
    let fps = if source.fps() > 0.0 { source.fps() } else { DEFAULT_FPS };
    let mut video = TrailVideo::create(&args.output, args.fourcc, fps, width, height)
        .with_context(|| format!("Failed to create video {}", args.output.display()))?
        .with_preview(args.show);

    // observations are already logged, the replayed copy is not kept
    let mut replayed = TrackLogWriter::new(std::io::sink())?;
    let recording = record_observations(&mut source, &mut ReplayTracker::new(&log.tracks), &mut replayed, &mut video)?;
    video.finish()?;

    let scale = PixelScale::new(width.max(0) as u32, height.max(0) as u32, args.real_width, args.real_height)?;
    let name = args
        .video
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| args.video.display().to_string());
    let summary = recording.summarize(name, &scale, args.unit.as_str());
    println!("Total distance traveled: {:.2} {}", summary.total_distance, summary.unit);

    let summary_path = args.summary.clone().unwrap_or_else(|| summary_path_for(&args.log));
    write_summary(&summary, &summary_path)
}

fn write_summary(summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    create_parent_dir(path)?;
    summary
        .write(path)
        .with_context(|| format!("Failed to write summary {}", path.display()))?;
    log::info!("Summary saved to {}", path.display());
    Ok(())
}

fn frames(video: &Path, output: &Path, format: ImageFormat, skip: usize) -> anyhow::Result<()> {
    let mut source = VideoSource::open(video).with_context(|| format!("Failed to open video {}", video.display()))?;
    log::info!(
        "Video info: total frames = {}, fps = {:.2}",
        source.frame_count(),
        source.fps()
    );

    let report = extract_frames(&mut source, output, format, skip)?;
    println!("Total frames read: {}", report.read);
    println!("Frames saved ({format}): {}", report.saved);
    println!("Output folder: {}", output.display());
    Ok(())
}

fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

fn save_image(path: &Path, img: &Mat) -> anyhow::Result<()> {
    create_parent_dir(path)?;
    let written = imwrite(&path.to_string_lossy(), img, &Vector::new())
        .with_context(|| format!("Failed to encode {}", path.display()))?;
    if !written {
        bail!("Could not write image to {}", path.display());
    }
    Ok(())
}

fn show_image(title: &str, img: &Mat) -> anyhow::Result<()> {
    imshow(title, img)?;
    wait_key(0)?;
    destroy_all_windows()?;
    Ok(())
}
