use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use footage::ImageFormat;

#[derive(Parser, Debug)]
#[command(name = "rat-trails", about = "Heatmaps, path plots and distances from animal track logs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render an occupancy heatmap of every logged position
    Heatmap {
        #[arg(long, value_name = "CSV")]
        log: PathBuf,
        #[arg(long, value_name = "IMAGE")]
        output: PathBuf,
        /// Video or still image to draw the heatmap over
        #[arg(long, value_name = "PATH")]
        background: Option<PathBuf>,
        #[arg(long, default_value_t = 1280)]
        width: i32,
        #[arg(long, default_value_t = 980)]
        height: i32,
        /// Radius of the disk deposited per point
        #[arg(long, default_value_t = 20)]
        radius: i32,
        /// Gaussian kernel size, odd
        #[arg(long, default_value_t = 31)]
        blur: i32,
        #[arg(long, default_value_t = 0.7)]
        opacity: f64,
        #[arg(long)]
        no_legend: bool,
        #[arg(long)]
        show: bool,
    },
    /// Plot the smoothed path of every track
    Paths {
        #[arg(long, value_name = "CSV")]
        log: PathBuf,
        #[arg(long, value_name = "IMAGE")]
        output: PathBuf,
        #[arg(long, default_value_t = 1280)]
        width: i32,
        #[arg(long, default_value_t = 980)]
        height: i32,
        /// Smoothing per point; 0 passes through every point
        #[arg(long, default_value_t = 0.5, conflicts_with = "raw")]
        smoothness: f64,
        /// Draw straight segments between logged points
        #[arg(long)]
        raw: bool,
        #[arg(long, default_value_t = 2)]
        thickness: i32,
        #[arg(long)]
        show: bool,
    },
    /// Total distance travelled per track, in real-world units
    Distance {
        #[arg(long, value_name = "CSV")]
        log: PathBuf,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 980)]
        height: u32,
        /// Arena width in `unit`
        #[arg(long, default_value_t = 30.0)]
        real_width: f64,
        /// Arena height in `unit`
        #[arg(long, default_value_t = 25.0)]
        real_height: f64,
        #[arg(long, default_value = "cm")]
        unit: String,
        /// Name of the recorded video, for the summary
        #[arg(long)]
        source: Option<String>,
        /// Defaults to `<log>.summary.txt`
        #[arg(long, value_name = "PATH")]
        summary: Option<PathBuf>,
    },
    /// Crop a video with ffmpeg
    Crop {
        #[arg(long, value_name = "VIDEO")]
        input: PathBuf,
        #[arg(long, value_name = "VIDEO")]
        output: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, default_value_t = 0)]
        x: u32,
        #[arg(long, default_value_t = 0)]
        y: u32,
        #[arg(long, default_value = "libx264")]
        codec: String,
        #[arg(long, default_value = "veryfast")]
        preset: String,
    },
    /// Replay a track log over its video, drawing the trails into a new video
    Trails(TrailsArgs),
    /// Split a video into numbered image files
    Frames {
        video: PathBuf,
        #[arg(long, short, default_value = "frames")]
        output: PathBuf,
        #[arg(long, short, default_value_t = ImageFormat::Png)]
        format: ImageFormat,
        /// Frames to skip between saves
        #[arg(long, short, default_value_t = 0)]
        skip: usize,
    },
}

#[derive(Args, Debug)]
pub struct TrailsArgs {
    #[arg(long, value_name = "VIDEO")]
    pub video: PathBuf,
    #[arg(long, value_name = "CSV")]
    pub log: PathBuf,
    #[arg(long, value_name = "VIDEO")]
    pub output: PathBuf,
    /// Four character codec code of the output video
    #[arg(long, default_value = "mp4v", value_parser = parse_fourcc)]
    pub fourcc: [char; 4],
    #[arg(long, default_value_t = 30.0)]
    pub real_width: f64,
    #[arg(long, default_value_t = 25.0)]
    pub real_height: f64,
    #[arg(long, default_value = "cm")]
    pub unit: String,
    /// Defaults to `<log>.summary.txt`
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,
    /// Show frames while processing, `q` stops early
    #[arg(long)]
    pub show: bool,
}

fn parse_fourcc(s: &str) -> Result<[char; 4], String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .try_into()
        .map_err(|_| format!("'{s}' is not a four character code"))
}
