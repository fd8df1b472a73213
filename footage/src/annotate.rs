use std::path::{Path, PathBuf};

use opencv::{core::{Mat, Point, Scalar, Size}, highgui::{destroy_all_windows, imshow, wait_key}, imgproc::{line, LINE_8}, prelude::*, videoio::VideoWriter};
use tracklog::TrackSet;

use crate::error::{FootageError, FootageResult};

pub const TRAIL_THICKNESS: i32 = 2;
const PREVIEW_WINDOW: &str = "Rat Tracking";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFlow {
    Continue,
    Stop,
}

/// Receives every tracked frame together with the tracks observed so far.
pub trait FrameSink {
    fn accept(&mut self, frame: &mut Mat, tracks: &TrackSet) -> FootageResult<SinkFlow>;
}

/// Drops frames.
pub struct Discard;

impl FrameSink for Discard {
    fn accept(&mut self, _frame: &mut Mat, _tracks: &TrackSet) -> FootageResult<SinkFlow> {
        Ok(SinkFlow::Continue)
    }
}

pub fn trail_color() -> Scalar {
    // blue in BGR
    Scalar::new(255.0, 0.0, 0.0, 0.0)
}

/// Connects consecutive points of every track with straight lines.
pub fn draw_trails(frame: &mut Mat, tracks: &TrackSet, color: Scalar, thickness: i32) -> FootageResult<()> {
    for (_, track) in tracks.iter() {
        for pair in track.points().windows(2) {
            let (a, b) = (pair[0].position, pair[1].position);
            line(frame, Point::new(a.x, a.y), Point::new(b.x, b.y), color, thickness, LINE_8, 0)?;
        }
    }
    Ok(())
}

/// Writes frames with their trails drawn in to a video file, optionally
/// showing them live. Pressing `q` in the preview stops the run.
pub struct TrailVideo {
    writer: VideoWriter,
    path: PathBuf,
    preview: bool,
    frames: u64,
}

impl TrailVideo {
    pub fn create(path: impl AsRef<Path>, fourcc: [char; 4], fps: f64, width: i32, height: i32) -> FootageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let [c1, c2, c3, c4] = fourcc;
        let code = VideoWriter::fourcc(c1, c2, c3, c4)?;
        let writer = VideoWriter::new(&path.to_string_lossy(), code, fps, Size::new(width, height), true)?;
        if !writer.is_opened()? {
            return Err(FootageError::CannotOpen(path.to_path_buf()));
        }

        log::info!("Writing {width}x{height} trail video at {fps:.2} fps to {}", path.display());
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            preview: false,
            frames: 0,
        })
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn finish(mut self) -> FootageResult<()> {
        self.writer.release()?;
        if self.preview {
            destroy_all_windows()?;
        }
        log::info!("Trail video saved to {} ({} frames)", self.path.display(), self.frames);
        Ok(())
    }
}

impl FrameSink for TrailVideo {
    fn accept(&mut self, frame: &mut Mat, tracks: &TrackSet) -> FootageResult<SinkFlow> {
        draw_trails(frame, tracks, trail_color(), TRAIL_THICKNESS)?;
        self.writer.write(&*frame)?;
        self.frames += 1;

        if self.preview {
            imshow(PREVIEW_WINDOW, &*frame)?;
            if wait_key(1)? & 0xFF == 'q' as i32 {
                log::info!("Stopped from the preview window");
                return Ok(SinkFlow::Stop);
            }
        }
        Ok(SinkFlow::Continue)
    }
}
