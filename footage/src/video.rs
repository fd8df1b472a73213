use std::path::{Path, PathBuf};

use opencv::{core::Mat, imgcodecs::{imread, IMREAD_COLOR}, prelude::*, videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH}};

use crate::error::{FootageError, FootageResult};

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Anything that hands out frames in order.
pub trait FrameSource {
    /// `Ok(None)` once the stream is exhausted.
    fn next_frame(&mut self) -> FootageResult<Option<Mat>>;
}

pub struct VideoSource {
    capture: VideoCapture,
    path: PathBuf,
}

impl VideoSource {
    pub fn open(path: impl AsRef<Path>) -> FootageResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FootageError::MissingFile(path.to_path_buf()));
        }

        let capture = VideoCapture::from_file(&path.to_string_lossy(), CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(FootageError::CannotOpen(path.to_path_buf()));
        }

        let source = Self {
            capture,
            path: path.to_path_buf(),
        };
        log::debug!(
            "Opened {}: {}x{} at {:.2} fps, {} frames",
            path.display(),
            source.width(),
            source.height(),
            source.fps(),
            source.frame_count()
        );
        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn property(&self, prop: i32) -> f64 {
        self.capture.get(prop).unwrap_or(0.0)
    }

    pub fn width(&self) -> i32 {
        self.property(CAP_PROP_FRAME_WIDTH) as i32
    }

    pub fn height(&self) -> i32 {
        self.property(CAP_PROP_FRAME_HEIGHT) as i32
    }

    pub fn fps(&self) -> f64 {
        self.property(CAP_PROP_FPS)
    }

    /// As reported by the container, which may be an estimate.
    pub fn frame_count(&self) -> u64 {
        self.property(CAP_PROP_FRAME_COUNT).max(0.0) as u64
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> FootageResult<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.rows() == 0 || frame.cols() == 0 {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Loads a still image, or the first frame of a video, to draw a heatmap over.
///
/// Never fails: problems are logged and `None` is returned.
pub fn background_frame(path: impl AsRef<Path>) -> Option<Mat> {
    let path = path.as_ref();
    match load_background(path) {
        Ok(Some(frame)) => Some(frame),
        Ok(None) => {
            log::warn!("No frame could be read from {}, using a black background", path.display());
            None
        }
        Err(e) => {
            log::warn!("Could not load background {}: {e}", path.display());
            None
        }
    }
}

fn load_background(path: &Path) -> FootageResult<Option<Mat>> {
    if !path.exists() {
        return Err(FootageError::MissingFile(path.to_path_buf()));
    }

    if is_image_path(path) {
        let img = imread(&path.to_string_lossy(), IMREAD_COLOR)?;
        if img.rows() == 0 || img.cols() == 0 {
            return Ok(None);
        }
        return Ok(Some(img));
    }

    VideoSource::open(path)?.next_frame()
}

/// Hands out solid 8x8 frames, frame `i` filled with value `i`.
#[cfg(test)]
pub(crate) struct QueuedFrames(std::collections::VecDeque<Mat>);

#[cfg(test)]
impl QueuedFrames {
    pub(crate) fn new(count: usize) -> Self {
        use opencv::core::{Scalar, CV_8UC3};

        Self((0..count)
            .map(|i| Mat::new_rows_cols_with_default(8, 8, CV_8UC3, Scalar::all(i as f64)).unwrap())
            .collect())
    }
}

#[cfg(test)]
impl FrameSource for QueuedFrames {
    fn next_frame(&mut self) -> FootageResult<Option<Mat>> {
        Ok(self.0.pop_front())
    }
}
