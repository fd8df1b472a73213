mod annotate;
mod crop;
mod error;
mod frames;
mod tracking;
mod video;

pub use annotate::{draw_trails, trail_color, Discard, FrameSink, SinkFlow, TrailVideo, TRAIL_THICKNESS};
pub use crop::{run_streaming, CropGeometry, CropJob};
pub use error::{FootageError, FootageResult, TrackerError};
pub use frames::{extract_frames, frame_file_name, ExtractReport, ImageFormat};
pub use tracking::{record_observations, Detection, Recording, ReplayTracker, Tracker};
pub use video::{background_frame, FrameSource, VideoSource};
