mod distance;
mod error;
mod ingest;
mod summary;
mod track;
mod writer;

pub use distance::{measure, track_distance, DistanceReport, PixelScale};
pub use error::{TrackLogError, TrackLogResult};
pub use ingest::{parse_track_log, read_track_log, TrackLog};
pub use summary::{summary_path_for, RunSummary};
pub use track::{Track, TrackId, TrackPoint, TrackSet};
pub use writer::{write_track_log, TrackLogWriter, LOG_HEADER};
