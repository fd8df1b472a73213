mod error;
pub mod heatmap;
pub mod path;
pub mod utils;

pub use error::{FitError, VizError, VizResult};
pub use heatmap::{render_heatmap, render_track_heatmap, HeatmapConfig, IntensityField};
pub use path::{dedup_consecutive, plan_track_path, render_paths, PathPlot, PathPlotConfig, TrackPath};
