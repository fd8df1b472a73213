mod field;
pub mod legend;

use nalgebra::{DMatrix, Vector2};
use opencv::{core::{add_weighted, Mat}, imgproc::{apply_color_map, COLORMAP_JET}};
use tracklog::TrackSet;

pub use field::IntensityField;

use crate::{error::{VizError, VizResult}, utils::{gray_to_mat, solid_canvas, to_bgr_canvas}};

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapConfig {
    pub width: i32,
    pub height: i32,
    // Main control for hotspot size
    pub disk_radius: i32,
    // Both dimensions odd
    pub blur_kernel: (i32, i32),
    // 0.0 shows only the background, 1.0 only the heat layer
    pub opacity: f64,
    pub legend: bool,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 980,
            disk_radius: 20,
            blur_kernel: (31, 31),
            opacity: 0.7,
            legend: true,
        }
    }
}

impl HeatmapConfig {
    pub fn validate(&self) -> VizResult<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(VizError::configuration("canvas", format!("{}x{} has no pixels", self.width, self.height)));
        }
        if self.disk_radius <= 0 {
            return Err(VizError::configuration("disk_radius", format!("{} must be positive", self.disk_radius)));
        }
        let (kw, kh) = self.blur_kernel;
        if kw <= 0 || kh <= 0 || kw % 2 == 0 || kh % 2 == 0 {
            return Err(VizError::configuration("blur_kernel", format!("{kw}x{kh} must be positive and odd")));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(VizError::configuration("opacity", format!("{} is outside [0, 1]", self.opacity)));
        }

        Ok(())
    }
}

/// Deposits one disk per point. Points off the canvas are skipped.
pub fn accumulate(points: &[Vector2<i32>], config: &HeatmapConfig) -> IntensityField {
    let mut field = IntensityField::new(config.width as usize, config.height as usize);
    let dropped = points
        .iter()
        .filter(|p| !field.deposit_disk(p, config.disk_radius))
        .count();

    if dropped > 0 {
        log::debug!("Dropped {dropped} points outside the {}x{} canvas", config.width, config.height);
    }

    field
}

pub fn colorize(normalized: &DMatrix<u8>) -> VizResult<Mat> {
    let gray = gray_to_mat(normalized)?;
    let mut colored = Mat::default();
    apply_color_map(&gray, &mut colored, COLORMAP_JET)?;
    Ok(colored)
}

/// Builds the heat layer for `points` and blends it over `background`.
///
/// Without a background the heat layer is blended over black.
pub fn render_heatmap(points: &[Vector2<i32>], config: &HeatmapConfig, background: Option<&Mat>) -> VizResult<Mat> {
    config.validate()?;

    log::info!("Generating heatmap from {} points", points.len());
    let field = accumulate(points, config).blurred(config.blur_kernel)?;
    let colored = colorize(&field.normalized())?;

    let background = match background {
        Some(bg) => to_bgr_canvas(bg, config.width, config.height)?,
        None => solid_canvas(config.width, config.height, [0, 0, 0])?,
    };

    let mut blended = Mat::default();
    add_weighted(&background, 1.0 - config.opacity, &colored, config.opacity, 0.0, &mut blended, -1)?;

    if config.legend {
        legend::draw_legend(&mut blended)?;
    }

    Ok(blended)
}

pub fn render_track_heatmap(tracks: &TrackSet, config: &HeatmapConfig, background: Option<&Mat>) -> VizResult<Mat> {
    render_heatmap(&tracks.all_positions(), config, background)
}
