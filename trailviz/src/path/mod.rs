mod banded;
pub mod spline;

use itertools::Itertools;
use nalgebra::Vector2;
use opencv::{core::{Mat, Point, Vector}, imgproc::{line, polylines, LINE_8}};
use tracklog::{TrackId, TrackSet};

use spline::SmoothingSpline;

use crate::{error::{FitError, VizError, VizResult}, utils::{bgr_scalar, solid_canvas}};

// A cubic fit needs at least degree + 1 points
pub const MIN_SPLINE_POINTS: usize = spline::DEGREE + 1;
pub const SAMPLES_PER_POINT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct PathPlotConfig {
    pub width: i32,
    pub height: i32,
    // None draws the raw polyline without fitting
    pub smoothness: Option<f64>,
    pub color: [u8; 3],
    pub background: [u8; 3],
    pub thickness: i32,
}

impl Default for PathPlotConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 980,
            smoothness: Some(0.5),
            color: [255, 0, 0],
            background: [255, 255, 255],
            thickness: 2,
        }
    }
}

impl PathPlotConfig {
    pub fn validate(&self) -> VizResult<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(VizError::configuration("canvas", format!("{}x{} has no pixels", self.width, self.height)));
        }
        if self.thickness <= 0 {
            return Err(VizError::configuration("thickness", format!("{} must be positive", self.thickness)));
        }
        if let Some(s) = self.smoothness {
            if !s.is_finite() || s < 0.0 {
                return Err(VizError::configuration("smoothness", format!("{s} must be a non-negative number")));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackPath {
    Segments(Vec<Vector2<i32>>),
    Curve(Vec<Vector2<i32>>),
    FitFailed {
        segments: Vec<Vector2<i32>>,
        error: FitError,
    },
}

impl TrackPath {
    pub fn points(&self) -> &[Vector2<i32>] {
        match self {
            TrackPath::Segments(points) | TrackPath::Curve(points) => points,
            TrackPath::FitFailed { segments, .. } => segments,
        }
    }

    pub fn is_curve(&self) -> bool {
        matches!(self, TrackPath::Curve(_))
    }
}

pub struct PathPlot {
    pub canvas: Mat,
    pub curves: usize,
    pub fallbacks: Vec<(TrackId, FitError)>,
}

/// Drops every point equal to the one right before it.
pub fn dedup_consecutive(points: &[Vector2<i32>]) -> Vec<Vector2<i32>> {
    points.iter().copied().dedup().collect()
}

pub fn plan_track_path(points: &[Vector2<i32>], smoothness: Option<f64>) -> TrackPath {
    let cleaned = dedup_consecutive(points);
    let Some(s0) = smoothness else {
        return TrackPath::Segments(cleaned);
    };
    if cleaned.len() < MIN_SPLINE_POINTS {
        return TrackPath::Segments(cleaned);
    }

    match fit_curve(&cleaned, s0) {
        Ok(curve) => TrackPath::Curve(curve),
        Err(error) => TrackPath::FitFailed { segments: cleaned, error },
    }
}

fn fit_curve(cleaned: &[Vector2<i32>], s0: f64) -> Result<Vec<Vector2<i32>>, FitError> {
    let points: Vec<Vector2<f64>> = cleaned.iter().map(|p| p.cast()).collect();
    let spline = SmoothingSpline::fit(&points, s0 * points.len() as f64)?;

    let samples = spline.sample(points.len() * SAMPLES_PER_POINT);
    if samples.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(FitError::NonFinite);
    }

    Ok(samples
        .into_iter()
        .map(|p| Vector2::new(p.x as i32, p.y as i32))
        .collect())
}

pub fn draw_track_path(canvas: &mut Mat, path: &TrackPath, config: &PathPlotConfig) -> VizResult<()> {
    let color = bgr_scalar(config.color);
    match path {
        TrackPath::Curve(points) => {
            let polyline: Vector<Point> = points.iter().map(|p| Point::new(p.x, p.y)).collect();
            polylines(canvas, &polyline, false, color, config.thickness, LINE_8, 0)?;
        }
        TrackPath::Segments(points) | TrackPath::FitFailed { segments: points, .. } => {
            for (a, b) in points.iter().tuple_windows() {
                line(canvas, Point::new(a.x, a.y), Point::new(b.x, b.y), color, config.thickness, LINE_8, 0)?;
            }
        }
    }

    Ok(())
}

/// Renders every track onto one canvas, in track id order.
///
/// A track whose curve fit fails is drawn with straight segments and listed
/// in `fallbacks`; the remaining tracks are unaffected.
pub fn render_paths(tracks: &TrackSet, config: &PathPlotConfig) -> VizResult<PathPlot> {
    config.validate()?;

    let mut canvas = solid_canvas(config.width, config.height, config.background)?;
    let mut curves = 0;
    let mut fallbacks = Vec::new();

    for (track_id, track) in tracks.iter() {
        if track.is_empty() {
            continue;
        }

        let path = plan_track_path(&track.positions(), config.smoothness);
        match &path {
            TrackPath::Curve(_) => curves += 1,
            TrackPath::FitFailed { error, .. } => {
                log::warn!("Could not fit spline for track {track_id}, drawing straight segments: {error}");
                fallbacks.push((track_id, error.clone()));
            }
            TrackPath::Segments(points) => {
                log::debug!("Track {track_id} drawn as {} straight points", points.len());
            }
        }

        draw_track_path(&mut canvas, &path, config)?;
    }

    log::info!("Plotted {} tracks, {curves} smoothed", tracks.len());
    Ok(PathPlot { canvas, curves, fallbacks })
}
