use nalgebra::{DMatrix, Vector2};
use opencv::core::Size;
use opencv::imgproc::gaussian_blur_def;

use crate::error::VizResult;
use crate::utils::{field_to_mat, mat_to_field};

/// Accumulated "heat" per canvas pixel, indexed `(row, col)` = `(y, x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityField {
    values: DMatrix<f32>,
}

impl IntensityField {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            values: DMatrix::zeros(height, width),
        }
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn height(&self) -> usize {
        self.values.nrows()
    }

    pub fn values(&self) -> &DMatrix<f32> {
        &self.values
    }

    pub fn contains(&self, p: &Vector2<i32>) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width() && (p.y as usize) < self.height()
    }

    /// Adds 1 to every pixel of the filled disk around `center`.
    ///
    /// Returns false without touching the field when the center lies off the canvas.
    pub fn deposit_disk(&mut self, center: &Vector2<i32>, radius: i32) -> bool {
        if !self.contains(center) {
            return false;
        }

        // i64 keeps radius * radius exact for any i32 radius
        let (cx, cy, r) = (center.x as i64, center.y as i64, radius as i64);
        let r2 = r * r;
        let x_range = (cx - r).max(0)..=(cx + r).min(self.width() as i64 - 1);
        let y_range = (cy - r).max(0)..=(cy + r).min(self.height() as i64 - 1);

        for y in y_range {
            let dy = y - cy;
            for x in x_range.clone() {
                let dx = x - cx;
                if dx * dx + dy * dy <= r2 {
                    self.values[(y as usize, x as usize)] += 1.0;
                }
            }
        }

        true
    }

    pub fn blurred(&self, kernel: (i32, i32)) -> VizResult<Self> {
        let src = field_to_mat(&self.values)?;
        let mut dst = opencv::core::Mat::default();
        gaussian_blur_def(&src, &mut dst, Size::new(kernel.0, kernel.1), 0.0)?;

        Ok(Self {
            values: mat_to_field(&dst)?,
        })
    }

    /// Linearly maps the value range onto `0..=255`.
    ///
    /// A flat field (nothing deposited) maps to all zeros.
    pub fn normalized(&self) -> DMatrix<u8> {
        let min = self.values.min();
        let max = self.values.max();
        let range = max - min;

        if range.is_nan() || range <= f32::EPSILON {
            return DMatrix::zeros(self.height(), self.width());
        }

        self.values
            .map(|v| (((v - min) / range) * 255.0).round().clamp(0.0, 255.0) as u8)
    }
}

impl From<DMatrix<f32>> for IntensityField {
    fn from(values: DMatrix<f32>) -> Self {
        Self { values }
    }
}
