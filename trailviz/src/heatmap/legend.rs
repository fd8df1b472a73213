use opencv::{core::{Mat, Point, Scalar, Vec3b, CV_8UC1}, imgproc::{apply_color_map, line, put_text, COLORMAP_JET, FONT_HERSHEY_SIMPLEX, LINE_8}, prelude::*};

use crate::error::VizResult;

pub const LEGEND_WIDTH: i32 = 50;
pub const LEGEND_HEIGHT: i32 = 300;
pub const LEGEND_INSET: i32 = 10;

/// Colors of the legend rows, hottest first.
pub fn legend_colors(height: i32) -> VizResult<Vec<Vec3b>> {
    let mut ramp = Mat::new_rows_cols_with_default(height, 1, CV_8UC1, Scalar::all(0.0))?;
    for i in 0..height {
        let value = ((i as f64 / height as f64) * 255.0) as i32;
        *ramp.at_2d_mut::<u8>(i, 0)? = (255 - value) as u8;
    }

    let mut colored = Mat::default();
    apply_color_map(&ramp, &mut colored, COLORMAP_JET)?;

    (0..height)
        .map(|i| -> VizResult<Vec3b> { Ok(*colored.at_2d::<Vec3b>(i, 0)?) })
        .collect()
}

/// Paints the color bar into the top-right corner of `img`.
pub fn draw_legend(img: &mut Mat) -> VizResult<()> {
    let x0 = img.cols() - LEGEND_INSET - LEGEND_WIDTH;
    let y0 = LEGEND_INSET;

    for (i, color) in legend_colors(LEGEND_HEIGHT)?.into_iter().enumerate() {
        let y = y0 + i as i32;
        let color = Scalar::new(color[0] as f64, color[1] as f64, color[2] as f64, 0.0);
        line(img, Point::new(x0, y), Point::new(x0 + LEGEND_WIDTH - 1, y), color, 1, LINE_8, 0)?;
    }

    put_text(img, "Hot", Point::new(x0 + 5, y0 + 20), FONT_HERSHEY_SIMPLEX, 0.6, Scalar::new(255.0, 255.0, 255.0, 0.0), 2, LINE_8, false)?;
    put_text(img, "Cool", Point::new(x0 + 5, y0 + LEGEND_HEIGHT - 10), FONT_HERSHEY_SIMPLEX, 0.6, Scalar::all(0.0), 2, LINE_8, false)?;

    Ok(())
}
