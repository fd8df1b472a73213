use nalgebra::DMatrix;
use opencv::{core::{Mat, Scalar, CV_32FC1, CV_8UC1, CV_8UC3, CV_8UC4}, imgproc::{cvt_color_def, resize, COLOR_BGRA2BGR, COLOR_GRAY2BGR, INTER_LINEAR}, prelude::*};

use crate::error::{VizError, VizResult};

pub fn field_to_mat(field: &DMatrix<f32>) -> VizResult<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(field.nrows() as i32, field.ncols() as i32, CV_32FC1, Scalar::all(0.0))?;

    for r in 0..field.nrows() {
        for c in 0..field.ncols() {
            *mat.at_2d_mut::<f32>(r as i32, c as i32)? = field[(r, c)];
        }
    }

    Ok(mat)
}

pub fn mat_to_field(mat: &Mat) -> VizResult<DMatrix<f32>> {
    let mut res = DMatrix::zeros(mat.rows() as usize, mat.cols() as usize);

    for r in 0..mat.rows() as usize {
        for c in 0..mat.cols() as usize {
            res[(r, c)] = *mat.at_2d::<f32>(r as i32, c as i32)?;
        }
    }

    Ok(res)
}

pub fn gray_to_mat(gray: &DMatrix<u8>) -> VizResult<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(gray.nrows() as i32, gray.ncols() as i32, CV_8UC1, Scalar::all(0.0))?;

    for r in 0..gray.nrows() {
        for c in 0..gray.ncols() {
            *mat.at_2d_mut::<u8>(r as i32, c as i32)? = gray[(r, c)];
        }
    }

    Ok(mat)
}

/// Converts any 8-bit image to 3-channel BGR at the given size.
pub fn to_bgr_canvas(img: &Mat, width: i32, height: i32) -> VizResult<Mat> {
    let mut bgr = Mat::default();
    match img.typ() {
        CV_8UC1 => {
            cvt_color_def(img, &mut bgr, COLOR_GRAY2BGR)?;
        },
        CV_8UC3 => {
            bgr = img.clone();
        },
        CV_8UC4 => {
            cvt_color_def(img, &mut bgr, COLOR_BGRA2BGR)?;
        },
        other => {
            return Err(VizError::configuration("background", format!("unsupported image type {other}")));
        }
    }

    if bgr.cols() == width && bgr.rows() == height {
        return Ok(bgr);
    }

    let mut resized = Mat::default();
    resize(&bgr, &mut resized, (width, height).into(), 0.0, 0.0, INTER_LINEAR)?;
    Ok(resized)
}

pub fn solid_canvas(width: i32, height: i32, bgr: [u8; 3]) -> VizResult<Mat> {
    Ok(Mat::new_rows_cols_with_default(height, width, CV_8UC3, bgr_scalar(bgr))?)
}

pub fn bgr_scalar(bgr: [u8; 3]) -> Scalar {
    Scalar::new(bgr[0] as f64, bgr[1] as f64, bgr[2] as f64, 0.0)
}
