use std::collections::BTreeMap;

use itertools::Itertools;
use nalgebra::Vector2;

use crate::error::{TrackLogError, TrackLogResult};
use crate::track::{Track, TrackId, TrackSet};

/// Pixels per physical unit along each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelScale {
    pub x: f64,
    pub y: f64,
}

impl PixelScale {
    pub fn new(canvas_width: u32, canvas_height: u32, real_width: f64, real_height: f64) -> TrackLogResult<Self> {
        check_real_dimension("real_width", real_width)?;
        check_real_dimension("real_height", real_height)?;

        if canvas_width == 0 || canvas_height == 0 {
            log::warn!("Canvas is {canvas_width}x{canvas_height}, measuring distances in pixels");
            return Ok(Self::identity());
        }

        Ok(Self {
            x: canvas_width as f64 / real_width,
            y: canvas_height as f64 / real_height,
        })
    }

    pub fn identity() -> Self {
        Self { x: 1.0, y: 1.0 }
    }

    /// Real-world displacement from `from` to `to`.
    pub fn to_real(&self, from: Vector2<i32>, to: Vector2<i32>) -> Vector2<f64> {
        let delta = to.cast::<f64>() - from.cast::<f64>();
        Vector2::new(delta.x / self.x, delta.y / self.y)
    }
}

fn check_real_dimension(parameter: &'static str, value: f64) -> TrackLogResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TrackLogError::configuration(parameter, format!("{value} must be a positive length")))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceReport {
    pub per_track: BTreeMap<TrackId, f64>,
    pub total: f64,
}

pub fn track_distance(track: &Track, scale: &PixelScale) -> f64 {
    track
        .points()
        .iter()
        .tuple_windows()
        .map(|(a, b)| scale.to_real(a.position, b.position).norm())
        .sum()
}

pub fn measure(tracks: &TrackSet, scale: &PixelScale) -> DistanceReport {
    let per_track: BTreeMap<TrackId, f64> = tracks
        .iter()
        .map(|(id, track)| (id, track_distance(track, scale)))
        .collect();
    let total = per_track.values().sum();

    DistanceReport { per_track, total }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::track::TrackPoint;

    fn track(points: &[(i32, i32)]) -> Track {
        points
            .iter()
            .enumerate()
            .map(|(i, (x, y))| TrackPoint::new(i as u64 + 1, *x, *y))
            .collect()
    }

    #[test]
    fn arena_scenario() {
        let scale = PixelScale::new(1280, 980, 30.0, 25.0).unwrap();
        let mut set = TrackSet::new();
        for p in track(&[(100, 100), (110, 100), (110, 110)]).points() {
            set.observe(1, *p);
        }

        let report = measure(&set, &scale);
        let expected = 10.0 / (1280.0 / 30.0) + 10.0 / (980.0 / 25.0);
        assert!((report.total - expected).abs() < 1e-9);
        assert!((report.total - 0.49).abs() < 0.005);
        assert_eq!(report.per_track[&1], report.total);
    }

    #[test]
    fn short_tracks_have_no_distance() {
        let scale = PixelScale::identity();
        assert_eq!(track_distance(&track(&[]), &scale), 0.0);
        assert_eq!(track_distance(&track(&[(5, 5)]), &scale), 0.0);
    }

    #[test]
    fn total_sums_tracks() {
        let mut set = TrackSet::new();
        set.observe(1, TrackPoint::new(1, 0, 0));
        set.observe(1, TrackPoint::new(2, 3, 4));
        set.observe(2, TrackPoint::new(1, 0, 0));
        set.observe(2, TrackPoint::new(2, 0, 10));
        set.observe(3, TrackPoint::new(1, 7, 7));

        let report = measure(&set, &PixelScale::identity());
        assert_eq!(report.per_track[&1], 5.0);
        assert_eq!(report.per_track[&2], 10.0);
        assert_eq!(report.per_track[&3], 0.0);
        assert_eq!(report.total, 15.0);
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let t = track(&[(i32::MIN, 0), (i32::MAX, 0)]);
        let expected = i32::MAX as f64 - i32::MIN as f64;
        assert!((track_distance(&t, &PixelScale::identity()) - expected).abs() < 1.0);
    }

    #[test]
    fn zero_canvas_falls_back_to_pixels() {
        assert_eq!(PixelScale::new(0, 980, 30.0, 25.0).unwrap(), PixelScale::identity());
        assert_eq!(PixelScale::new(1280, 0, 30.0, 25.0).unwrap(), PixelScale::identity());
    }

    #[test]
    fn rejects_non_positive_real_dimensions() {
        let err = PixelScale::new(1280, 980, 0.0, 25.0).unwrap_err();
        assert!(matches!(err, TrackLogError::Configuration { parameter: "real_width", .. }));
        let err = PixelScale::new(1280, 980, 30.0, f64::NAN).unwrap_err();
        assert!(matches!(err, TrackLogError::Configuration { parameter: "real_height", .. }));
    }

    proptest! {
        #[test]
        fn consecutive_duplicate_adds_nothing(
            points in prop::collection::vec((0i32..1280, 0i32..980), 1..30),
            at in 0usize..30,
        ) {
            let scale = PixelScale::new(1280, 980, 30.0, 25.0).unwrap();
            let at = at % points.len();
            let mut doubled = points.clone();
            doubled.insert(at, points[at]);

            let a = track_distance(&track(&points), &scale);
            let b = track_distance(&track(&doubled), &scale);
            prop_assert!((a - b).abs() < 1e-9);
        }
    }
}
