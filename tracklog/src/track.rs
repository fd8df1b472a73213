use std::collections::BTreeMap;

use nalgebra::Vector2;

pub type TrackId = i64;

/// A single observation of a tracked subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub frame: u64,
    pub position: Vector2<i32>,
    pub confidence: Option<f32>,
}

impl TrackPoint {
    pub fn new(frame: u64, x: i32, y: i32) -> Self {
        Self {
            frame,
            position: Vector2::new(x, y),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Position history of one subject, in the order it was observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    points: Vec<TrackPoint>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: TrackPoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn positions(&self) -> Vec<Vector2<i32>> {
        self.points.iter().map(|p| p.position).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<TrackPoint> for Track {
    fn from_iter<I: IntoIterator<Item = TrackPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// All tracks of one run keyed by track id.
///
/// Iteration follows ascending track id so that everything drawn or summed
/// from a set is reproducible for identical input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSet {
    tracks: BTreeMap<TrackId, Track>,
}

impl TrackSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observation, creating the track on its first sighting.
    pub fn observe(&mut self, track_id: TrackId, point: TrackPoint) {
        self.tracks.entry(track_id).or_default().push(point);
    }

    pub fn get(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.tracks.iter().map(|(id, track)| (*id, track))
    }

    pub fn track_ids(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.tracks.keys().copied()
    }

    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of observations across all tracks.
    pub fn point_count(&self) -> usize {
        self.tracks.values().map(Track::len).sum()
    }

    /// Every observed position, track by track.
    pub fn all_positions(&self) -> Vec<Vector2<i32>> {
        self.tracks
            .values()
            .flat_map(|t| t.points().iter().map(|p| p.position))
            .collect()
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.tracks
            .values()
            .flat_map(|t| t.points().iter().map(|p| p.frame))
            .max()
    }
}

impl<'a> IntoIterator for &'a TrackSet {
    type Item = (&'a TrackId, &'a Track);
    type IntoIter = std::collections::btree_map::Iter<'a, TrackId, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}
