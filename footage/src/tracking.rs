use std::collections::BTreeMap;
use std::io::Write;

use nalgebra::Vector2;
use opencv::core::{Mat, Rect};
use tracklog::{measure, PixelScale, RunSummary, TrackId, TrackLogWriter, TrackPoint, TrackSet};

use crate::{annotate::{FrameSink, SinkFlow}, error::{FootageError, FootageResult, TrackerError}, video::FrameSource};

const PROGRESS_EVERY: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: Rect,
    pub track_id: TrackId,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: Rect, track_id: TrackId, confidence: f32) -> Self {
        Self { bbox, track_id, confidence }
    }

    /// Integer midpoint of the box corners, rounded down.
    pub fn center(&self) -> Vector2<i32> {
        let Rect { x, y, width, height } = self.bbox;
        Vector2::new(midpoint(x, width), midpoint(y, height))
    }
}

fn midpoint(start: i32, extent: i32) -> i32 {
    let mid = (2 * start as i64 + extent as i64).div_euclid(2);
    mid.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// An external detector and tracker that assigns persistent ids across frames.
#[cfg_attr(test, mockall::automock)]
pub trait Tracker {
    /// `None` or an empty list both mean nothing was detected in `frame`.
    fn track(&mut self, frame: &Mat) -> Result<Option<Vec<Detection>>, TrackerError>;
}

/// Plays back the observations of an earlier run, one frame per call.
#[derive(Debug, Clone, Default)]
pub struct ReplayTracker {
    by_frame: BTreeMap<u64, Vec<Detection>>,
    frame: u64,
}

impl ReplayTracker {
    pub fn new(tracks: &TrackSet) -> Self {
        let mut by_frame: BTreeMap<u64, Vec<Detection>> = BTreeMap::new();
        for (track_id, track) in tracks.iter() {
            for p in track.points() {
                let bbox = Rect::new(p.position.x, p.position.y, 0, 0);
                let confidence = p.confidence.unwrap_or(1.0);
                by_frame.entry(p.frame).or_default().push(Detection::new(bbox, track_id, confidence));
            }
        }
        Self { by_frame, frame: 0 }
    }
}

impl Tracker for ReplayTracker {
    fn track(&mut self, _frame: &Mat) -> Result<Option<Vec<Detection>>, TrackerError> {
        self.frame += 1;
        Ok(self.by_frame.remove(&self.frame))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    pub tracks: TrackSet,
    pub frames: u64,
}

impl Recording {
    /// Summary over the frames actually processed.
    pub fn summarize(&self, source: impl Into<String>, scale: &PixelScale, unit: impl Into<String>) -> RunSummary {
        RunSummary {
            source: source.into(),
            frames: self.frames,
            total_distance: measure(&self.tracks, scale).total,
            unit: unit.into(),
        }
    }
}

fn best_detection(detections: Vec<Detection>) -> Option<Detection> {
    // first of equally confident detections wins
    detections
        .into_iter()
        .reduce(|best, d| if d.confidence > best.confidence { d } else { best })
}

/// Runs `tracker` over every frame of `source`, keeping the most confident
/// detection per frame. Frames are numbered from 1.
///
/// Every kept observation is appended to `log` as it is made. Each frame is
/// then handed to `sink` with the tracks so far; the sink may end the run early.
pub fn record_observations<S, T, W, K>(source: &mut S, tracker: &mut T, log: &mut TrackLogWriter<W>, sink: &mut K) -> FootageResult<Recording>
where
    S: FrameSource,
    T: Tracker + ?Sized,
    W: Write,
    K: FrameSink + ?Sized,
{
    let mut recording = Recording::default();

    while let Some(mut frame) = source.next_frame()? {
        recording.frames += 1;
        let frame_number = recording.frames;

        let detections = tracker
            .track(&frame)
            .map_err(|source| FootageError::Tracker { frame: frame_number, source })?;

        if let Some(best) = detections.and_then(best_detection) {
            let center = best.center();
            let point = TrackPoint::new(frame_number, center.x, center.y).with_confidence(best.confidence);
            log.write_row(best.track_id, &point)?;
            recording.tracks.observe(best.track_id, point);
        }

        if frame_number % PROGRESS_EVERY == 0 {
            log::debug!("Processed {frame_number} frames, {} observations", recording.tracks.point_count());
        }

        if sink.accept(&mut frame, &recording.tracks)? == SinkFlow::Stop {
            break;
        }
    }

    log::info!(
        "Tracked {} frames, {} observations in {} tracks",
        recording.frames,
        recording.tracks.point_count(),
        recording.tracks.len()
    );
    Ok(recording)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::{annotate::Discard, video::QueuedFrames};

    fn det(x: i32, y: i32, track_id: TrackId, confidence: f32) -> Detection {
        Detection::new(Rect::new(x, y, 10, 21), track_id, confidence)
    }

    fn scripted(responses: Vec<Result<Option<Vec<Detection>>, TrackerError>>) -> MockTracker {
        let calls = responses.len();
        let mut responses = VecDeque::from(responses);
        let mut tracker = MockTracker::new();
        tracker
            .expect_track()
            .times(calls)
            .returning(move |_| responses.pop_front().unwrap());
        tracker
    }

    #[test]
    fn center_rounds_down() {
        assert_eq!(det(100, 50, 1, 0.5).center(), Vector2::new(105, 60));
        assert_eq!(Detection::new(Rect::new(-3, 0, 0, 0), 1, 0.5).center(), Vector2::new(-3, 0));
        assert_eq!(Detection::new(Rect::new(-3, 0, 2, 0), 1, 0.5).center(), Vector2::new(-2, 0));
    }

    #[test]
    fn center_of_huge_box_does_not_overflow() {
        let d = Detection::new(Rect::new(i32::MAX - 10, i32::MAX, 20, i32::MAX), 1, 0.5);
        assert_eq!(d.center(), Vector2::new(i32::MAX, i32::MAX));
    }

    #[test]
    fn keeps_best_detection_per_frame() {
        let mut tracker = scripted(vec![
            Ok(Some(vec![det(0, 0, 1, 0.4), det(100, 100, 2, 0.9), det(50, 50, 3, 0.9)])),
            Ok(None),
            Ok(Some(vec![])),
            Ok(Some(vec![det(20, 30, 2, 0.7)])),
        ]);
        let mut log = TrackLogWriter::new(Vec::new()).unwrap();

        let recording = record_observations(&mut QueuedFrames::new(4), &mut tracker, &mut log, &mut Discard).unwrap();

        assert_eq!(recording.frames, 4);
        assert_eq!(recording.tracks.track_ids().collect::<Vec<_>>(), vec![2]);
        let frames: Vec<u64> = recording.tracks.get(2).unwrap().points().iter().map(|p| p.frame).collect();
        assert_eq!(frames, vec![1, 4]);

        let text = String::from_utf8(log.finish().unwrap()).unwrap();
        assert_eq!(
            text,
            "frame_number,track_id,x_center,y_center,confidence\n1,2,105,110,0.9\n4,2,25,40,0.7\n"
        );
    }

    #[test]
    fn log_reingests_to_same_tracks() {
        let mut tracker = scripted(vec![
            Ok(Some(vec![det(10, 10, 7, 0.8)])),
            Ok(Some(vec![det(12, 14, 7, 0.6)])),
            Ok(Some(vec![det(40, 40, 8, 0.5)])),
        ]);
        let mut log = TrackLogWriter::new(Vec::new()).unwrap();
        let recording = record_observations(&mut QueuedFrames::new(3), &mut tracker, &mut log, &mut Discard).unwrap();

        let bytes = log.finish().unwrap();
        let parsed = tracklog::parse_track_log(bytes.as_slice(), std::path::Path::new("mem.csv")).unwrap();
        assert_eq!(parsed.tracks, recording.tracks);
    }

    #[test]
    fn tracker_failure_names_the_frame() {
        let mut tracker = scripted(vec![Ok(None), Err("model crashed".into())]);
        let mut log = TrackLogWriter::new(Vec::new()).unwrap();

        match record_observations(&mut QueuedFrames::new(5), &mut tracker, &mut log, &mut Discard) {
            Err(FootageError::Tracker { frame, source }) => {
                assert_eq!(frame, 2);
                assert_eq!(source.to_string(), "model crashed");
            }
            other => panic!("expected tracker error, got {other:?}"),
        }
    }

    struct StopAfter {
        frames: u64,
        seen: Vec<usize>,
    }

    impl FrameSink for StopAfter {
        fn accept(&mut self, _frame: &mut Mat, tracks: &TrackSet) -> FootageResult<SinkFlow> {
            self.seen.push(tracks.point_count());
            if self.seen.len() as u64 == self.frames {
                return Ok(SinkFlow::Stop);
            }
            Ok(SinkFlow::Continue)
        }
    }

    #[test]
    fn sink_sees_tracks_so_far_and_can_stop() {
        let mut tracker = scripted(vec![
            Ok(Some(vec![det(0, 0, 1, 0.5)])),
            Ok(None),
            Ok(Some(vec![det(4, 4, 1, 0.5)])),
        ]);
        let mut log = TrackLogWriter::new(Vec::new()).unwrap();
        let mut sink = StopAfter { frames: 3, seen: Vec::new() };

        let recording = record_observations(&mut QueuedFrames::new(10), &mut tracker, &mut log, &mut sink).unwrap();

        assert_eq!(recording.frames, 3);
        assert_eq!(sink.seen, vec![1, 1, 2]);
    }

    #[test]
    fn replay_reproduces_logged_tracks() {
        let mut logged = TrackSet::new();
        logged.observe(1, TrackPoint::new(1, 10, 10).with_confidence(0.4));
        logged.observe(2, TrackPoint::new(1, 50, 50).with_confidence(0.8));
        logged.observe(2, TrackPoint::new(3, 55, 52).with_confidence(0.7));

        let mut log = TrackLogWriter::new(Vec::new()).unwrap();
        let recording = record_observations(&mut QueuedFrames::new(4), &mut ReplayTracker::new(&logged), &mut log, &mut Discard).unwrap();

        // frame 1 keeps only the more confident track 2
        let mut expected = TrackSet::new();
        expected.observe(2, TrackPoint::new(1, 50, 50).with_confidence(0.8));
        expected.observe(2, TrackPoint::new(3, 55, 52).with_confidence(0.7));
        assert_eq!(recording.tracks, expected);
        assert_eq!(recording.frames, 4);
    }

    #[test]
    fn summary_counts_processed_frames() {
        let mut tracks = TrackSet::new();
        tracks.observe(1, TrackPoint::new(1, 0, 0));
        tracks.observe(1, TrackPoint::new(2, 3, 4));
        let recording = Recording { tracks, frames: 120 };

        let summary = recording.summarize("run.avi", &PixelScale::identity(), "px");
        assert_eq!(summary.frames, 120);
        assert_eq!(summary.total_distance, 5.0);
        assert_eq!(summary.to_string(), "Source Video: run.avi\nTotal Frames Processed: 120\nTotal Distance Traveled (px): 5.00\n");
    }
}
