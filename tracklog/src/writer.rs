use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use itertools::Itertools;

use crate::error::TrackLogResult;
use crate::track::{TrackId, TrackPoint, TrackSet};

pub const LOG_HEADER: [&str; 5] = ["frame_number", "track_id", "x_center", "y_center", "confidence"];

pub struct TrackLogWriter<W: Write> {
    out: csv::Writer<W>,
    rows: usize,
}

impl TrackLogWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> TrackLogResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> TrackLogWriter<W> {
    pub fn new(out: W) -> TrackLogResult<Self> {
        let mut out = csv::Writer::from_writer(out);
        out.write_record(LOG_HEADER)?;
        Ok(Self { out, rows: 0 })
    }

    /// Confidence is written in its shortest exact form, or left empty.
    pub fn write_row(&mut self, track_id: TrackId, point: &TrackPoint) -> TrackLogResult<()> {
        let confidence = point.confidence.map(|c| c.to_string()).unwrap_or_default();
        self.out.write_record([
            point.frame.to_string(),
            track_id.to_string(),
            point.position.x.to_string(),
            point.position.y.to_string(),
            confidence,
        ])?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(self) -> TrackLogResult<W> {
        Ok(self.out.into_inner().map_err(|e| e.into_error())?)
    }
}

/// Writes a whole set, tracks interleaved by frame.
///
/// Each track keeps its own point order, so reading the log back yields an
/// equal set even when a track's frames are not ascending.
pub fn write_track_log<W: Write>(out: W, tracks: &TrackSet) -> TrackLogResult<W> {
    let rows = tracks
        .iter()
        .map(|(id, track)| track.points().iter().map(move |p| (id, p)))
        .kmerge_by(|a, b| a.1.frame < b.1.frame);

    let mut writer = TrackLogWriter::new(out)?;
    for (id, point) in rows {
        writer.write_row(id, point)?;
    }
    writer.finish()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;

    use proptest::prelude::*;

    use super::*;
    use crate::ingest::parse_track_log;

    fn read_back(bytes: Vec<u8>) -> TrackSet {
        parse_track_log(Cursor::new(bytes), Path::new("mem.csv")).unwrap().tracks
    }

    #[test]
    fn writes_header_and_rows() {
        let mut writer = TrackLogWriter::new(Vec::new()).unwrap();
        writer.write_row(2, &TrackPoint::new(5, 10, 20).with_confidence(0.87654)).unwrap();
        writer.write_row(2, &TrackPoint::new(6, 11, 21)).unwrap();
        assert_eq!(writer.rows(), 2);

        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            text,
            "frame_number,track_id,x_center,y_center,confidence\n5,2,10,20,0.87654\n6,2,11,21,\n"
        );
    }

    #[test]
    fn create_makes_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/run.csv");
        let writer = TrackLogWriter::create(&path).unwrap();
        writer.finish().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn confidence_survives_exactly() {
        let mut set = TrackSet::new();
        set.observe(1, TrackPoint::new(1, 10, 10).with_confidence(0.91234));
        let back = read_back(write_track_log(Vec::new(), &set).unwrap());
        assert_eq!(back.get(1).unwrap().points()[0].confidence, Some(0.91234));
    }

    #[test]
    fn track_order_is_kept_when_frames_go_backwards() {
        let mut set = TrackSet::new();
        set.observe(1, TrackPoint::new(5, 10, 10));
        set.observe(1, TrackPoint::new(3, 20, 20));
        set.observe(2, TrackPoint::new(4, 0, 0));

        let back = read_back(write_track_log(Vec::new(), &set).unwrap());
        assert_eq!(back, set);
    }

    #[test]
    fn tracks_are_interleaved_by_frame() {
        let mut set = TrackSet::new();
        set.observe(1, TrackPoint::new(1, 0, 0));
        set.observe(1, TrackPoint::new(3, 0, 0));
        set.observe(2, TrackPoint::new(2, 9, 9));

        let text = String::from_utf8(write_track_log(Vec::new(), &set).unwrap()).unwrap();
        let frames: Vec<&str> = text.lines().skip(1).map(|l| l.split(',').next().unwrap()).collect();
        assert_eq!(frames, vec!["1", "2", "3"]);
    }

    fn arb_track_set() -> impl Strategy<Value = TrackSet> {
        let row = (
            0i64..4,
            0u64..500,
            -50i32..2000,
            -50i32..2000,
            prop::option::of(0.0f32..1.0),
        );
        prop::collection::vec(row, 0..60).prop_map(|rows| {
            let mut set = TrackSet::new();
            for (id, frame, x, y, confidence) in rows {
                let point = TrackPoint::new(frame, x, y);
                set.observe(id, match confidence {
                    Some(c) => point.with_confidence(c),
                    None => point,
                });
            }
            set
        })
    }

    proptest! {
        #[test]
        fn written_log_reads_back_equal(set in arb_track_set()) {
            let bytes = write_track_log(Vec::new(), &set).unwrap();
            prop_assert_eq!(read_back(bytes), set);
        }
    }
}
