use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use csv::{StringRecord, Trim};

use crate::error::{TrackLogError, TrackLogResult};
use crate::track::{TrackId, TrackPoint, TrackSet};

/// The parsed contents of a track log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackLog {
    pub tracks: TrackSet,
    pub header: Vec<String>,
    pub rows: usize,
}

impl TrackLog {
    /// False for a log that holds a header but no observations.
    pub fn has_data(&self) -> bool {
        self.rows > 0
    }
}

pub fn read_track_log(path: impl AsRef<Path>) -> TrackLogResult<TrackLog> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TrackLogError::MissingFile(path.to_path_buf()));
    }

    log::info!("Reading tracking data from '{}'", path.display());
    let file = File::open(path)?;
    let track_log = parse_track_log(BufReader::new(file), path)?;

    if track_log.has_data() {
        log::info!(
            "Loaded {} rows in {} tracks",
            track_log.rows,
            track_log.tracks.len()
        );
    } else {
        log::warn!("No data rows in '{}'", path.display());
    }

    Ok(track_log)
}

/// Parses `frame_number,track_id,x_center,y_center[,confidence,...]` records.
///
/// `source` is only used to label errors.
pub fn parse_track_log<R: Read>(reader: R, source: &Path) -> TrackLogResult<TrackLog> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if header.iter().all(|f| f.is_empty()) {
        return Err(TrackLogError::MissingHeader(source.to_path_buf()));
    }

    let mut track_log = TrackLog {
        header,
        ..Default::default()
    };

    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let (track_id, point) = parse_row(&record)
            .map_err(|reason| TrackLogError::malformed(source, line, reason))?;
        track_log.tracks.observe(track_id, point);
        track_log.rows += 1;
    }

    Ok(track_log)
}

fn parse_row(record: &StringRecord) -> Result<(TrackId, TrackPoint), String> {
    if record.len() < 4 {
        return Err(format!("expected at least 4 fields, found {}", record.len()));
    }

    let frame = parse_field::<u64>(&record[0], "frame_number")?;
    let track_id = parse_field::<TrackId>(&record[1], "track_id")?;
    let x = parse_field::<i32>(&record[2], "x_center")?;
    let y = parse_field::<i32>(&record[3], "y_center")?;

    let mut point = TrackPoint::new(frame, x, y);
    if let Some(raw) = record.get(4).filter(|f| !f.is_empty()) {
        match raw.parse::<f32>() {
            Ok(confidence) => point = point.with_confidence(confidence),
            Err(_) => log::debug!("Ignoring unparsable confidence '{raw}'"),
        }
    }

    Ok((track_id, point))
}

fn parse_field<T: FromStr>(raw: &str, name: &str) -> Result<T, String> {
    raw.parse::<T>()
        .map_err(|_| format!("{name} '{raw}' is not a valid {}", std::any::type_name::<T>()))
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use nalgebra::Vector2;

    use super::*;

    fn parse(text: &str) -> TrackLogResult<TrackLog> {
        parse_track_log(Cursor::new(text), Path::new("test.csv"))
    }

    #[test]
    fn groups_rows_by_track_in_file_order() {
        let log = parse(
            "frame_number,track_id,x_center,y_center,confidence\n\
             1,1,100,100,0.9123\n\
             2,2,50,60,0.5\n\
             3,1,110,100,0.8\n",
        )
        .unwrap();

        assert!(log.has_data());
        assert_eq!(log.rows, 3);
        assert_eq!(log.header[2], "x_center");
        let track = log.tracks.get(1).unwrap();
        assert_eq!(track.positions(), vec![Vector2::new(100, 100), Vector2::new(110, 100)]);
        assert_eq!(track.points()[0].confidence, Some(0.9123));
        assert_eq!(log.tracks.get(2).unwrap().len(), 1);
    }

    #[test]
    fn confidence_is_optional_and_extra_columns_ignored() {
        let log = parse(
            "frame_number,track_id,x_center,y_center\n\
             1,4,1,2\n\
             2,4,3,4,,extra\n\
             3,4,5,6,n/a,extra,more\n",
        )
        .unwrap();

        let track = log.tracks.get(4).unwrap();
        assert_eq!(track.len(), 3);
        assert!(track.points().iter().all(|p| p.confidence.is_none()));
    }

    #[test]
    fn header_only_is_empty_not_error() {
        let log = parse("frame_number,track_id,x_center,y_center,confidence\n").unwrap();
        assert!(!log.has_data());
        assert!(log.tracks.is_empty());
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(parse(""), Err(TrackLogError::MissingHeader(_))));
    }

    #[test]
    fn bad_row_reports_line_and_field() {
        let err = parse("frame_number,track_id,x_center,y_center\n1,1,10,10\n2,1,abc,10\n")
            .unwrap_err();
        match err {
            TrackLogError::MalformedRow { line, reason, .. } => {
                assert_eq!(line, 3);
                assert!(reason.contains("x_center"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn short_row_is_malformed() {
        let err = parse("h\n1,1,10\n").unwrap_err();
        assert!(matches!(err, TrackLogError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn quoted_fields_are_accepted() {
        let log = parse(
            "\"frame_number\",\"track_id\",\"x_center\",\"y_center\",\"confidence\"\n\
             \"1\",\"1\",\"100\",\"100\",\"0.9\"\n",
        )
        .unwrap();

        assert_eq!(log.header[0], "frame_number");
        let point = log.tracks.get(1).unwrap().points()[0];
        assert_eq!(point.position, Vector2::new(100, 100));
        assert_eq!(point.confidence, Some(0.9));
    }

    #[test]
    fn whitespace_around_fields_is_trimmed() {
        let log = parse("frame_number, track_id, x_center, y_center\n 7 , 2 , 30 , 40 \n").unwrap();
        assert_eq!(log.header[1], "track_id");
        assert_eq!(log.tracks.get(2).unwrap().points()[0], TrackPoint::new(7, 30, 40));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let log = parse("frame_number,track_id,x_center,y_center\n\n1,1,10,10\n\n").unwrap();
        assert_eq!(log.rows, 1);
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.csv");
        let err = read_track_log(&path).unwrap_err();
        assert!(matches!(err, TrackLogError::MissingFile(ref p) if p == &path));
        assert!(err.to_string().contains("nope.csv"));
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "frame_number,track_id,x_center,y_center,confidence").unwrap();
        writeln!(file, "1,1,100,100,0.9").unwrap();
        writeln!(file, "2,1,110,100,0.9").unwrap();

        let log = read_track_log(file.path()).unwrap();
        assert_eq!(log.tracks.point_count(), 2);
    }
}
