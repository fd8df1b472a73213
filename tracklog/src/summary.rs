use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::TrackLogResult;

/// One-glance result of a recorded run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub source: String,
    pub frames: u64,
    pub total_distance: f64,
    pub unit: String,
}

impl RunSummary {
    pub fn write(&self, path: impl AsRef<Path>) -> TrackLogResult<()> {
        std::fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source Video: {}", self.source)?;
        writeln!(f, "Total Frames Processed: {}", self.frames)?;
        writeln!(f, "Total Distance Traveled ({}): {:.2}", self.unit, self.total_distance)
    }
}

/// `logs/run.csv` -> `logs/run.summary.txt`
pub fn summary_path_for(log_path: &Path) -> PathBuf {
    log_path.with_extension("summary.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_three_lines() {
        let summary = RunSummary {
            source: "test1_out.avi".to_string(),
            frames: 1200,
            total_distance: 523.456,
            unit: "cm".to_string(),
        };
        assert_eq!(
            summary.to_string(),
            "Source Video: test1_out.avi\nTotal Frames Processed: 1200\nTotal Distance Traveled (cm): 523.46\n"
        );
    }

    #[test]
    fn summary_sits_next_to_log() {
        assert_eq!(
            summary_path_for(Path::new("rat_path_log/log_total_distance.csv")),
            PathBuf::from("rat_path_log/log_total_distance.summary.txt")
        );
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.summary.txt");
        let summary = RunSummary {
            source: "clip".to_string(),
            frames: 3,
            total_distance: 0.4894,
            unit: "cm".to_string(),
        };
        summary.write(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().ends_with("(cm): 0.49\n"));
    }
}
