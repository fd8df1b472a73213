use std::{fmt, path::Path, str::FromStr};

use opencv::{core::Vector, imgcodecs::imwrite};

use crate::{error::FootageResult, video::FrameSource};

const PROGRESS_EVERY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpg,
    Jpeg,
    Bmp,
    Tiff,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" => Ok(ImageFormat::Jpg),
            "jpeg" => Ok(ImageFormat::Jpeg),
            "bmp" => Ok(ImageFormat::Bmp),
            "tiff" => Ok(ImageFormat::Tiff),
            other => Err(format!("unsupported image format '{other}', expected png, jpg, jpeg, bmp or tiff")),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractReport {
    pub read: usize,
    pub saved: usize,
}

pub fn frame_file_name(index: usize, format: ImageFormat) -> String {
    format!("frame_{index:06}.{}", format.extension())
}

/// Saves every `(skip + 1)`-th frame of `source` into `out_dir`.
///
/// Files are numbered by save order. A frame that cannot be written is logged
/// and does not stop the extraction.
pub fn extract_frames<S: FrameSource>(source: &mut S, out_dir: impl AsRef<Path>, format: ImageFormat, skip: usize) -> FootageResult<ExtractReport> {
    let out_dir = out_dir.as_ref();
    if !out_dir.exists() {
        std::fs::create_dir_all(out_dir)?;
        log::info!("Created output directory {}", out_dir.display());
    }

    let mut report = ExtractReport::default();
    while let Some(frame) = source.next_frame()? {
        if report.read % skip.saturating_add(1) == 0 {
            let path = out_dir.join(frame_file_name(report.saved, format));
            match imwrite(&path.to_string_lossy(), &frame, &Vector::new()) {
                Ok(true) => {
                    report.saved += 1;
                    if report.saved % PROGRESS_EVERY == 0 {
                        log::info!("Saved {} frames...", report.saved);
                    }
                }
                Ok(false) => log::error!("Could not write frame to {}", path.display()),
                Err(e) => log::error!("Could not write frame to {}: {e}", path.display()),
            }
        }
        report.read += 1;
    }

    log::info!("Frame extraction complete: read {}, saved {} ({format})", report.read, report.saved);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::QueuedFrames;

    #[test]
    fn parses_formats() {
        assert_eq!("PNG".parse::<ImageFormat>(), Ok(ImageFormat::Png));
        assert_eq!("jpeg".parse::<ImageFormat>(), Ok(ImageFormat::Jpeg));
        assert!("gif".parse::<ImageFormat>().is_err());
        assert_eq!(frame_file_name(42, ImageFormat::Tiff), "frame_000042.tiff");
    }

    #[test]
    fn saves_every_frame_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frames");
        let report = extract_frames(&mut QueuedFrames::new(3), &out, ImageFormat::Png, 0).unwrap();

        assert_eq!(report, ExtractReport { read: 3, saved: 3 });
        for i in 0..3 {
            assert!(out.join(frame_file_name(i, ImageFormat::Png)).exists());
        }
    }

    #[test]
    fn skip_keeps_every_nth_frame() {
        let dir = tempfile::tempdir().unwrap();
        let report = extract_frames(&mut QueuedFrames::new(7), dir.path(), ImageFormat::Bmp, 2).unwrap();

        // frames 0, 3 and 6
        assert_eq!(report, ExtractReport { read: 7, saved: 3 });
        assert!(dir.path().join("frame_000002.bmp").exists());
        assert!(!dir.path().join("frame_000003.bmp").exists());
    }

    #[test]
    fn huge_skip_keeps_only_the_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        let report = extract_frames(&mut QueuedFrames::new(4), dir.path(), ImageFormat::Png, usize::MAX).unwrap();
        assert_eq!(report, ExtractReport { read: 4, saved: 1 });
    }

    #[test]
    fn empty_source_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let report = extract_frames(&mut QueuedFrames::new(0), dir.path(), ImageFormat::Png, 0).unwrap();
        assert_eq!(report, ExtractReport::default());
    }
}
