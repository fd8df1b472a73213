use std::{collections::VecDeque, io::{BufRead, BufReader}, path::{Path, PathBuf}, process::{Command, Stdio}};

use crate::error::{FootageError, FootageResult};

// stderr lines kept for the error report when the tool fails
const DIAGNOSTIC_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl CropGeometry {
    pub fn filter(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }
}

/// Re-encodes a rectangle of a video with ffmpeg. Audio is copied as is.
#[derive(Debug, Clone)]
pub struct CropJob {
    input: PathBuf,
    output: PathBuf,
    geometry: CropGeometry,
    codec: String,
    preset: String,
    program: String,
}

impl CropJob {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>, geometry: CropGeometry) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            geometry,
            codec: "libx264".to_string(),
            preset: "veryfast".to_string(),
            program: "ffmpeg".to_string(),
        }
    }

    pub fn codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Name or path of the ffmpeg executable.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
            "-filter:v".to_string(),
            self.geometry.filter(),
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-c:a".to_string(),
            "copy".to_string(),
            self.output.to_string_lossy().to_string(),
        ]
    }

    /// Runs the job, handing every stderr line to `on_line` as it arrives.
    pub fn run<F: FnMut(&str)>(&self, on_line: F) -> FootageResult<()> {
        if !self.input.exists() {
            return Err(FootageError::MissingFile(self.input.clone()));
        }
        let program = which::which(&self.program).map_err(|_| FootageError::ToolNotFound(self.program.clone()))?;

        let args = self.args();
        log::info!("Running {} {}", self.program, args.join(" "));
        run_streaming(&self.program, &program, &args, on_line)?;

        log::info!("Cropped video saved to {}", self.output.display());
        Ok(())
    }
}

/// Runs `program` to completion, streaming its stderr line by line.
///
/// A non-zero exit becomes [`FootageError::ExternalTool`] carrying the last
/// stderr lines.
pub fn run_streaming<F: FnMut(&str)>(tool: &str, program: &Path, args: &[String], mut on_line: F) -> FootageResult<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut tail = VecDeque::with_capacity(DIAGNOSTIC_LINES);
    if let Some(stderr) = child.stderr.take() {
        for line in BufReader::new(stderr).split(b'\n') {
            let line = String::from_utf8_lossy(&line?).trim_end_matches('\r').to_string();
            log::debug!("{tool}: {line}");
            on_line(&line);

            if tail.len() == DIAGNOSTIC_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }

    let status = child.wait()?;
    if status.success() {
        return Ok(());
    }

    log::error!("{tool} failed with {status}");
    Err(FootageError::ExternalTool {
        tool: tool.to_string(),
        status: status.code(),
        diagnostics: Vec::from(tail).join("\n"),
    })
}
