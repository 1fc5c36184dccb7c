//! Container I/O through the `ffmpeg` / `ffprobe` executables.
//!
//! Frames cross the process boundary as raw `rgb24`. Output is always
//! lossless (FFV1 in Matroska) so codes survive bit-exact.

use std::ffi::OsString;
use std::fs;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_FFMPEG, DEFAULT_FFPROBE, DEFAULT_FPS, ENV_FFMPEG, ENV_FFPROBE, OUTPUT_CODEC,
    OUTPUT_FORMAT, PARTIAL_SUFFIX,
};
use crate::video::types::{Frame, FrameSink, FrameSource, VideoError};

/// Locations of the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from(DEFAULT_FFMPEG),
            ffprobe: PathBuf::from(DEFAULT_FFPROBE),
        }
    }
}

impl FfmpegConfig {
    /// Defaults, overridden by `FRAMECODE_FFMPEG` / `FRAMECODE_FFPROBE`.
    pub fn from_env() -> Self {
        let ffmpeg = std::env::var_os(ENV_FFMPEG)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FFMPEG));
        let ffprobe = std::env::var_os(ENV_FFPROBE)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FFPROBE));
        Self { ffmpeg, ffprobe }
    }
}

/// Stream properties reported by `ffprobe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Rational frame rate as ffmpeg prints it, e.g. `30000/1001`.
    pub frame_rate: String,
    pub frame_count: Option<u64>,
}

impl VideoInfo {
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

/// Parse `ffprobe -of json` output for the first video stream.
pub fn parse_probe_json(path: &Path, json: &str) -> Result<VideoInfo, VideoError> {
    let probe_err = |reason: String| VideoError::Probe {
        path: path.to_path_buf(),
        reason,
    };

    let parsed: ProbeOutput =
        serde_json::from_str(json).map_err(|e| probe_err(format!("bad ffprobe output: {e}")))?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| probe_err("no video stream".into()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(probe_err("missing frame dimensions".into())),
    };

    let frame_rate = stream
        .r_frame_rate
        .filter(|r| !r.is_empty() && r != "0/0")
        .unwrap_or_else(|| DEFAULT_FPS.to_string());
    let frame_count = stream.nb_frames.and_then(|n| n.parse::<u64>().ok());

    Ok(VideoInfo {
        width,
        height,
        frame_rate,
        frame_count,
    })
}

pub fn probe(path: &Path, config: &FfmpegConfig) -> Result<VideoInfo, VideoError> {
    let mut args: Vec<OsString> = [
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=width,height,r_frame_rate,nb_frames",
        "-of",
        "json",
    ]
    .iter()
    .map(OsString::from)
    .collect();
    args.push(path.as_os_str().to_owned());

    let output = Command::new(&config.ffprobe)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| VideoError::Spawn {
            program: config.ffprobe.display().to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(VideoError::Probe {
            path: path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_probe_json(path, &String::from_utf8_lossy(&output.stdout))
}

// ================= Reader =================

/// Decodes a container into raw frames, one linear pass.
pub struct FfmpegReader {
    program: String,
    child: Child,
    stdout: BufReader<ChildStdout>,
    info: VideoInfo,
    done: bool,
}

impl FfmpegReader {
    pub fn open(path: &Path, config: &FfmpegConfig) -> Result<Self, VideoError> {
        let info = probe(path, config)?;
        debug!(
            "[VIDEO] opening {:?}: {}x{} @ {} ({:?} frames)",
            path, info.width, info.height, info.frame_rate, info.frame_count
        );

        let program = config.ffmpeg.display().to_string();
        let mut child = Command::new(&config.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| VideoError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = match child.stdout.take() {
            Some(out) => out,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VideoError::Io(std::io::Error::new(
                    ErrorKind::BrokenPipe,
                    "ffmpeg stdout not captured",
                )));
            }
        };

        Ok(Self {
            program,
            child,
            stdout: BufReader::new(stdout),
            info,
            done: false,
        })
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn finish_process(&mut self) -> Result<(), VideoError> {
        self.done = true;
        let status = self.child.wait()?;
        if !status.success() {
            return Err(VideoError::Process {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Fill `buf` until it is full or the reader hits EOF; returns bytes read.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut off = 0;
    while off < buf.len() {
        match r.read(&mut buf[off..]) {
            Ok(0) => break,
            Ok(n) => off += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(off)
}

impl FrameSource for FfmpegReader {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        if self.done {
            return Ok(None);
        }

        let expected = self.info.frame_bytes();
        let mut buf = vec![0u8; expected];
        let n = read_full(&mut self.stdout, &mut buf)?;

        if n == 0 {
            self.finish_process()?;
            return Ok(None);
        }
        if n < expected {
            self.done = true;
            return Err(VideoError::TruncatedFrame {
                expected,
                actual: n,
            });
        }

        // Buffer length matches width * height * 3 by construction.
        Frame::from_raw(self.info.width, self.info.height, buf)
            .map(Some)
            .ok_or(VideoError::TruncatedFrame {
                expected,
                actual: n,
            })
    }

    fn frame_count_hint(&self) -> Option<u64> {
        self.info.frame_count
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

// ================= Writer =================

struct EncoderProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
}

/// Encodes raw frames into `<path>.partial`, renamed to `path` on `finish`.
///
/// The ffmpeg process is spawned on the first frame, which fixes the
/// stream dimensions.
pub struct FfmpegWriter {
    path: PathBuf,
    partial: PathBuf,
    frame_rate: String,
    config: FfmpegConfig,
    process: Option<EncoderProcess>,
    dims: Option<(u32, u32)>,
    frames: u64,
    committed: bool,
}

impl FfmpegWriter {
    pub fn create(path: &Path, frame_rate: &str, config: &FfmpegConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            partial: partial_path(path),
            frame_rate: frame_rate.to_string(),
            config: config.clone(),
            process: None,
            dims: None,
            frames: 0,
            committed: false,
        }
    }

    pub fn partial_path(&self) -> &Path {
        &self.partial
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    fn encoder_args(&self, width: u32, height: u32) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        args.push("-s".into());
        args.push(format!("{width}x{height}").into());
        args.push("-framerate".into());
        args.push(self.frame_rate.clone().into());
        for a in ["-i", "-", "-an", "-c:v", OUTPUT_CODEC, "-f", OUTPUT_FORMAT] {
            args.push(a.into());
        }
        args.push(self.partial.as_os_str().to_owned());
        args
    }

    fn spawn(&mut self, width: u32, height: u32) -> Result<(), VideoError> {
        let program = self.config.ffmpeg.display().to_string();
        debug!("[VIDEO] spawning {} for {:?} ({}x{})", program, self.partial, width, height);

        let mut child = Command::new(&self.config.ffmpeg)
            .args(self.encoder_args(width, height))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|source| VideoError::Spawn { program, source })?;

        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VideoError::Io(std::io::Error::new(
                    ErrorKind::BrokenPipe,
                    "ffmpeg stdin not captured",
                )));
            }
        };

        self.process = Some(EncoderProcess {
            child,
            stdin: BufWriter::new(stdin),
        });
        self.dims = Some((width, height));
        Ok(())
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

impl FrameSink for FfmpegWriter {
    type Output = PathBuf;

    fn append(&mut self, frame: &Frame) -> Result<(), VideoError> {
        let (actual_width, actual_height) = frame.dimensions();
        match self.dims {
            None => self.spawn(actual_width, actual_height)?,
            Some((width, height)) if (width, height) != (actual_width, actual_height) => {
                return Err(VideoError::DimensionMismatch {
                    width,
                    height,
                    actual_width,
                    actual_height,
                });
            }
            Some(_) => {}
        }

        if let Some(proc) = self.process.as_mut() {
            proc.stdin.write_all(frame.as_raw())?;
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<PathBuf, VideoError> {
        let Some(EncoderProcess { mut child, stdin }) = self.process.take() else {
            return Err(VideoError::Empty);
        };

        // Closing stdin signals end of stream to ffmpeg.
        match stdin.into_inner() {
            Ok(pipe) => drop(pipe),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VideoError::Io(e.into_error()));
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(VideoError::Process {
                program: self.config.ffmpeg.display().to_string(),
                status: status.to_string(),
            });
        }

        fs::rename(&self.partial, &self.path)?;
        self.committed = true;
        debug!("[VIDEO] committed {} frames to {:?}", self.frames, self.path);
        Ok(self.path.clone())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if let Some(mut proc) = self.process.take() {
            let _ = proc.child.kill();
            let _ = proc.child.wait();
        }
        if !self.committed {
            match fs::remove_file(&self.partial) {
                Ok(()) => warn!("[VIDEO] discarded unfinished output {:?}", self.partial),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("[VIDEO] could not remove {:?}: {}", self.partial, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_path_appends_suffix() {
        let p = partial_path(Path::new("/tmp/out.mkv"));
        assert_eq!(p, PathBuf::from("/tmp/out.mkv.partial"));
    }

    #[test]
    fn encoder_args_target_partial_file() {
        let writer = FfmpegWriter::create(Path::new("out.mkv"), "25/1", &FfmpegConfig::default());
        let args: Vec<String> = writer
            .encoder_args(64, 48)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert!(args.windows(2).any(|w| w[0] == "-s" && w[1] == "64x48"));
        assert!(args.windows(2).any(|w| w[0] == "-framerate" && w[1] == "25/1"));
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == OUTPUT_CODEC));
        assert_eq!(args.last().map(String::as_str), Some("out.mkv.partial"));
    }
}
