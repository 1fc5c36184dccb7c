use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use framecode_core::code::{CodeEncoder, GridCode};
use framecode_core::constants::{
    DEFAULT_FPS, DEFAULT_GRID_MODULES, DEFAULT_INFLIGHT_FRAMES, DEFAULT_MEM_FRACTION,
    DEFAULT_MODULE_PX, DEFAULT_QUIET_MODULES, MAX_INFLIGHT_FRAMES,
};
use framecode_core::session::{
    decode_payload, encode_payload, max_chunk_size, ParallelismProfile, SessionConfig,
};
use framecode_core::stego::CarrierScanner;
use framecode_core::telemetry::TelemetrySnapshot;
use framecode_core::types::StegoError;
use framecode_core::video::{FfmpegConfig, FfmpegReader, FfmpegWriter, FrameSource};

/// framecode: hide a file in a video as a sequence of visual codes, and get it back.
#[derive(Parser, Debug)]
#[command(name = "framecode", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a binary file into a video
    Encode {
        /// Carrier (cover) video whose frames receive the codes
        #[arg(short = 'v', long = "video", required_unless_present = "no_carrier")]
        video: Option<PathBuf>,

        /// Binary file to hide
        #[arg(short = 'b', long = "binary")]
        binary: PathBuf,

        /// Output video (written as FFV1/Matroska)
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        /// Emit bare code frames instead of embedding into a carrier
        #[arg(long, conflicts_with = "video")]
        no_carrier: bool,

        /// Frame rate of the output when there is no carrier
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,

        /// Padded chunk size in bytes (default: the largest the code allows)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Refuse payloads that need more than this many frames
        #[arg(long)]
        max_frames: Option<u32>,

        /// Drop carrier frames after the last code instead of copying them
        #[arg(long)]
        trim_carrier: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Decode a video back into the binary file
    Decode {
        /// Video produced by `encode`
        #[arg(short = 'v', long = "video")]
        video: PathBuf,

        /// Output binary file
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Print progress information
    #[arg(long)]
    verbose: bool,

    /// Print the telemetry snapshot as JSON on stdout
    #[arg(long)]
    report: bool,

    /// Worker threads (default: one per core, minus one)
    #[arg(long)]
    workers: Option<usize>,

    /// Code modules per side (must match between encode and decode)
    #[arg(long, default_value_t = DEFAULT_GRID_MODULES)]
    modules: u32,

    /// Pixels per code module (must match between encode and decode)
    #[arg(long, default_value_t = DEFAULT_MODULE_PX)]
    module_px: u32,
}

impl CommonArgs {
    fn grid(&self) -> Result<GridCode> {
        GridCode::new(self.modules, self.module_px, DEFAULT_QUIET_MODULES)
            .map_err(StegoError::from)
            .context("invalid code geometry")
    }

    fn session_config(&self, frame_bytes: u64) -> SessionConfig {
        let profile = match self.workers {
            None => ParallelismProfile::dynamic(frame_bytes, DEFAULT_MEM_FRACTION, MAX_INFLIGHT_FRAMES),
            Some(n) if n <= 1 => ParallelismProfile::single_threaded(),
            Some(n) => ParallelismProfile::new(n, DEFAULT_INFLIGHT_FRAMES),
        };
        SessionConfig {
            verbose: self.verbose,
            profile,
            ..SessionConfig::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Commands::Encode { common, .. } | Commands::Decode { common, .. } => common.verbose,
    };
    init_tracing(verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Distinct status per error kind; anything outside the core is a plain failure.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<StegoError>())
        .map(|e| e.exit_code().clamp(1, 255) as u8)
        .unwrap_or(1)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Encode {
            video,
            binary,
            output,
            no_carrier,
            fps,
            chunk_size,
            max_frames,
            trim_carrier,
            common,
        } => {
            require_file(&binary, "binary")?;
            if let Some(video) = &video {
                require_file(video, "carrier video")?;
                refuse_same_file(video, &output)?;
            }
            refuse_same_file(&binary, &output)?;

            let grid = common.grid()?;
            let side = grid.side_px() as u64;
            let mut config = common.session_config(side * side * 3);
            config.chunk_size = chunk_size;
            config.max_frames = max_frames;
            config.passthrough_carrier_tail = !trim_carrier;
            info!(
                "code {}x{} px, {} bytes per frame, chunk size up to {}",
                grid.side_px(),
                grid.side_px(),
                grid.capacity(),
                max_chunk_size(&grid)
            );

            let payload = fs::read(&binary).with_context(|| format!("reading {}", binary.display()))?;
            let ffmpeg = FfmpegConfig::from_env();

            let outcome = match video.filter(|_| !no_carrier) {
                Some(video) => {
                    let mut carrier = FfmpegReader::open(&video, &ffmpeg)
                        .map_err(StegoError::from)
                        .with_context(|| format!("opening carrier {}", video.display()))?;
                    let writer = FfmpegWriter::create(&output, &carrier.info().frame_rate, &ffmpeg);
                    encode_payload(&payload, &grid, writer, Some(&mut carrier as &mut dyn FrameSource), &config)?
                }
                None => {
                    let writer = FfmpegWriter::create(&output, &fps.to_string(), &ffmpeg);
                    encode_payload(&payload, &grid, writer, None, &config)?
                }
            };

            info!(
                "wrote {} ({} frames)",
                outcome.output.display(),
                outcome.snapshot.counters.frames_written
            );
            if common.report {
                print_report(&outcome.snapshot)?;
            }
            Ok(())
        }

        Commands::Decode { video, output, common } => {
            require_file(&video, "video")?;
            refuse_same_file(&video, &output)?;

            let grid = common.grid()?;
            let ffmpeg = FfmpegConfig::from_env();
            let reader = FfmpegReader::open(&video, &ffmpeg)
                .map_err(StegoError::from)
                .with_context(|| format!("opening {}", video.display()))?;
            let info = reader.info();
            let config = common.session_config(info.frame_bytes() as u64);

            let scanner = CarrierScanner::new(grid);
            let outcome = decode_payload(reader, &scanner, &config)?;

            fs::write(&output, &outcome.payload)
                .with_context(|| format!("writing {}", output.display()))?;
            info!("recovered {} bytes into {}", outcome.payload.len(), output.display());
            if common.report {
                print_report(&outcome.snapshot)?;
            }
            Ok(())
        }
    }
}

fn print_report(snapshot: &TelemetrySnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("serializing telemetry")?;
    println!("{json}");
    Ok(())
}

fn require_file(path: &Path, what: &str) -> Result<(), StegoError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(StegoError::InvalidConfig(format!("{what} {} does not exist", path.display())))
    }
}

fn refuse_same_file(input: &Path, output: &Path) -> Result<(), StegoError> {
    if same_file(input, output) {
        return Err(StegoError::InvalidConfig(format!(
            "output {} would overwrite input {}",
            output.display(),
            input.display()
        )));
    }
    Ok(())
}

/// Compare two paths after resolving symlinks and `..`; a missing file is
/// resolved through its parent directory.
fn same_file(a: &Path, b: &Path) -> bool {
    resolve(a) == resolve(b)
}

fn resolve(path: &Path) -> PathBuf {
    if let Ok(p) = path.canonicalize() {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            parent
                .canonicalize()
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_file_sees_through_relative_segments() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("clip.mkv");
        fs::write(&file, b"x").unwrap();

        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let roundabout = sub.join("..").join("clip.mkv");

        assert!(same_file(&file, &roundabout));
        assert!(!same_file(&file, &dir.path().join("other.mkv")));
    }

    #[test]
    fn same_file_handles_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-yet.bin");
        assert!(same_file(&missing, &dir.path().join(".").join("not-yet.bin")));
    }

    #[test]
    fn refuse_same_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("in.mkv");
        fs::write(&file, b"x").unwrap();

        let err = refuse_same_file(&file, &file).unwrap_err();
        assert!(matches!(err, StegoError::InvalidConfig(_)));
    }

    #[test]
    fn exit_code_follows_core_error_kind() {
        let err = anyhow::Error::from(StegoError::IncompleteRecovery {
            total_chunks: Some(3),
            missing: vec![1],
        })
        .context("decoding");
        assert_eq!(exit_code_for(&err), 5);

        let other = anyhow::anyhow!("plain failure");
        assert_eq!(exit_code_for(&other), 1);
    }

    #[test]
    fn encode_requires_carrier_unless_disabled() {
        assert!(Cli::try_parse_from(["framecode", "encode", "-b", "in.bin", "-o", "out.mkv"]).is_err());

        let cli = Cli::try_parse_from(["framecode", "encode", "-b", "in.bin", "-o", "out.mkv", "--no-carrier"])
            .unwrap();
        match cli.command {
            Commands::Encode { no_carrier, video, .. } => {
                assert!(no_carrier);
                assert!(video.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn decode_parses_short_flags() {
        let cli = Cli::try_parse_from(["framecode", "decode", "-v", "in.mkv", "-o", "out.bin", "--verbose", "--workers", "1"])
            .unwrap();
        match cli.command {
            Commands::Decode { video, output, common } => {
                assert_eq!(video, PathBuf::from("in.mkv"));
                assert_eq!(output, PathBuf::from("out.bin"));
                assert!(common.verbose);
                assert_eq!(common.session_config(1).profile, ParallelismProfile::single_threaded());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
