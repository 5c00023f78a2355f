use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
#[cfg(feature = "libpcap")]
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use glob::glob;
use pandar_core::{
    CalibrationTable, DecodeLimits, DecodeSummary, Decoder, FrameInfo, FrameSummary, InputInfo,
    PacketSource, PcapFileSource, PipelineConfig, PointXYZI, decode_source,
};
use tracing::level_filters::LevelFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("PANDAR_BUILD_COMMIT"),
    " ",
    env!("PANDAR_BUILD_DATE"),
    ")"
);

const EXAMPLES: &str = "Examples:\n  pandar pcap decode capture.pcap -o report.json\n  pandar pcap decode capture.pcapng --stdout --per-frame\n  pandar pcap decode capture.pcap --calibration angles.csv --port 2369 -o report.json";

#[cfg(feature = "libpcap")]
const FILTER_HINT: &str = "filters use libpcap syntax, e.g. 'udp port 2368 or udp port 2369'";
#[cfg(not(feature = "libpcap"))]
const FILTER_HINT: &str =
    "this build has no libpcap; rebuild with --features libpcap or pass --filter \"\" to read unfiltered";

#[derive(Parser, Debug)]
#[command(name = "pandar")]
#[command(version = VERSION)]
#[command(
    about = "Decode Hesai Pandar64 point data from packet captures.",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    /// Log verbosity on stderr (off, error, warn, info, debug, trace)
    #[arg(long, env = "PANDAR_LOG", default_value = "warn", global = true)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on PCAP/PCAPNG inputs.
    Pcap {
        #[command(subcommand)]
        command: PcapCommands,
    },
    /// Operations on live network interfaces.
    #[cfg(feature = "libpcap")]
    Live {
        #[command(subcommand)]
        command: LiveCommands,
    },
}

#[derive(Subcommand, Debug)]
enum PcapCommands {
    /// Decode a capture file and write a versioned JSON report.
    #[command(after_help = EXAMPLES)]
    Decode {
        /// Path to a .pcap or .pcapng file (a glob must match exactly one file)
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        decode: DecodeArgs,
    },
}

#[cfg(feature = "libpcap")]
#[derive(Subcommand, Debug)]
enum LiveCommands {
    /// Decode frames from a network interface until Ctrl-C or --max-frames.
    Decode {
        /// Interface name, e.g. eth0
        device: String,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        decode: DecodeArgs,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output report path (JSON)
    #[arg(short = 'o', long, required_unless_present = "stdout")]
    report: Option<PathBuf>,

    /// Write JSON report to stdout
    #[arg(long, conflicts_with = "report")]
    stdout: bool,

    /// Pretty-print JSON output
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,

    /// Compact JSON output (default)
    #[arg(long)]
    compact: bool,

    /// Suppress non-error output
    #[arg(long)]
    quiet: bool,

    /// Exit with a non-zero code if any decode diagnostics were recorded
    #[arg(long)]
    strict: bool,

    /// Add one entry per captured frame to the report
    #[arg(long)]
    per_frame: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// JSON file with capture and decoder settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hesai angle correction CSV (default: Pandar64 design angles)
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Capture filter expression; an empty string disables filtering
    #[arg(long)]
    filter: Option<String>,

    /// Sensor data port
    #[arg(long)]
    port: Option<u16>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Drop payloads that do not match the block layout instead of scanning them
    #[arg(long)]
    no_fallback: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let result = match cli.command {
        Commands::Pcap {
            command:
                PcapCommands::Decode {
                    input,
                    output,
                    decode,
                },
        } => cmd_pcap_decode(input, output, decode),
        #[cfg(feature = "libpcap")]
        Commands::Live {
            command:
                LiveCommands::Decode {
                    device,
                    output,
                    decode,
                },
        } => cmd_live_decode(device, output, decode),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(level: LevelFilter) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn cmd_pcap_decode(input: PathBuf, output: OutputArgs, decode: DecodeArgs) -> Result<(), CliError> {
    let resolved_input = locate_capture(&input)?;
    check_report_target(&resolved_input, &output)?;

    let config = load_config(&decode)?;
    let calibration = load_calibration(decode.calibration.as_deref())?;

    let mut source = PcapFileSource::open(&resolved_input).map_err(|err| {
        CliError::new(
            format!("failed to open capture {}: {err}", resolved_input.display()),
            Some("use a readable .pcap or .pcapng file".to_string()),
        )
    })?;
    if let Some(filter) = config.capture.filter.as_deref() {
        source
            .apply_filter(filter)
            .map_err(|err| CliError::new(err.to_string(), Some(FILTER_HINT.to_string())))?;
    }

    let limits = DecodeLimits {
        max_frames: decode.max_frames,
        stop: None,
    };
    let mut summary = run_decode(&mut source, &config, calibration, &limits, output.per_frame)?;
    source.close();
    summary.input = InputInfo::file(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;

    emit_report(&summary, &output)
}

#[cfg(feature = "libpcap")]
fn cmd_live_decode(device: String, output: OutputArgs, decode: DecodeArgs) -> Result<(), CliError> {
    let config = load_config(&decode)?;
    let calibration = load_calibration(decode.calibration.as_deref())?;

    let mut source =
        pandar_core::LiveCaptureSource::open(&device, &config.capture).map_err(|err| {
            let hint = match err {
                pandar_core::SourceError::FilterCompile { .. } => FILTER_HINT.to_string(),
                _ => "check the interface name and capture permissions".to_string(),
            };
            CliError::new(err.to_string(), Some(hint))
        })?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)).map_err(|err| {
        CliError::new(format!("failed to install Ctrl-C handler: {err}"), None)
    })?;
    let limits = DecodeLimits {
        max_frames: decode.max_frames,
        stop: Some(stop),
    };

    let mut summary = run_decode(&mut source, &config, calibration, &limits, output.per_frame)?;
    source.close();
    summary.input = InputInfo::device(&device);

    emit_report(&summary, &output)
}

fn run_decode(
    source: &mut dyn PacketSource,
    config: &PipelineConfig,
    calibration: Arc<CalibrationTable>,
    limits: &DecodeLimits,
    per_frame: bool,
) -> Result<DecodeSummary, CliError> {
    let decoder = Decoder::new(calibration, &config.decoder);
    let mut frames = Vec::new();
    let mut sink = |frame: &FrameInfo, points: &[PointXYZI]| {
        if per_frame {
            frames.push(FrameSummary::new(frame, points.len()));
        }
    };

    let mut summary =
        decode_source(source, &decoder, &mut sink, limits).context("Decoding failed")?;
    summary.frames = frames;
    Ok(summary)
}

fn load_config(args: &DecodeArgs) -> Result<PipelineConfig, CliError> {
    let mut config = match args.config.as_deref() {
        Some(path) => PipelineConfig::from_path(path).map_err(|err| {
            CliError::new(
                err.to_string(),
                Some("expected a JSON object with optional 'capture' and 'decoder' sections".to_string()),
            )
        })?,
        None => PipelineConfig::default(),
    };

    if let Some(port) = args.port {
        let port_filter = format!("udp port {}", config.decoder.data_port);
        if config.capture.filter.as_deref() == Some(port_filter.as_str()) {
            config.capture.filter = Some(format!("udp port {port}"));
        }
        config.decoder.data_port = port;
    }
    if let Some(filter) = args.filter.as_deref() {
        config.capture.filter = Some(filter.trim().to_string()).filter(|f| !f.is_empty());
    }
    if args.no_fallback {
        config.decoder.linear_fallback = false;
    }
    Ok(config)
}

fn load_calibration(path: Option<&Path>) -> Result<Arc<CalibrationTable>, CliError> {
    let Some(path) = path else {
        return Ok(Arc::new(CalibrationTable::pandar64()));
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read calibration file: {}", path.display()))?;
    let table = CalibrationTable::from_angle_correction_csv(&text).map_err(|err| {
        CliError::new(
            format!("invalid calibration file {}: {err}", path.display()),
            Some("expected 'Channel,Elevation,Azimuth' rows with 1-based channel ids".to_string()),
        )
    })?;
    if table.len() != 64 {
        tracing::warn!(
            lasers = table.len(),
            "calibration does not describe 64 lasers; structured packets will be rejected"
        );
    }
    Ok(Arc::new(table))
}

fn emit_report(summary: &DecodeSummary, output: &OutputArgs) -> Result<(), CliError> {
    let json = if output.pretty {
        serde_json::to_string_pretty(summary)
    } else {
        serde_json::to_string(summary)
    }
    .context("JSON serialization failed")?;

    if output.stdout {
        print!("{}", json);
    } else {
        let report = output.report.as_ref().ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?;
        if let Some(parent) = report.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }
        fs::write(report, json)
            .with_context(|| format!("Failed to write report: {}", report.display()))?;
        if !output.quiet {
            eprintln!(
                "OK: {} frames, {} points -> {}",
                summary.capture.frames_total,
                summary.decode.points_total,
                report.display()
            );
        }
    }

    if output.strict && summary.diagnostics.total() > 0 {
        return Err(CliError::new(
            format!(
                "decode diagnostics detected ({})",
                summary.diagnostics.total()
            ),
            Some("inspect the 'diagnostics' section of the report".to_string()),
        ));
    }
    Ok(())
}

/// Refuse to overwrite the capture with its own report.
fn check_report_target(input: &Path, output: &OutputArgs) -> Result<(), CliError> {
    let Some(report_path) = output.report.as_ref().filter(|_| !output.stdout) else {
        return Ok(());
    };
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;
    let report_dir = match report_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::canonicalize(parent),
        _ => fs::canonicalize("."),
    };
    // A missing output directory cannot hold the input file.
    let Ok(report_dir) = report_dir else {
        return Ok(());
    };
    let Some(file_name) = report_path.file_name() else {
        return Err(CliError::new(
            format!("invalid report path: {}", report_path.display()),
            Some("pass a file path to -o/--report".to_string()),
        ));
    };
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!(
                "report path must differ from input: {}",
                report_path.display()
            ),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

/// Resolve `input` to one existing capture file, expanding a glob pattern
/// when the path itself does not exist.
fn locate_capture(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    let path = if input.exists() || !pattern.contains(['*', '?', '[']) {
        input.to_path_buf()
    } else {
        let pattern_error = |detail: String| {
            CliError::new(
                format!("invalid input pattern '{pattern}'"),
                Some(format!("pattern error: {detail}")),
            )
        };
        let mut matches = Vec::new();
        for entry in glob(&pattern).map_err(|err| pattern_error(err.msg.to_string()))? {
            let path = entry.map_err(|err| pattern_error(err.to_string()))?;
            if path.is_file() {
                matches.push(path);
            }
        }
        match matches.len() {
            0 => {
                return Err(CliError::new(
                    format!("no files match pattern '{pattern}'"),
                    Some("check the path or quote the pattern".to_string()),
                ));
            }
            1 => matches.remove(0),
            count => {
                let listed: Vec<String> =
                    matches.iter().take(3).map(|p| p.display().to_string()).collect();
                let more = if count > 3 { ", ..." } else { "" };
                return Err(CliError::new(
                    format!(
                        "multiple files match pattern '{pattern}' ({count} matches): {}{more}",
                        listed.join(", ")
                    ),
                    Some("pass a single capture file, or run once per file".to_string()),
                ));
            }
        }
    };

    if !path.is_file() {
        let problem = if path.exists() {
            "input is not a file"
        } else {
            "input file not found"
        };
        return Err(CliError::new(
            format!("{problem}: {}", path.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let is_capture = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ext.eq_ignore_ascii_case("pcap") || ext.eq_ignore_ascii_case("pcapng")
        });
    if !is_capture {
        return Err(CliError::new(
            format!("unsupported input format '{}'", path.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(path)
}
