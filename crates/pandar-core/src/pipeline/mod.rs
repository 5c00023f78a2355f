//! Frame-at-a-time decoding loop.
//!
//! [`Decoder`] turns one [`RawFrame`] into a [`DecodedFrame`]; it holds no
//! per-frame state, so frames decode identically regardless of order.
//! [`decode_source`] drains a [`PacketSource`] through a decoder into a
//! [`PointCloudSink`] and tallies a [`DecodeSummary`] along the way;
//! [`DecodeLimits`] bound how long it runs.

mod sink;

pub use sink::{CollectingSink, FrameInfo, PointCloudSink};

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::calibration::CalibrationTable;
use crate::config::{ConfigError, DecoderConfig, PipelineConfig};
use crate::decap::FrameDecapsulator;
use crate::diagnostics::Diagnostic;
use crate::point::PointXYZI;
use crate::protocols::pandar64::{DecodeMode, Pandar64Parser};
use crate::source::{PacketSource, PcapFileSource, RawFrame, SourceError, SourceEvent};
use crate::{DecodeSummary, InputInfo};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Points and diagnostics produced from one captured frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedFrame {
    pub points: Vec<PointXYZI>,
    pub mode: Option<DecodeMode>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Decapsulation plus Pandar64 parsing for a fixed calibration.
#[derive(Debug, Clone)]
pub struct Decoder {
    decapsulator: FrameDecapsulator,
    parser: Pandar64Parser,
}

impl Decoder {
    pub fn new(calibration: Arc<CalibrationTable>, config: &DecoderConfig) -> Self {
        Self {
            decapsulator: FrameDecapsulator::new(config.data_port),
            parser: Pandar64Parser::new(calibration, config),
        }
    }

    /// Decode one frame. Never fails: problems come back as diagnostics next
    /// to an empty or partial cloud.
    pub fn decode_frame(&self, frame: &RawFrame) -> DecodedFrame {
        let payload = match self.decapsulator.decapsulate(frame) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(error = %err, len = frame.captured_len, "frame rejected");
                return DecodedFrame {
                    diagnostics: vec![Diagnostic::TruncatedFrame(err)],
                    ..DecodedFrame::default()
                };
            }
        };

        let mut diagnostics = Vec::new();
        if payload.port_mismatch {
            diagnostics.push(Diagnostic::PortMismatch {
                expected: self.decapsulator.data_port(),
                actual: payload.dst_port,
            });
        }

        let parsed = self.parser.parse(payload.bytes);
        if let Some(issue) = parsed.issue {
            debug!(error = %issue, src = %payload.src_ip, "payload rejected");
            diagnostics.push(Diagnostic::Packet(issue));
        }
        DecodedFrame {
            points: parsed.points,
            mode: parsed.mode,
            diagnostics,
        }
    }
}

/// When [`decode_source`] stops before its source runs dry.
#[derive(Debug, Clone, Default)]
pub struct DecodeLimits {
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
    /// Stop once this flag is set. Checked before every read and whenever a
    /// live source reports an idle timeout.
    pub stop: Option<Arc<AtomicBool>>,
}

impl DecodeLimits {
    pub fn max_frames(max_frames: u64) -> Self {
        Self {
            max_frames: Some(max_frames),
            stop: None,
        }
    }

    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn should_stop(&self, decoded: u64) -> bool {
        self.max_frames.is_some_and(|max| decoded >= max)
            || self
                .stop
                .as_ref()
                .is_some_and(|stop| stop.load(Ordering::SeqCst))
    }
}

/// Decode frames of `source` into `sink` until it runs dry or `limits` say
/// to stop.
///
/// The returned summary has an empty `input`; callers that know where the
/// frames came from fill it in.
pub fn decode_source<S, K>(
    source: &mut S,
    decoder: &Decoder,
    sink: &mut K,
    limits: &DecodeLimits,
) -> Result<DecodeSummary, PipelineError>
where
    S: PacketSource + ?Sized,
    K: PointCloudSink + ?Sized,
{
    let mut summary = DecodeSummary::new(InputInfo::default());
    let mut first_ts = None;
    let mut last_ts = None;
    let mut warned_ports = HashSet::new();
    let mut index = 0u64;

    while !limits.should_stop(index) {
        let frame = match source.poll_packet()? {
            SourceEvent::Frame(frame) => frame,
            SourceEvent::Idle => continue,
            SourceEvent::End => break,
        };
        update_ts_bounds(&mut first_ts, &mut last_ts, (frame.ts_sec, frame.ts_usec));

        let decoded = decoder.decode_frame(&frame);
        for diagnostic in &decoded.diagnostics {
            if let Diagnostic::PortMismatch { expected, actual } = diagnostic {
                if warned_ports.insert(*actual) {
                    warn!(port = actual, expected, "traffic on unexpected destination port");
                }
            }
        }
        summary.record_frame(decoded.mode, decoded.points.len(), &decoded.diagnostics);
        trace!(
            index,
            points = decoded.points.len(),
            mode = ?decoded.mode,
            "decoded frame"
        );

        let info = FrameInfo {
            index,
            ts_sec: frame.ts_sec,
            ts_usec: frame.ts_usec,
            captured_len: frame.captured_len,
            mode: decoded.mode,
            diagnostics: decoded.diagnostics,
        };
        sink.on_cloud(&info, &decoded.points);
        index += 1;
    }

    summary.finish(first_ts, last_ts);
    if limits.stop.as_ref().is_some_and(|stop| stop.load(Ordering::SeqCst)) {
        info!(frames = index, "decode interrupted");
    }
    info!(
        frames = summary.capture.frames_total,
        points = summary.decode.points_total,
        diagnostics = summary.diagnostics.total(),
        "decode finished"
    );
    Ok(summary)
}

/// Replay a capture file through the full pipeline.
///
/// The configured capture filter, if any, is applied before decoding.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
///
/// use pandar_core::{CalibrationTable, CollectingSink, PipelineConfig, decode_capture_file};
///
/// let mut sink = CollectingSink::new();
/// let summary = decode_capture_file(
///     Path::new("capture.pcap"),
///     &PipelineConfig::default(),
///     Arc::new(CalibrationTable::pandar64()),
///     &mut sink,
/// )?;
/// println!("{} points", summary.decode.points_total);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn decode_capture_file<K>(
    path: &Path,
    config: &PipelineConfig,
    calibration: Arc<CalibrationTable>,
    sink: &mut K,
) -> Result<DecodeSummary, PipelineError>
where
    K: PointCloudSink + ?Sized,
{
    config.decoder.validate()?;
    let mut source = PcapFileSource::open(path)?;
    if let Some(filter) = config.capture.filter.as_deref() {
        source.apply_filter(filter)?;
    }
    let decoder = Decoder::new(calibration, &config.decoder);
    let mut summary = decode_source(&mut source, &decoder, sink, &DecodeLimits::default())?;
    source.close();
    summary.input = InputInfo::file(path)?;
    Ok(summary)
}

fn update_ts_bounds(first: &mut Option<(u32, u32)>, last: &mut Option<(u32, u32)>, ts: (u32, u32)) {
    if first.is_none_or(|existing| ts < existing) {
        *first = Some(ts);
    }
    if last.is_none_or(|existing| ts > existing) {
        *last = Some(ts);
    }
}
