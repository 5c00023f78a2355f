//! Pandar64 capture decoding.
//!
//! This crate turns captured Ethernet frames carrying Hesai Pandar64 UDP
//! point data into calibrated point clouds. Packet sources feed the
//! pipeline, which strips link/network framing (`decap`), decodes the sensor
//! payload (`protocols::pandar64`, layout/reader/parser) and projects every
//! return through a shared calibration table. All I/O stays in `source`;
//! decoding is byte-oriented and side-effect free.
//!
//! Invariants:
//! - Decoding is deterministic: equal input bytes give bit-identical points.
//! - A frame never aborts a run; problems surface as [`Diagnostic`]s.
//! - The calibration table is immutable and shared through an `Arc`.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use pandar_core::{CalibrationTable, PipelineConfig, decode_capture_file};
//!
//! let mut clouds = 0;
//! let summary = decode_capture_file(
//!     Path::new("capture.pcap"),
//!     &PipelineConfig::default(),
//!     Arc::new(CalibrationTable::pandar64()),
//!     &mut |_: &pandar_core::FrameInfo, _: &[pandar_core::PointXYZI]| clouds += 1,
//! )?;
//! println!("report version: {}", summary.report_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

mod calibration;
mod config;
mod decap;
mod diagnostics;
mod geometry;
mod pipeline;
mod point;
pub mod protocols;
mod source;
#[cfg(test)]
mod test_support;

pub use calibration::{CalibrationEntry, CalibrationError, CalibrationTable};
pub use config::{
    CaptureConfig, ConfigError, DEFAULT_DATA_PORT, DecoderConfig, PipelineConfig,
};
pub use decap::{DecapError, FrameDecapsulator, Payload, decapsulate};
pub use diagnostics::{Diagnostic, DiagnosticCounts, DiagnosticKind};
pub use geometry::project;
pub use pipeline::{
    CollectingSink, DecodeLimits, DecodedFrame, Decoder, FrameInfo, PipelineError,
    PointCloudSink, decode_capture_file, decode_source,
};
pub use point::PointXYZI;
pub use protocols::common::CursorError;
pub use protocols::pandar64::{DecodeMode, Pandar64Error, Pandar64Parser, ParsedPacket};
#[cfg(feature = "libpcap")]
pub use source::LiveCaptureSource;
pub use source::{
    CaptureFilter, PacketSource, PcapFileSource, RawFrame, SourceError, SourceEvent,
};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no capture time is available.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Serializable record of one decode run.
///
/// # Examples
/// ```
/// use pandar_core::{DecodeSummary, InputInfo};
///
/// let summary = DecodeSummary::new(InputInfo::default());
/// assert_eq!(summary.report_version, pandar_core::REPORT_VERSION);
/// assert_eq!(summary.capture.frames_total, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeSummary {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 time of the last captured frame, so reruns produce equal reports.
    pub generated_at: String,
    pub input: InputInfo,
    pub capture: CaptureSummary,
    pub decode: DecodeCounts,
    pub diagnostics: DiagnosticCounts,
    /// Per-frame detail, only filled when a caller asks for it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<FrameSummary>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Where the decoded frames came from.
///
/// # Examples
/// ```
/// use pandar_core::InputInfo;
///
/// let input = InputInfo {
///     path: "capture.pcapng".to_string(),
///     bytes: Some(1024),
/// };
/// assert_eq!(input.bytes, Some(1024));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputInfo {
    /// Capture path, or device name for live capture.
    pub path: String,
    /// Input size in bytes, when the input is a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
}

impl InputInfo {
    pub fn file(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            path: path.display().to_string(),
            bytes: Some(path.metadata()?.len()),
        })
    }

    pub fn device(name: &str) -> Self {
        Self {
            path: name.to_string(),
            bytes: None,
        }
    }
}

/// Frame count and capture time bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub frames_total: u64,
    /// RFC3339 timestamp of the earliest frame (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    /// RFC3339 timestamp of the latest frame (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeCounts {
    pub frames_with_points: u64,
    pub points_total: u64,
    pub structured_packets: u64,
    pub linear_packets: u64,
    /// Frames that produced no decode at all.
    pub rejected_packets: u64,
}

/// One frame's outcome, for per-frame reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub points: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<DecodeMode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<DiagnosticKind>,
}

impl FrameSummary {
    pub fn new(frame: &FrameInfo, points: usize) -> Self {
        Self {
            index: frame.index,
            time: ts_to_rfc3339(frame.ts_sec, frame.ts_usec),
            points: points as u64,
            mode: frame.mode,
            diagnostics: frame.diagnostics.iter().map(Diagnostic::kind).collect(),
        }
    }
}

impl DecodeSummary {
    pub fn new(input: InputInfo) -> Self {
        Self {
            report_version: REPORT_VERSION,
            tool: ToolInfo {
                name: "pandar".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            generated_at: DEFAULT_GENERATED_AT.to_string(),
            input,
            capture: CaptureSummary::default(),
            decode: DecodeCounts::default(),
            diagnostics: DiagnosticCounts::default(),
            frames: Vec::new(),
        }
    }

    /// Fold one decoded frame into the counters.
    pub fn record_frame(
        &mut self,
        mode: Option<DecodeMode>,
        points: usize,
        diagnostics: &[Diagnostic],
    ) {
        self.capture.frames_total += 1;
        if points > 0 {
            self.decode.frames_with_points += 1;
        }
        self.decode.points_total += points as u64;
        match mode {
            Some(DecodeMode::Structured) => self.decode.structured_packets += 1,
            Some(DecodeMode::Linear) => self.decode.linear_packets += 1,
            None => self.decode.rejected_packets += 1,
        }
        for diagnostic in diagnostics {
            self.diagnostics.record(diagnostic.kind());
        }
    }

    /// Set the capture time bounds from `(seconds, microseconds)` pairs.
    pub fn finish(&mut self, first: Option<(u32, u32)>, last: Option<(u32, u32)>) {
        self.capture.time_start = first.and_then(|(sec, usec)| ts_to_rfc3339(sec, usec));
        self.capture.time_end = last.and_then(|(sec, usec)| ts_to_rfc3339(sec, usec));
        self.generated_at = self
            .capture
            .time_end
            .clone()
            .or_else(|| self.capture.time_start.clone())
            .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
    }
}

fn ts_to_rfc3339(ts_sec: u32, ts_usec: u32) -> Option<String> {
    let nanos = i128::from(ts_sec) * 1_000_000_000 + i128::from(ts_usec) * 1_000;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_omits_optional_fields_when_none() {
        let summary = DecodeSummary::new(InputInfo::device("eth0"));

        let value = serde_json::to_value(&summary).expect("summary json");
        assert!(value["input"].get("bytes").is_none());
        assert!(value["capture"].get("time_start").is_none());
        assert!(value["capture"].get("time_end").is_none());
        assert!(value.get("frames").is_none());
        assert_eq!(value["tool"]["name"], "pandar");
        assert_eq!(value["generated_at"], DEFAULT_GENERATED_AT);
    }

    #[test]
    fn record_frame_counts_modes_and_diagnostics() {
        let mut summary = DecodeSummary::new(InputInfo::default());
        summary.record_frame(Some(DecodeMode::Structured), 10, &[]);
        summary.record_frame(Some(DecodeMode::Linear), 0, &[]);
        summary.record_frame(
            None,
            0,
            &[Diagnostic::PortMismatch {
                expected: 2368,
                actual: 9999,
            }],
        );

        assert_eq!(summary.capture.frames_total, 3);
        assert_eq!(summary.decode.frames_with_points, 1);
        assert_eq!(summary.decode.points_total, 10);
        assert_eq!(summary.decode.structured_packets, 1);
        assert_eq!(summary.decode.linear_packets, 1);
        assert_eq!(summary.decode.rejected_packets, 1);
        assert_eq!(summary.diagnostics.port_mismatch, 1);
    }

    #[test]
    fn finish_uses_last_frame_time() {
        let mut summary = DecodeSummary::new(InputInfo::default());
        summary.finish(Some((0, 0)), Some((60, 500_000)));
        assert_eq!(summary.capture.time_start.as_deref(), Some("1970-01-01T00:00:00Z"));
        assert_eq!(summary.generated_at, "1970-01-01T00:01:00.5Z");
    }

    #[test]
    fn frame_summary_lists_diagnostic_kinds() {
        let info = FrameInfo {
            index: 4,
            ts_sec: 1,
            ts_usec: 0,
            captured_len: 10,
            mode: None,
            diagnostics: vec![Diagnostic::TruncatedFrame(DecapError::EmptyPayload)],
        };
        let frame = FrameSummary::new(&info, 0);
        assert_eq!(frame.index, 4);
        assert_eq!(frame.diagnostics, vec![DiagnosticKind::TruncatedFrame]);
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["diagnostics"][0], "truncated_frame");
        assert!(value.get("mode").is_none());
    }
}
