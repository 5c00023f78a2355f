use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::error::Pandar64Error;
use super::reader::{PacketHeader, Pandar64Reader};
use crate::calibration::CalibrationTable;
use crate::config::DecoderConfig;
use crate::point::PointXYZI;

/// Which decoding path produced a packet's points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    Structured,
    Linear,
}

/// Outcome of decoding one UDP payload.
///
/// `mode` is `None` when the payload was rejected; `issue` then says why.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPacket {
    pub points: Vec<PointXYZI>,
    pub mode: Option<DecodeMode>,
    pub issue: Option<Pandar64Error>,
}

impl ParsedPacket {
    fn decoded(points: Vec<PointXYZI>, mode: DecodeMode) -> Self {
        Self {
            points,
            mode: Some(mode),
            issue: None,
        }
    }

    fn rejected(issue: Pandar64Error) -> Self {
        Self {
            points: Vec::new(),
            mode: None,
            issue: Some(issue),
        }
    }
}

/// Pandar64 payload decoder bound to one calibration table.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use pandar_core::{CalibrationTable, DecoderConfig};
/// use pandar_core::protocols::pandar64::Pandar64Parser;
///
/// let parser = Pandar64Parser::new(Arc::new(CalibrationTable::pandar64()), &DecoderConfig::default());
/// let parsed = parser.parse(&[0x00, 0x01, 0x02]);
/// assert!(parsed.points.is_empty());
/// assert!(parsed.issue.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Pandar64Parser {
    pub(super) calibration: Arc<CalibrationTable>,
    minimum_range_m: f64,
    pub(super) fallback_distance_unit_m: f64,
    expected_blocks: u8,
    linear_fallback: bool,
}

impl Pandar64Parser {
    pub fn new(calibration: Arc<CalibrationTable>, config: &DecoderConfig) -> Self {
        Self {
            calibration,
            minimum_range_m: config.minimum_range_m,
            fallback_distance_unit_m: config.fallback_distance_unit_m,
            expected_blocks: config.expected_blocks,
            linear_fallback: config.linear_fallback,
        }
    }

    /// Decode one payload, choosing the structured or linear path.
    ///
    /// A payload that starts with the marker but declares the wrong geometry
    /// is dropped outright. A marker-led payload that ends before its last
    /// block, or one with no leading marker, is handed to the linear scanner
    /// when that is enabled.
    pub fn parse(&self, payload: &[u8]) -> ParsedPacket {
        let leading_marker = Pandar64Reader::new(payload).at_marker();
        if leading_marker {
            match self.parse_structured(payload) {
                Ok(points) => {
                    trace!(points = points.len(), "structured packet");
                    return ParsedPacket::decoded(points, DecodeMode::Structured);
                }
                Err(err @ Pandar64Error::InvalidHeader { .. }) => {
                    debug!(error = %err, "dropping packet");
                    return ParsedPacket::rejected(err);
                }
                Err(err) if !self.linear_fallback => return ParsedPacket::rejected(err),
                Err(err) => debug!(error = %err, "structured decode failed, scanning linearly"),
            }
        } else if !self.linear_fallback {
            return ParsedPacket::rejected(Pandar64Error::NoStartMarker {
                payload_len: payload.len(),
            });
        }

        match self.parse_linear(payload) {
            Ok(points) => {
                trace!(points = points.len(), "linear packet");
                ParsedPacket::decoded(points, DecodeMode::Linear)
            }
            Err(err) => ParsedPacket::rejected(err),
        }
    }

    /// Decode a conforming packet block by block.
    ///
    /// The distance unit comes from the header. Zero distances and returns
    /// closer than the configured minimum range are skipped.
    pub fn parse_structured(&self, payload: &[u8]) -> Result<Vec<PointXYZI>, Pandar64Error> {
        let mut reader = Pandar64Reader::new(payload);
        let header = reader.read_header()?;
        if !header.has_marker() {
            return Err(Pandar64Error::NoStartMarker {
                payload_len: reader.payload_len(),
            });
        }
        self.validate_header(&header)?;

        let unit_m = header.distance_unit_m();
        let mut points =
            Vec::with_capacity(usize::from(header.block_count) * self.calibration.len());
        for _ in 0..header.block_count {
            let azimuth_deg = reader.read_azimuth()?.degrees();
            for entry in self.calibration.iter() {
                let channel = reader.read_channel()?;
                if !channel.is_return() {
                    continue;
                }
                let distance_m = channel.distance_m(unit_m);
                if distance_m < self.minimum_range_m {
                    continue;
                }
                points.push(PointXYZI::from_polar(
                    distance_m,
                    azimuth_deg,
                    entry,
                    channel.intensity,
                ));
            }
        }
        Ok(points)
    }

    fn validate_header(&self, header: &PacketHeader) -> Result<(), Pandar64Error> {
        if usize::from(header.laser_count) != self.calibration.len()
            || header.block_count != self.expected_blocks
        {
            return Err(Pandar64Error::InvalidHeader {
                laser_count: header.laser_count,
                block_count: header.block_count,
                expected_lasers: self.calibration.len(),
                expected_blocks: self.expected_blocks,
            });
        }
        Ok(())
    }
}
