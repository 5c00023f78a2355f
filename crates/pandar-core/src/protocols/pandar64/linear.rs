//! Marker-driven scan for payloads that do not fit the block layout.
//!
//! The scanner looks for `EE FF` anywhere in the payload, reads the azimuth
//! that follows it, then consumes 3-byte channel records until the next
//! marker or the end of the buffer. Laser ids are the running record count
//! modulo the calibration size, zero-distance records included.

use super::error::Pandar64Error;
use super::parser::Pandar64Parser;
use super::reader::Pandar64Reader;
use crate::point::PointXYZI;

impl Pandar64Parser {
    /// Decode a payload by scanning for start markers.
    ///
    /// Uses the configured fallback distance unit and applies no minimum
    /// range; only zero distances are skipped.
    pub fn parse_linear(&self, payload: &[u8]) -> Result<Vec<PointXYZI>, Pandar64Error> {
        let mut reader = Pandar64Reader::new(payload);
        let lasers = self.calibration.len();
        let mut points = Vec::new();
        let mut markers = 0usize;

        while reader.seek_marker() {
            reader.skip_marker()?;
            let Ok(azimuth) = reader.read_azimuth() else {
                break;
            };
            markers += 1;
            let azimuth_deg = azimuth.degrees();

            let mut records = 0usize;
            while !reader.at_marker() {
                let Ok(channel) = reader.read_channel() else {
                    break;
                };
                let laser_id = records % lasers;
                records += 1;
                if !channel.is_return() {
                    continue;
                }
                let Some(entry) = self.calibration.get(laser_id) else {
                    continue;
                };
                points.push(PointXYZI::from_polar(
                    channel.distance_m(self.fallback_distance_unit_m),
                    azimuth_deg,
                    entry,
                    channel.intensity,
                ));
            }
        }

        if markers == 0 {
            return Err(Pandar64Error::NoStartMarker {
                payload_len: payload.len(),
            });
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::calibration::{CalibrationEntry, CalibrationTable};
    use crate::config::DecoderConfig;
    use crate::point::PointXYZI;
    use crate::protocols::pandar64::error::Pandar64Error;
    use crate::protocols::pandar64::{DecodeMode, Pandar64Parser};

    const MARKER: [u8; 2] = [0xee, 0xff];

    fn parser() -> Pandar64Parser {
        Pandar64Parser::new(
            Arc::new(CalibrationTable::pandar64()),
            &DecoderConfig::default(),
        )
    }

    fn record(distance: u16, intensity: u8) -> [u8; 3] {
        let [lo, hi] = distance.to_le_bytes();
        [lo, hi, intensity]
    }

    #[test]
    fn marker_inside_buffer_is_found() {
        let mut payload = vec![0x01, 0x02, 0x03];
        payload.extend_from_slice(&MARKER);
        payload.extend_from_slice(&9000u16.to_le_bytes());
        payload.extend_from_slice(&record(500, 7));

        let parsed = parser().parse(&payload);
        assert_eq!(parsed.mode, Some(DecodeMode::Linear));
        let entry = CalibrationTable::pandar64().lookup(0).unwrap();
        assert_eq!(
            parsed.points,
            vec![PointXYZI::from_polar(500.0 * 0.004, 90.0, &entry, 7)]
        );
    }

    #[test]
    fn laser_id_wraps_with_record_count() {
        let mut payload = MARKER.to_vec();
        payload.extend_from_slice(&0u16.to_le_bytes());
        for _ in 0..65 {
            payload.extend_from_slice(&record(0, 0));
        }
        payload.extend_from_slice(&record(250, 3));

        let points = parser().parse_linear(&payload).unwrap();
        let entry = CalibrationTable::pandar64().lookup(1).unwrap();
        assert_eq!(points, vec![PointXYZI::from_polar(1.0, 0.0, &entry, 3)]);
    }

    #[test]
    fn next_marker_restarts_record_count() {
        let mut payload = MARKER.to_vec();
        payload.extend_from_slice(&1000u16.to_le_bytes());
        payload.extend_from_slice(&record(300, 1));
        payload.extend_from_slice(&record(400, 2));
        payload.extend_from_slice(&MARKER);
        payload.extend_from_slice(&18000u16.to_le_bytes());
        payload.extend_from_slice(&record(500, 3));

        let points = parser().parse_linear(&payload).unwrap();
        let table = CalibrationTable::pandar64();
        assert_eq!(
            points,
            vec![
                PointXYZI::from_polar(300.0 * 0.004, 10.0, &table.lookup(0).unwrap(), 1),
                PointXYZI::from_polar(400.0 * 0.004, 10.0, &table.lookup(1).unwrap(), 2),
                PointXYZI::from_polar(500.0 * 0.004, 180.0, &table.lookup(0).unwrap(), 3),
            ]
        );
    }

    #[test]
    fn short_returns_are_kept() {
        let mut payload = MARKER.to_vec();
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.extend_from_slice(&record(10, 1));

        let points = parser().parse_linear(&payload).unwrap();
        assert_eq!(points.len(), 1);
        assert!(points[0].range() < 0.3);
    }

    #[test]
    fn trailing_partial_record_is_ignored() {
        let mut payload = MARKER.to_vec();
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.extend_from_slice(&record(100, 1));
        payload.extend_from_slice(&[0x64, 0x00]);

        let points = parser().parse_linear(&payload).unwrap();
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn custom_table_size_drives_wrap() {
        let table = CalibrationTable::new(vec![
            CalibrationEntry::new(0.0, 0.0),
            CalibrationEntry::new(10.0, 0.0),
        ])
        .unwrap();
        let parser = Pandar64Parser::new(Arc::new(table.clone()), &DecoderConfig::default());
        let mut payload = MARKER.to_vec();
        payload.extend_from_slice(&0u16.to_le_bytes());
        for distance in [250u16, 250, 250] {
            payload.extend_from_slice(&record(distance, 0));
        }

        let points = parser.parse_linear(&payload).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], points[2]);
        assert_eq!(
            points[1],
            PointXYZI::from_polar(1.0, 0.0, &table.lookup(1).unwrap(), 0)
        );
    }

    #[test]
    fn payload_without_marker_is_rejected() {
        let err = parser().parse_linear(&[0x00; 16]).unwrap_err();
        assert_eq!(err, Pandar64Error::NoStartMarker { payload_len: 16 });
    }

    #[test]
    fn marker_without_azimuth_is_rejected() {
        let err = parser().parse_linear(&[0x00, 0xee, 0xff, 0x01]).unwrap_err();
        assert_eq!(err, Pandar64Error::NoStartMarker { payload_len: 4 });
    }
}
