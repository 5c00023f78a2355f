use super::error::Pandar64Error;
use super::layout;
use crate::protocols::common::{ByteCursor, CursorError};

/// Fixed 8-byte Pandar64 packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub marker: u16,
    pub laser_count: u8,
    pub block_count: u8,
    pub first_block_return: u8,
    pub distance_unit_mm: u8,
    pub return_mode: u8,
    pub flags: u8,
}

impl PacketHeader {
    pub fn has_marker(&self) -> bool {
        self.marker == layout::SOP_MARKER
    }

    pub fn distance_unit_m(&self) -> f64 {
        f64::from(self.distance_unit_mm) / layout::MILLIMETERS_PER_METER
    }
}

/// Block azimuth in hundredths of a degree, as transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Azimuth(pub u16);

impl Azimuth {
    /// Degrees in `[0, 360)`.
    ///
    /// # Examples
    /// ```
    /// use pandar_core::protocols::pandar64::Azimuth;
    ///
    /// assert_eq!(Azimuth(9000).degrees(), 90.0);
    /// assert_eq!(Azimuth(36000).degrees(), 0.0);
    /// ```
    pub fn degrees(self) -> f64 {
        f64::from(self.0 % layout::AZIMUTH_UNITS_PER_TURN) / layout::AZIMUTH_UNITS_PER_DEGREE
    }
}

/// One laser return record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub raw_distance: u16,
    pub intensity: u8,
}

impl Channel {
    /// A zero distance means the laser saw nothing.
    pub fn is_return(&self) -> bool {
        self.raw_distance != 0
    }

    pub fn distance_m(&self, unit_m: f64) -> f64 {
        f64::from(self.raw_distance) * unit_m
    }
}

pub(crate) struct Pandar64Reader<'a> {
    cursor: ByteCursor<'a>,
}

impl<'a> Pandar64Reader<'a> {
    pub(crate) fn new(payload: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(payload),
        }
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.cursor.len()
    }

    pub(crate) fn read_header(&mut self) -> Result<PacketHeader, Pandar64Error> {
        let bytes = self.cursor.take(layout::HEADER_LEN)?;
        let marker = &bytes[layout::SOP_RANGE.clone()];
        Ok(PacketHeader {
            marker: u16::from_le_bytes([marker[0], marker[1]]),
            laser_count: bytes[layout::LASER_COUNT_OFFSET],
            block_count: bytes[layout::BLOCK_COUNT_OFFSET],
            first_block_return: bytes[layout::FIRST_BLOCK_RETURN_OFFSET],
            distance_unit_mm: bytes[layout::DISTANCE_UNIT_OFFSET],
            return_mode: bytes[layout::RETURN_MODE_OFFSET],
            flags: bytes[layout::FLAGS_OFFSET],
        })
    }

    pub(crate) fn read_azimuth(&mut self) -> Result<Azimuth, CursorError> {
        self.cursor.read_u16_le().map(Azimuth)
    }

    pub(crate) fn read_channel(&mut self) -> Result<Channel, CursorError> {
        let bytes = self.cursor.peek(layout::CHANNEL_RECORD_LEN)?;
        let channel = Channel {
            raw_distance: u16::from_le_bytes([bytes[0], bytes[1]]),
            intensity: bytes[2],
        };
        self.cursor.skip(layout::CHANNEL_RECORD_LEN)?;
        Ok(channel)
    }

    pub(crate) fn at_marker(&self) -> bool {
        matches!(self.cursor.peek_u16_le(), Ok(layout::SOP_MARKER))
    }

    /// Advance byte by byte until the cursor sits on a marker.
    ///
    /// Returns `false` once fewer than two bytes remain.
    pub(crate) fn seek_marker(&mut self) -> bool {
        while self.cursor.remaining() >= layout::SOP_LEN {
            if self.at_marker() {
                return true;
            }
            if self.cursor.skip(1).is_err() {
                break;
            }
        }
        false
    }

    pub(crate) fn skip_marker(&mut self) -> Result<(), CursorError> {
        self.cursor.skip(layout::SOP_LEN)
    }
}
