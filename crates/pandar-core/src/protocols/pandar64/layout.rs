use std::ops::Range;

/// Start-of-packet marker, wire bytes `EE FF`.
pub const SOP_MARKER: u16 = 0xffee;
pub const SOP_LEN: usize = 2;
pub const SOP_RANGE: Range<usize> = 0..SOP_LEN;

pub const LASER_COUNT_OFFSET: usize = 2;
pub const BLOCK_COUNT_OFFSET: usize = 3;
pub const FIRST_BLOCK_RETURN_OFFSET: usize = 4;
pub const DISTANCE_UNIT_OFFSET: usize = 5;
pub const RETURN_MODE_OFFSET: usize = 6;
pub const FLAGS_OFFSET: usize = 7;
pub const HEADER_LEN: usize = 8;

pub const LASER_COUNT: u8 = 64;
pub const BLOCK_COUNT: u8 = 6;

pub const AZIMUTH_LEN: usize = 2;
pub const CHANNEL_RECORD_LEN: usize = 3;
pub const BLOCK_LEN: usize = AZIMUTH_LEN + LASER_COUNT as usize * CHANNEL_RECORD_LEN;
pub const BODY_LEN: usize = BLOCK_LEN * BLOCK_COUNT as usize;

/// Azimuth is transmitted in hundredths of a degree.
pub const AZIMUTH_UNITS_PER_DEGREE: f64 = 100.0;
pub const AZIMUTH_UNITS_PER_TURN: u16 = 36_000;
pub const MILLIMETERS_PER_METER: f64 = 1000.0;

#[cfg(test)]
pub(crate) const fn block_offset(block: usize) -> usize {
    HEADER_LEN + block * BLOCK_LEN
}

#[cfg(test)]
pub(crate) const fn channel_offset(block: usize, laser: usize) -> usize {
    block_offset(block) + AZIMUTH_LEN + laser * CHANNEL_RECORD_LEN
}
