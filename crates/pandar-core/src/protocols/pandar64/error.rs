use thiserror::Error;

use crate::protocols::common::CursorError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Pandar64Error {
    #[error("payload too short: {0}")]
    TooShort(#[from] CursorError),
    #[error(
        "invalid header: {laser_count} lasers x {block_count} blocks, \
         expected {expected_lasers} x {expected_blocks}"
    )]
    InvalidHeader {
        laser_count: u8,
        block_count: u8,
        expected_lasers: usize,
        expected_blocks: u8,
    },
    #[error("no start-of-packet marker in {payload_len}-byte payload")]
    NoStartMarker { payload_len: usize },
}
