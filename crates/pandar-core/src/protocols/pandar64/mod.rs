//! Hesai Pandar64 point-data decoding.
//!
//! A conforming packet is an 8-byte header followed by six blocks. Each block
//! carries one azimuth and 64 channel records of `(distance, intensity)`:
//!
//! ```text
//! header  | EE FF | lasers | blocks | 1st return | unit mm | return mode | flags |
//! block   | azimuth u16 LE | 64 x [ distance u16 LE | intensity u8 ] |
//! ```
//!
//! Packets whose header starts with the marker and declares the expected
//! laser and block counts are decoded structurally. Anything else goes to the
//! linear scanner in `linear`, which walks the payload marker by marker and
//! assigns laser ids by record order. Both paths share the same geometry.
//!
//! Byte positions live in `layout`; bounds-checked access in `reader`.

pub mod error;
pub mod layout;
mod linear;
pub mod parser;
pub mod reader;

pub use error::Pandar64Error;
pub use parser::{DecodeMode, Pandar64Parser, ParsedPacket};
pub use reader::{Azimuth, Channel, PacketHeader};
