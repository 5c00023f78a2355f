//! Ethernet/VLAN/IPv4/UDP decapsulation.
//!
//! Strips link, network and transport framing from a captured frame and
//! yields a borrowed view of the UDP payload. Header fields are read through
//! etherparse slices after explicit length checks against the sizes in
//! `layout`. Every rejection is an explicit [`DecapError`]; none of them is
//! fatal to a decode run.

pub mod error;
pub mod layout;
pub mod parser;

pub use error::DecapError;
pub use parser::{FrameDecapsulator, Payload, decapsulate};
