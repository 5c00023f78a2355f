//! PCAP/PCAPNG file replay.
//!
//! Legacy pcap and pcapng are told apart by their magic bytes. The source
//! keeps each frame's captured and original lengths so the decoder can see
//! snap-length truncation.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::PcapFileSource;
