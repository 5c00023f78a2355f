//! Packet acquisition.
//!
//! A [`PacketSource`] yields captured link-layer frames one at a time. File
//! replay is always available. BPF filtering of files and live capture need
//! the `libpcap` feature and a system libpcap.

mod filter;
#[cfg(feature = "libpcap")]
mod live;
mod pcap;

pub use filter::CaptureFilter;
#[cfg(feature = "libpcap")]
pub use live::LiveCaptureSource;
pub use self::pcap::PcapFileSource;

use pcap_parser::Linktype;
use thiserror::Error;

use self::pcap::error::PcapSourceError;

/// One captured frame with its capture metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub ts_sec: u32,
    pub ts_usec: u32,
    /// Bytes actually stored by the capture (`data.len()`).
    pub captured_len: u32,
    /// Length of the frame on the wire.
    pub original_len: u32,
    pub linktype: Linktype,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Ethernet frame captured in full at time zero.
    pub fn new(data: Vec<u8>) -> Self {
        let len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self {
            ts_sec: 0,
            ts_usec: 0,
            captured_len: len,
            original_len: len,
            linktype: Linktype::ETHERNET,
            data,
        }
    }

    pub fn with_timestamp(mut self, ts_sec: u32, ts_usec: u32) -> Self {
        self.ts_sec = ts_sec;
        self.ts_usec = ts_usec;
        self
    }

    /// Capture time in seconds since the epoch.
    pub fn timestamp(&self) -> f64 {
        f64::from(self.ts_sec) + f64::from(self.ts_usec) * 1e-6
    }

    /// Whether the capture stored fewer bytes than the wire carried.
    pub fn is_truncated(&self) -> bool {
        self.captured_len < self.original_len
    }
}

/// Outcome of one [`PacketSource::poll_packet`] call.
#[derive(Debug)]
pub enum SourceEvent {
    Frame(RawFrame),
    /// Nothing arrived within the read timeout; the source is still open.
    Idle,
    End,
}

pub trait PacketSource {
    /// Next frame, or `Ok(None)` once the capture is exhausted or closed.
    fn next_packet(&mut self) -> Result<Option<RawFrame>, SourceError>;

    /// Like [`next_packet`](Self::next_packet), but hands control back when a
    /// read times out so callers can check for cancellation.
    fn poll_packet(&mut self) -> Result<SourceEvent, SourceError> {
        Ok(match self.next_packet()? {
            Some(frame) => SourceEvent::Frame(frame),
            None => SourceEvent::End,
        })
    }

    /// Restrict subsequent frames to those matching a BPF expression.
    fn apply_filter(&mut self, expression: &str) -> Result<(), SourceError>;

    /// Release the underlying handle. Calling it twice is harmless.
    fn close(&mut self);
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn next_packet(&mut self) -> Result<Option<RawFrame>, SourceError> {
        (**self).next_packet()
    }

    fn poll_packet(&mut self) -> Result<SourceEvent, SourceError> {
        (**self).poll_packet()
    }

    fn apply_filter(&mut self, expression: &str) -> Result<(), SourceError> {
        (**self).apply_filter(expression)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open capture {target}: {message}")]
    Open { target: String, message: String },
    #[error("failed to compile filter '{expression}': {message}")]
    FilterCompile { expression: String, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
}

impl From<PcapSourceError> for SourceError {
    fn from(value: PcapSourceError) -> Self {
        match value {
            PcapSourceError::Io(err) => SourceError::Io(err),
            other => SourceError::Pcap(other.to_string()),
        }
    }
}
