use pcap::{Active, Capture};
use pcap_parser::Linktype;
use tracing::{debug, info};

use crate::config::CaptureConfig;
use crate::source::{PacketSource, RawFrame, SourceError, SourceEvent};

/// Live capture from a network interface through libpcap.
pub struct LiveCaptureSource {
    device: String,
    capture: Option<Capture<Active>>,
}

impl LiveCaptureSource {
    /// Open `device` and apply `config.filter` if one is set.
    pub fn open(device: &str, config: &CaptureConfig) -> Result<Self, SourceError> {
        let open_error = |err: pcap::Error| SourceError::Open {
            target: device.to_string(),
            message: err.to_string(),
        };
        let snap_len = i32::try_from(config.snap_len).unwrap_or(i32::MAX);
        let timeout_ms = i32::try_from(config.timeout_ms).unwrap_or(i32::MAX);
        let capture = Capture::from_device(device)
            .map_err(open_error)?
            .snaplen(snap_len)
            .promisc(config.promiscuous)
            .timeout(timeout_ms)
            .open()
            .map_err(open_error)?;
        info!(
            device,
            snap_len,
            promiscuous = config.promiscuous,
            "opened capture device"
        );

        let mut source = Self {
            device: device.to_string(),
            capture: Some(capture),
        };
        if let Some(filter) = config.filter.as_deref() {
            source.apply_filter(filter)?;
        }
        Ok(source)
    }
}

impl PacketSource for LiveCaptureSource {
    fn next_packet(&mut self) -> Result<Option<RawFrame>, SourceError> {
        loop {
            match self.poll_packet()? {
                SourceEvent::Frame(frame) => return Ok(Some(frame)),
                SourceEvent::Idle => continue,
                SourceEvent::End => return Ok(None),
            }
        }
    }

    fn poll_packet(&mut self) -> Result<SourceEvent, SourceError> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(SourceEvent::End);
        };
        let linktype = Linktype(capture.get_datalink().0);
        match capture.next_packet() {
            Ok(packet) => Ok(SourceEvent::Frame(RawFrame {
                ts_sec: u32::try_from(packet.header.ts.tv_sec).unwrap_or(0),
                ts_usec: u32::try_from(packet.header.ts.tv_usec).unwrap_or(0),
                captured_len: packet.header.caplen,
                original_len: packet.header.len,
                linktype,
                data: packet.data.to_vec(),
            })),
            Err(pcap::Error::TimeoutExpired) => Ok(SourceEvent::Idle),
            Err(pcap::Error::NoMorePackets) => Ok(SourceEvent::End),
            Err(err) => Err(SourceError::Pcap(err.to_string())),
        }
    }

    fn apply_filter(&mut self, expression: &str) -> Result<(), SourceError> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(());
        };
        capture
            .filter(expression, true)
            .map_err(|err| SourceError::FilterCompile {
                expression: expression.to_string(),
                message: err.to_string(),
            })?;
        info!(device = %self.device, filter = expression, "capture filter applied");
        Ok(())
    }

    fn close(&mut self) {
        if self.capture.take().is_some() {
            debug!(device = %self.device, "capture device closed");
        }
    }
}
