use std::net::Ipv4Addr;

use etherparse::err::LenError;
use etherparse::{
    EtherType, Ethernet2HeaderSlice, IpNumber, Ipv4HeaderSlice, SingleVlanHeaderSlice,
    UdpHeaderSlice,
};
use pcap_parser::Linktype;

use crate::config::DEFAULT_DATA_PORT;
use crate::source::RawFrame;

use super::error::DecapError;
use super::layout;

/// UDP payload of a captured frame, borrowed from the frame buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload<'a> {
    /// Offset of the first payload byte within the captured frame.
    pub offset: usize,
    pub bytes: &'a [u8],
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
    /// Set when the destination port differs from the sensor data port.
    pub port_mismatch: bool,
}

impl Payload<'_> {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Strip Ethernet (optionally 802.1Q tagged), IPv4 and UDP headers.
///
/// `captured_len` is the number of bytes actually captured; it is clamped to
/// the buffer length. The payload length is the smaller of what was
/// captured and what the UDP header declares.
///
/// # Examples
/// ```
/// use pandar_core::{DecapError, decapsulate};
///
/// let runt = [0u8; 20];
/// assert!(matches!(
///     decapsulate(&runt, runt.len()),
///     Err(DecapError::TooShort { .. })
/// ));
/// ```
pub fn decapsulate(data: &[u8], captured_len: usize) -> Result<Payload<'_>, DecapError> {
    let frame = &data[..captured_len.min(data.len())];
    require_len(frame, layout::MIN_FRAME_LEN)?;

    let ethernet = Ethernet2HeaderSlice::from_slice(frame).map_err(|err| too_short(frame, &err))?;
    let mut ether_type = ethernet.ether_type();
    let mut ip_offset = ethernet.slice().len();
    if ether_type == EtherType::VLAN_TAGGED_FRAME {
        require_len(frame, layout::ETHERNET_HEADER_LEN + layout::VLAN_TAG_LEN)?;
        let vlan = SingleVlanHeaderSlice::from_slice(&frame[ip_offset..])
            .map_err(|err| too_short(frame, &err))?;
        ether_type = vlan.ether_type();
        ip_offset += vlan.slice().len();
    }
    if ether_type != EtherType::IPV4 {
        return Err(DecapError::NotIpv4 {
            ethertype: ether_type.0,
        });
    }

    // IHL is checked before slicing so short headers get their own error.
    let ihl = frame.get(ip_offset).map_or(0, |byte| byte & 0x0f);
    if ihl < layout::IPV4_MIN_IHL {
        return Err(DecapError::InvalidIpHeader { ihl });
    }
    let udp_offset = ip_offset + usize::from(ihl) * 4;
    require_len(frame, udp_offset + layout::UDP_HEADER_LEN)?;

    let ipv4 = Ipv4HeaderSlice::from_slice(&frame[ip_offset..]).map_err(|err| {
        DecapError::Malformed {
            layer: "IPv4",
            message: err.to_string(),
        }
    })?;
    let protocol = ipv4.protocol();
    if protocol != IpNumber::UDP {
        return Err(DecapError::NotUdp {
            protocol: protocol.0,
        });
    }
    let udp = UdpHeaderSlice::from_slice(&frame[udp_offset..])
        .map_err(|err| too_short(frame, &err))?;

    let offset = udp_offset + layout::UDP_HEADER_LEN;
    let declared = usize::from(udp.length()).saturating_sub(layout::UDP_HEADER_LEN);
    let len = frame.len().saturating_sub(offset).min(declared);
    if len == 0 {
        return Err(DecapError::EmptyPayload);
    }

    Ok(Payload {
        offset,
        bytes: &frame[offset..offset + len],
        src_ip: ipv4.source_addr(),
        src_port: udp.source_port(),
        dst_ip: ipv4.destination_addr(),
        dst_port: udp.destination_port(),
        port_mismatch: false,
    })
}

fn require_len(frame: &[u8], needed: usize) -> Result<(), DecapError> {
    if frame.len() < needed {
        return Err(DecapError::TooShort {
            needed,
            actual: frame.len(),
        });
    }
    Ok(())
}

fn too_short(frame: &[u8], err: &LenError) -> DecapError {
    DecapError::TooShort {
        needed: err.required_len,
        actual: frame.len(),
    }
}

/// Decapsulates [`RawFrame`]s and flags traffic off the sensor data port.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecapsulator {
    data_port: u16,
}

impl FrameDecapsulator {
    pub fn new(data_port: u16) -> Self {
        Self { data_port }
    }

    pub fn data_port(&self) -> u16 {
        self.data_port
    }

    pub fn decapsulate<'a>(&self, frame: &'a RawFrame) -> Result<Payload<'a>, DecapError> {
        if frame.linktype != Linktype::ETHERNET {
            return Err(DecapError::UnsupportedLinktype {
                linktype: frame.linktype.0,
            });
        }
        let mut payload = decapsulate(&frame.data, frame.captured_len as usize)?;
        payload.port_mismatch = payload.dst_port != self.data_port;
        Ok(payload)
    }
}

impl Default for FrameDecapsulator {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PORT)
    }
}
