//! Frame sizes used for the length checks made before header slicing.

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const VLAN_TAG_LEN: usize = 4;

pub const IPV4_MIN_IHL: u8 = 5;
pub const UDP_HEADER_LEN: usize = 8;

/// Smallest Ethernet + IPv4 + UDP stack.
pub const MIN_FRAME_LEN: usize = 42;
