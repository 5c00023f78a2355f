//! Frame and payload builders shared by unit tests.

use crate::protocols::pandar64::layout;

pub(crate) fn ipv4_udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::new();
    packet.extend_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    packet.extend_from_slice(&[0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f]);
    packet.extend_from_slice(&0x0800u16.to_be_bytes());

    let total_len = 20u16 + 8u16 + (payload.len() as u16);
    let mut ip_header = [0u8; 20];
    ip_header[0] = 0x45;
    ip_header[2..4].copy_from_slice(&total_len.to_be_bytes());
    ip_header[8] = 64;
    ip_header[9] = 17;
    ip_header[12..16].copy_from_slice(&[192, 168, 1, 201]);
    ip_header[16..20].copy_from_slice(&[192, 168, 1, 2]);
    packet.extend_from_slice(&ip_header);

    let udp_len = 8u16 + (payload.len() as u16);
    packet.extend_from_slice(&src_port.to_be_bytes());
    packet.extend_from_slice(&dst_port.to_be_bytes());
    packet.extend_from_slice(&udp_len.to_be_bytes());
    packet.extend_from_slice(&0u16.to_be_bytes());

    packet.extend_from_slice(payload);
    packet
}

pub(crate) fn insert_vlan_tag(frame: &[u8], vlan_id: u16) -> Vec<u8> {
    let mut tagged = frame[..12].to_vec();
    tagged.extend_from_slice(&0x8100u16.to_be_bytes());
    tagged.extend_from_slice(&(vlan_id & 0x0fff).to_be_bytes());
    tagged.extend_from_slice(&frame[12..]);
    tagged
}

/// Pandar64 payload with a valid header and zero-filled blocks.
pub(crate) fn pandar_payload(distance_unit_mm: u8) -> Vec<u8> {
    let mut payload = vec![0u8; layout::HEADER_LEN + layout::BODY_LEN];
    payload[layout::SOP_RANGE.clone()].copy_from_slice(&layout::SOP_MARKER.to_le_bytes());
    payload[layout::LASER_COUNT_OFFSET] = layout::LASER_COUNT;
    payload[layout::BLOCK_COUNT_OFFSET] = layout::BLOCK_COUNT;
    payload[layout::DISTANCE_UNIT_OFFSET] = distance_unit_mm;
    payload[layout::RETURN_MODE_OFFSET] = 0x37;
    payload
}

pub(crate) fn set_block_azimuth(payload: &mut [u8], block: usize, raw: u16) {
    let offset = layout::block_offset(block);
    payload[offset..offset + 2].copy_from_slice(&raw.to_le_bytes());
}

pub(crate) fn set_channel(payload: &mut [u8], block: usize, laser: usize, distance: u16, intensity: u8) {
    let offset = layout::channel_offset(block, laser);
    payload[offset..offset + 2].copy_from_slice(&distance.to_le_bytes());
    payload[offset + 2] = intensity;
}
