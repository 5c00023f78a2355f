#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use etherparse::PacketBuilder;

pub const SENSOR_IP: [u8; 4] = [192, 168, 1, 201];
pub const HOST_IP: [u8; 4] = [192, 168, 1, 2];
pub const DATA_PORT: u16 = 2368;

const HEADER_LEN: usize = 8;
const BLOCK_LEN: usize = 2 + 64 * 3;
const BLOCKS: usize = 6;

pub struct CapturedPacket {
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub data: Vec<u8>,
    pub original_len: u32,
}

impl CapturedPacket {
    pub fn new(ts_sec: u32, ts_usec: u32, data: Vec<u8>) -> Self {
        let original_len = data.len() as u32;
        Self {
            ts_sec,
            ts_usec,
            data,
            original_len,
        }
    }

    /// Keep only the first `snap_len` bytes, as a capture with a short snap length would.
    pub fn snapped(mut self, snap_len: usize) -> Self {
        self.data.truncate(snap_len);
        self
    }
}

pub fn temp_capture_path(name: &str, extension: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("pandar_{name}_{unique}.{extension}"))
}

/// Pandar64 payload with a valid header, 4 mm distance unit and empty blocks.
pub fn pandar_payload() -> Vec<u8> {
    let mut payload = vec![0u8; HEADER_LEN + BLOCK_LEN * BLOCKS];
    payload[..8].copy_from_slice(&[0xee, 0xff, 64, 6, 0, 4, 0x37, 0]);
    payload
}

pub fn set_azimuth(payload: &mut [u8], block: usize, raw: u16) {
    let offset = HEADER_LEN + block * BLOCK_LEN;
    payload[offset..offset + 2].copy_from_slice(&raw.to_le_bytes());
}

pub fn set_channel(payload: &mut [u8], block: usize, laser: usize, distance: u16, intensity: u8) {
    let offset = HEADER_LEN + block * BLOCK_LEN + 2 + laser * 3;
    payload[offset..offset + 2].copy_from_slice(&distance.to_le_bytes());
    payload[offset + 2] = intensity;
}

pub fn udp_frame(dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([0, 1, 2, 3, 4, 5], [6, 7, 8, 9, 10, 11])
        .ipv4(SENSOR_IP, HOST_IP, 64)
        .udp(10000, dst_port);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

pub fn tcp_frame(dst_port: u16) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2([0, 1, 2, 3, 4, 5], [6, 7, 8, 9, 10, 11])
        .ipv4(SENSOR_IP, HOST_IP, 64)
        .tcp(40000, dst_port, 1, 1024);
    let payload = [0xeeu8, 0xff, 0x01];
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, &payload).unwrap();
    frame
}

pub fn write_pcap(path: &Path, packets: &[CapturedPacket]) {
    let mut output = Vec::new();
    output.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    output.extend_from_slice(&2u16.to_le_bytes());
    output.extend_from_slice(&4u16.to_le_bytes());
    output.extend_from_slice(&0i32.to_le_bytes());
    output.extend_from_slice(&0u32.to_le_bytes());
    output.extend_from_slice(&65535u32.to_le_bytes());
    output.extend_from_slice(&1u32.to_le_bytes());

    for packet in packets {
        output.extend_from_slice(&packet.ts_sec.to_le_bytes());
        output.extend_from_slice(&packet.ts_usec.to_le_bytes());
        output.extend_from_slice(&(packet.data.len() as u32).to_le_bytes());
        output.extend_from_slice(&packet.original_len.to_le_bytes());
        output.extend_from_slice(&packet.data);
    }

    fs::write(path, output).unwrap();
}

pub fn write_pcapng(path: &Path, packets: &[CapturedPacket]) {
    let mut output = Vec::new();
    output.extend_from_slice(&pcapng_block(0x0A0D0D0A, &section_header_body()));
    output.extend_from_slice(&pcapng_block(1, &interface_desc_body()));

    for packet in packets {
        output.extend_from_slice(&pcapng_block(6, &enhanced_packet_body(packet)));
    }

    fs::write(path, output).unwrap();
}

fn pcapng_block(block_type: u32, body: &[u8]) -> Vec<u8> {
    let total_len = (8 + body.len() + 4) as u32;
    let mut block = Vec::with_capacity(total_len as usize);
    block.extend_from_slice(&block_type.to_be_bytes());
    block.extend_from_slice(&total_len.to_be_bytes());
    block.extend_from_slice(body);
    block.extend_from_slice(&total_len.to_be_bytes());
    block
}

fn section_header_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0x1A2B3C4Du32.to_be_bytes());
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&(-1i64).to_be_bytes());
    body
}

fn interface_desc_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&1u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    body.extend_from_slice(&65535u32.to_be_bytes());
    body
}

fn enhanced_packet_body(packet: &CapturedPacket) -> Vec<u8> {
    let ts_us = u64::from(packet.ts_sec) * 1_000_000 + u64::from(packet.ts_usec);
    let ts_high = (ts_us >> 32) as u32;
    let ts_low = (ts_us & 0xFFFF_FFFF) as u32;
    let cap_len = packet.data.len() as u32;
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&ts_high.to_be_bytes());
    body.extend_from_slice(&ts_low.to_be_bytes());
    body.extend_from_slice(&cap_len.to_be_bytes());
    body.extend_from_slice(&packet.original_len.to_be_bytes());
    body.extend_from_slice(&packet.data);
    let pad_len = (4 - (packet.data.len() % 4)) % 4;
    body.extend(std::iter::repeat_n(0u8, pad_len));
    body
}
