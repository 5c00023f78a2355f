use std::io::{Read, Seek, SeekFrom};

use pcap_parser::Linktype;

use super::error::PcapSourceError;
use super::layout;

/// Container format of a capture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Pcap,
    PcapNg,
}

impl CaptureFormat {
    pub fn name(self) -> &'static str {
        match self {
            CaptureFormat::Pcap => "pcap",
            CaptureFormat::PcapNg => "pcapng",
        }
    }
}

/// Tell pcapng from legacy pcap by the leading magic, leaving the reader at
/// offset 0. Anything that is not pcapng is handed to the legacy reader,
/// which validates its own magic.
pub fn sniff_format<R: Read + Seek>(reader: &mut R) -> Result<CaptureFormat, PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(if magic == layout::PCAPNG_MAGIC {
        CaptureFormat::PcapNg
    } else {
        CaptureFormat::Pcap
    })
}

/// Resolve the linktype for a given interface id, defaulting to Ethernet.
pub fn linktype_for_interface(linktypes: &[Linktype], if_id: u32) -> Linktype {
    linktypes
        .get(if_id as usize)
        .copied()
        .unwrap_or(Linktype::ETHERNET)
}

/// Split a pcapng microsecond timestamp into whole seconds and microseconds.
/// Seconds past `u32::MAX` saturate.
pub fn pcapng_ts_to_parts(ts_high: u32, ts_low: u32) -> (u32, u32) {
    let ts = (u64::from(ts_high) << 32) | u64::from(ts_low);
    let secs = u32::try_from(ts / layout::MICROS_PER_SECOND).unwrap_or(u32::MAX);
    let micros = (ts % layout::MICROS_PER_SECOND) as u32;
    (secs, micros)
}

/// Packet bytes without the trailing block padding pcapng adds.
pub fn captured_bytes(data: &[u8], caplen: u32) -> &[u8] {
    let len = (caplen as usize).min(data.len());
    &data[..len]
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use pcap_parser::Linktype;

    use super::{CaptureFormat, captured_bytes, linktype_for_interface, pcapng_ts_to_parts, sniff_format};
    use crate::source::pcap::error::PcapSourceError;

    #[test]
    fn pcapng_magic_is_recognised_and_rewound() {
        let mut cursor = Cursor::new([0x0a, 0x0d, 0x0d, 0x0a, 0x1c]);
        assert_eq!(sniff_format(&mut cursor).unwrap(), CaptureFormat::PcapNg);
        let mut first = [0u8; 1];
        cursor.read_exact(&mut first).unwrap();
        assert_eq!(first[0], 0x0a);
    }

    #[test]
    fn other_magic_goes_to_legacy_reader() {
        let mut cursor = Cursor::new([0xd4, 0xc3, 0xb2, 0xa1]);
        assert_eq!(sniff_format(&mut cursor).unwrap(), CaptureFormat::Pcap);
        assert_eq!(CaptureFormat::Pcap.name(), "pcap");
    }

    #[test]
    fn short_file_is_an_io_error() {
        let mut cursor = Cursor::new([0x0a, 0x0d, 0x0d]);
        let err = sniff_format(&mut cursor).unwrap_err();
        assert!(matches!(err, PcapSourceError::Io(_)));
    }

    #[test]
    fn unknown_interface_falls_back_to_ethernet() {
        let linktypes = [Linktype::RAW];
        assert_eq!(linktype_for_interface(&linktypes, 0), Linktype::RAW);
        assert_eq!(linktype_for_interface(&linktypes, 1), Linktype::ETHERNET);
    }

    #[test]
    fn pcapng_timestamp_splits_into_parts() {
        assert_eq!(pcapng_ts_to_parts(0, 1_500_000), (1, 500_000));
        assert_eq!(pcapng_ts_to_parts(1, 0), (4294, 967_296));
        assert_eq!(pcapng_ts_to_parts(u32::MAX, u32::MAX).0, u32::MAX);
    }

    #[test]
    fn block_padding_is_trimmed_to_caplen() {
        let data = [1u8, 2, 3, 0];
        assert_eq!(captured_bytes(&data, 3), &[1, 2, 3]);
        assert_eq!(captured_bytes(&data, 10), &data);
    }
}
