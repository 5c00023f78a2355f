use std::fs::File;
use std::path::Path;

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader,
    traits::PcapReaderIterator,
};
use tracing::{debug, info};

use crate::source::{CaptureFilter, PacketSource, RawFrame, SourceError};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    CaptureFormat, captured_bytes, linktype_for_interface, pcapng_ts_to_parts, sniff_format,
};

/// Replays frames from a pcap or pcapng file.
pub struct PcapFileSource {
    inner: Option<PcapReader>,
    filter: Option<CaptureFilter>,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
    },
    Ng {
        reader: PcapNGReader<File>,
        linktypes: Vec<Linktype>,
    },
}

impl PcapReader {
    fn format(&self) -> CaptureFormat {
        match self {
            PcapReader::Legacy { .. } => CaptureFormat::Pcap,
            PcapReader::Ng { .. } => CaptureFormat::PcapNg,
        }
    }
}

impl PcapFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::from)?;
        let inner = create_reader(file).map_err(SourceError::from)?;
        info!(path = %path.display(), format = inner.format().name(), "opened capture file");
        Ok(Self {
            inner: Some(inner),
            filter: None,
        })
    }
}

impl PacketSource for PcapFileSource {
    fn next_packet(&mut self) -> Result<Option<RawFrame>, SourceError> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(None);
        };
        loop {
            let Some(frame) = next_packet(inner).map_err(SourceError::from)? else {
                return Ok(None);
            };
            if let Some(filter) = self.filter.as_mut() {
                if !filter.matches(&frame) {
                    continue;
                }
            }
            return Ok(Some(frame));
        }
    }

    fn apply_filter(&mut self, expression: &str) -> Result<(), SourceError> {
        let filter = CaptureFilter::compile(expression)?;
        if filter.is_empty() {
            self.filter = None;
            debug!("capture filter cleared");
        } else {
            info!(filter = filter.expression(), "capture filter applied");
            self.filter = Some(filter);
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!("capture file closed");
        }
    }
}

fn create_reader(mut file: File) -> Result<PcapReader, PcapSourceError> {
    let format = sniff_format(&mut file)?;
    let reader = match format {
        CaptureFormat::PcapNg => PcapReader::Ng {
            reader: PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
                .map_err(|e| PcapSourceError::malformed(format.name(), "opening", e))?,
            linktypes: Vec::new(),
        },
        CaptureFormat::Pcap => PcapReader::Legacy {
            reader: LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file)
                .map_err(|e| PcapSourceError::malformed(format.name(), "opening", e))?,
            linktype: None,
        },
    };
    Ok(reader)
}

fn next_packet(reader: &mut PcapReader) -> Result<Option<RawFrame>, PcapSourceError> {
    let format = reader.format();
    loop {
        match reader {
            PcapReader::Legacy { reader, linktype } => match reader.next() {
                Ok((offset, block)) => {
                    let frame = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            *linktype = Some(header.network);
                            None
                        }
                        PcapBlockOwned::Legacy(packet) => {
                            let data = captured_bytes(packet.data, packet.caplen);
                            Some(RawFrame {
                                ts_sec: packet.ts_sec,
                                ts_usec: packet.ts_usec,
                                captured_len: data.len() as u32,
                                original_len: packet.origlen,
                                linktype: linktype.unwrap_or(Linktype::ETHERNET),
                                data: data.to_vec(),
                            })
                        }
                        _ => None,
                    };
                    reader.consume(offset);
                    if frame.is_some() {
                        return Ok(frame);
                    }
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::UnexpectedEof) => {
                    return Err(PcapSourceError::UnexpectedEof {
                        format: format.name(),
                    });
                }
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| PcapSourceError::malformed(format.name(), "refilling", e))?;
                }
                Err(e) => {
                    return Err(PcapSourceError::malformed(format.name(), "reading a record", e));
                }
            },
            PcapReader::Ng { reader, linktypes } => match reader.next() {
                Ok((offset, block)) => {
                    let frame = match block {
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            linktypes.clear();
                            None
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                            linktypes.push(intf.linktype);
                            None
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                            let (ts_sec, ts_usec) = pcapng_ts_to_parts(packet.ts_high, packet.ts_low);
                            let data = captured_bytes(packet.data, packet.caplen);
                            Some(RawFrame {
                                ts_sec,
                                ts_usec,
                                captured_len: data.len() as u32,
                                original_len: packet.origlen,
                                linktype: linktype_for_interface(linktypes, packet.if_id),
                                data: data.to_vec(),
                            })
                        }
                        _ => None,
                    };
                    reader.consume(offset);
                    if frame.is_some() {
                        return Ok(frame);
                    }
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::UnexpectedEof) => {
                    return Err(PcapSourceError::UnexpectedEof {
                        format: format.name(),
                    });
                }
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| PcapSourceError::malformed(format.name(), "refilling", e))?;
                }
                Err(e) => {
                    return Err(PcapSourceError::malformed(format.name(), "reading a record", e));
                }
            },
        }
    }
}
