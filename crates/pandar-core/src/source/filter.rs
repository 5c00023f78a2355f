//! BPF filtering for file replay.
//!
//! Expressions are compiled by libpcap against a dead capture handle and run
//! offline over each replayed frame, so a capture file accepts the same
//! filter syntax as a live interface. Programs are compiled per link type,
//! on first use for anything other than Ethernet.
//!
//! Without the `libpcap` feature only the empty expression compiles.

use std::fmt;

#[cfg(feature = "libpcap")]
use pcap_parser::Linktype;
#[cfg(feature = "libpcap")]
use tracing::warn;

use crate::source::{RawFrame, SourceError};

#[cfg(feature = "libpcap")]
type Program = pcap::BpfProgram;

pub struct CaptureFilter {
    expression: String,
    #[cfg(feature = "libpcap")]
    programs: Vec<(Linktype, Option<Program>)>,
}

impl fmt::Debug for CaptureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureFilter")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

impl CaptureFilter {
    /// Compile an expression; an empty expression matches every frame.
    ///
    /// # Examples
    /// ```
    /// use pandar_core::CaptureFilter;
    ///
    /// let all = CaptureFilter::compile("  ").unwrap();
    /// assert!(all.is_empty());
    /// # #[cfg(feature = "libpcap")]
    /// assert!(CaptureFilter::compile("udp port 2368 or udp port 2369").is_ok());
    /// ```
    pub fn compile(expression: &str) -> Result<Self, SourceError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(Self::match_all());
        }
        Self::compile_bpf(expression)
    }

    fn match_all() -> Self {
        Self {
            expression: String::new(),
            #[cfg(feature = "libpcap")]
            programs: Vec::new(),
        }
    }

    #[cfg(feature = "libpcap")]
    fn compile_bpf(expression: &str) -> Result<Self, SourceError> {
        let program = compile_for(Linktype::ETHERNET, expression).map_err(|message| {
            SourceError::FilterCompile {
                expression: expression.to_string(),
                message,
            }
        })?;
        Ok(Self {
            expression: expression.to_string(),
            programs: vec![(Linktype::ETHERNET, Some(program))],
        })
    }

    #[cfg(not(feature = "libpcap"))]
    fn compile_bpf(expression: &str) -> Result<Self, SourceError> {
        Err(SourceError::FilterCompile {
            expression: expression.to_string(),
            message: "filtering capture files needs the `libpcap` feature".to_string(),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_empty(&self) -> bool {
        self.expression.is_empty()
    }

    /// Whether `frame` passes the filter.
    ///
    /// Frames whose link type the expression cannot be compiled for never
    /// match.
    pub fn matches(&mut self, frame: &RawFrame) -> bool {
        if self.is_empty() {
            return true;
        }
        self.run(frame)
    }

    #[cfg(feature = "libpcap")]
    fn run(&mut self, frame: &RawFrame) -> bool {
        let index = match self.programs.iter().position(|(lt, _)| *lt == frame.linktype) {
            Some(index) => index,
            None => {
                let program = compile_for(frame.linktype, &self.expression)
                    .map_err(|message| {
                        warn!(
                            linktype = frame.linktype.0,
                            filter = %self.expression,
                            %message,
                            "filter does not apply to link type; frames dropped"
                        );
                    })
                    .ok();
                self.programs.push((frame.linktype, program));
                self.programs.len() - 1
            }
        };
        self.programs[index]
            .1
            .as_ref()
            .is_some_and(|program| program.filter(&frame.data))
    }

    #[cfg(not(feature = "libpcap"))]
    fn run(&mut self, _frame: &RawFrame) -> bool {
        false
    }
}

#[cfg(feature = "libpcap")]
fn compile_for(linktype: Linktype, expression: &str) -> Result<Program, String> {
    let capture = pcap::Capture::dead(pcap::Linktype(linktype.0)).map_err(|err| err.to_string())?;
    capture
        .compile(expression, true)
        .map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::CaptureFilter;
    use crate::source::{RawFrame, SourceError};

    #[test]
    fn empty_expression_matches_everything() {
        let mut filter = CaptureFilter::compile("   ").unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.expression(), "");
        assert!(filter.matches(&RawFrame::new(vec![0u8; 4])));
    }

    #[cfg(not(feature = "libpcap"))]
    #[test]
    fn expressions_need_libpcap() {
        let err = CaptureFilter::compile("udp port 2368").unwrap_err();
        assert!(matches!(err, SourceError::FilterCompile { .. }));
        assert!(err.to_string().contains("libpcap"));
    }

    #[cfg(feature = "libpcap")]
    mod bpf {
        use super::{CaptureFilter, RawFrame, SourceError};
        use crate::test_support::{insert_vlan_tag, ipv4_udp_frame};
        use etherparse::PacketBuilder;

        fn sensor_frame(dst_port: u16) -> RawFrame {
            RawFrame::new(ipv4_udp_frame(10000, dst_port, &[1, 2, 3]))
        }

        fn tcp_frame(src_port: u16, dst_port: u16) -> RawFrame {
            let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12])
                .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
                .tcp(src_port, dst_port, 1, 1024);
            let payload = [0u8; 4];
            let mut data = Vec::with_capacity(builder.size(payload.len()));
            builder.write(&mut data, &payload).unwrap();
            RawFrame::new(data)
        }

        #[test]
        fn default_expression_selects_sensor_port() {
            let mut filter = CaptureFilter::compile("udp port 2368").unwrap();
            assert!(filter.matches(&sensor_frame(2368)));
            assert!(!filter.matches(&sensor_frame(2369)));
            assert!(!filter.matches(&tcp_frame(2368, 80)));
            assert_eq!(filter.expression(), "udp port 2368");
        }

        #[test]
        fn full_bpf_syntax_is_accepted() {
            let mut either = CaptureFilter::compile("udp port 2368 or udp port 2369").unwrap();
            assert!(either.matches(&sensor_frame(2368)));
            assert!(either.matches(&sensor_frame(2369)));
            assert!(!either.matches(&sensor_frame(2370)));

            let mut not_tcp = CaptureFilter::compile("not tcp").unwrap();
            assert!(not_tcp.matches(&sensor_frame(2368)));
            assert!(!not_tcp.matches(&tcp_frame(1, 2)));

            let mut grouped = CaptureFilter::compile("udp and (port 2368)").unwrap();
            assert!(grouped.matches(&sensor_frame(2368)));

            let mut range = CaptureFilter::compile("udp dst portrange 2368-2370").unwrap();
            assert!(range.matches(&sensor_frame(2370)));
            assert!(!range.matches(&sensor_frame(2371)));
        }

        #[test]
        fn vlan_keyword_reaches_tagged_frames() {
            let mut tagged = RawFrame::new(insert_vlan_tag(&ipv4_udp_frame(10000, 2368, &[1]), 7));
            let mut filter = CaptureFilter::compile("vlan and udp dst port 2368").unwrap();
            assert!(filter.matches(&tagged));
            tagged.data = ipv4_udp_frame(10000, 2368, &[1]);
            assert!(!filter.matches(&tagged));
        }

        #[test]
        fn malformed_expressions_fail_to_compile() {
            for expression in ["udp port twenty", "port", "host 10.0.0", "udp and"] {
                let err = CaptureFilter::compile(expression).unwrap_err();
                assert!(
                    matches!(err, SourceError::FilterCompile { .. }),
                    "{expression} should not compile"
                );
            }
        }
    }
}
