use thiserror::Error;

/// Reasons a captured frame does not yield a UDP payload.
///
/// # Examples
/// ```
/// use pandar_core::DecapError;
///
/// let err = DecapError::NotUdp { protocol: 6 };
/// assert!(err.to_string().contains("not UDP"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecapError {
    #[error("frame too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },
    #[error("unsupported link type {linktype}")]
    UnsupportedLinktype { linktype: i32 },
    #[error("EtherType {ethertype:#06x} is not IPv4")]
    NotIpv4 { ethertype: u16 },
    #[error("invalid IPv4 header length: IHL {ihl}")]
    InvalidIpHeader { ihl: u8 },
    #[error("malformed {layer} header: {message}")]
    Malformed { layer: &'static str, message: String },
    #[error("IP protocol {protocol} is not UDP")]
    NotUdp { protocol: u8 },
    #[error("UDP payload is empty")]
    EmptyPayload,
}
