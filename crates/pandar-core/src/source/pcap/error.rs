use thiserror::Error;

/// Failure inside the capture reader, before any frame reaches the decoder.
#[derive(Debug, Error)]
pub enum PcapSourceError {
    #[error("cannot read capture: {0}")]
    Io(#[from] std::io::Error),
    #[error("{format} capture ends inside a record")]
    UnexpectedEof { format: &'static str },
    #[error("malformed {format} capture while {stage}: {message}")]
    Malformed {
        format: &'static str,
        stage: &'static str,
        message: String,
    },
}

impl PcapSourceError {
    pub(crate) fn malformed(
        format: &'static str,
        stage: &'static str,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::Malformed {
            format,
            stage,
            message: err.to_string(),
        }
    }
}
