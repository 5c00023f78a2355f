//! Recoverable per-frame decode issues.
//!
//! A [`Diagnostic`] never stops the pipeline: the frame yields an empty (or
//! partial) cloud and the loop moves on. Each diagnostic maps to one
//! [`DiagnosticKind`] so runs can be summarized by counts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decap::DecapError;
use crate::protocols::pandar64::Pandar64Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("truncated frame: {0}")]
    TruncatedFrame(#[from] DecapError),
    #[error(transparent)]
    Packet(#[from] Pandar64Error),
    #[error("unexpected destination port {actual} (expected {expected})")]
    PortMismatch { expected: u16, actual: u16 },
}

impl Diagnostic {
    /// # Examples
    /// ```
    /// use pandar_core::{DecapError, Diagnostic, DiagnosticKind};
    ///
    /// let diagnostic = Diagnostic::from(DecapError::EmptyPayload);
    /// assert_eq!(diagnostic.kind(), DiagnosticKind::TruncatedFrame);
    /// ```
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::TruncatedFrame(_) => DiagnosticKind::TruncatedFrame,
            Diagnostic::Packet(Pandar64Error::TooShort(_)) => DiagnosticKind::TruncatedFrame,
            Diagnostic::Packet(Pandar64Error::InvalidHeader { .. }) => DiagnosticKind::InvalidHeader,
            Diagnostic::Packet(Pandar64Error::NoStartMarker { .. }) => DiagnosticKind::NoStartMarker,
            Diagnostic::PortMismatch { .. } => DiagnosticKind::PortMismatch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    TruncatedFrame,
    InvalidHeader,
    NoStartMarker,
    PortMismatch,
}

/// Per-kind tallies for a decode run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCounts {
    pub truncated_frame: u64,
    pub invalid_header: u64,
    pub no_start_marker: u64,
    pub port_mismatch: u64,
}

impl DiagnosticCounts {
    pub fn record(&mut self, kind: DiagnosticKind) {
        let slot = match kind {
            DiagnosticKind::TruncatedFrame => &mut self.truncated_frame,
            DiagnosticKind::InvalidHeader => &mut self.invalid_header,
            DiagnosticKind::NoStartMarker => &mut self.no_start_marker,
            DiagnosticKind::PortMismatch => &mut self.port_mismatch,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn total(&self) -> u64 {
        self.truncated_frame + self.invalid_header + self.no_start_marker + self.port_mismatch
    }
}
