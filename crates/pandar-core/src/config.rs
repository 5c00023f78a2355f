//! Capture and decoder settings.
//!
//! Every tunable the pipeline uses lives here with a documented default.
//! The structures are plain `serde` types so a JSON file can provide any
//! subset of the fields; missing fields keep their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// UDP port Pandar64 sensors send point data to.
pub const DEFAULT_DATA_PORT: u16 = 2368;
pub const DEFAULT_SNAP_LEN: u32 = 65_535;
pub const DEFAULT_TIMEOUT_MS: u32 = 1_000;
pub const DEFAULT_FILTER: &str = "udp port 2368";
/// Returns closer than this are near-field noise.
pub const DEFAULT_MINIMUM_RANGE_M: f64 = 0.3;
/// Distance unit assumed when a packet is decoded without a trusted header.
pub const DEFAULT_FALLBACK_DISTANCE_UNIT_M: f64 = 0.004;
pub const DEFAULT_EXPECTED_BLOCKS: u8 = 6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Settings handed to a [`crate::PacketSource`] when it is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum bytes captured per frame (live capture only).
    pub snap_len: u32,
    /// Put the interface into promiscuous mode (live capture only).
    pub promiscuous: bool,
    /// Read timeout for live capture, in milliseconds.
    pub timeout_ms: u32,
    /// BPF expression applied before any frame reaches the decoder.
    ///
    /// Defaults to [`DEFAULT_FILTER`] when built with `libpcap`, and to no
    /// filter otherwise.
    pub filter: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snap_len: DEFAULT_SNAP_LEN,
            promiscuous: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            filter: cfg!(feature = "libpcap").then(|| DEFAULT_FILTER.to_string()),
        }
    }
}

/// Settings for decapsulation and Pandar64 decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Expected UDP destination port; other ports are reported, not dropped.
    pub data_port: u16,
    pub minimum_range_m: f64,
    pub fallback_distance_unit_m: f64,
    /// Blocks per packet a structured header must declare.
    pub expected_blocks: u8,
    /// Scan non-conforming payloads for start markers instead of dropping them.
    pub linear_fallback: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            data_port: DEFAULT_DATA_PORT,
            minimum_range_m: DEFAULT_MINIMUM_RANGE_M,
            fallback_distance_unit_m: DEFAULT_FALLBACK_DISTANCE_UNIT_M,
            expected_blocks: DEFAULT_EXPECTED_BLOCKS,
            linear_fallback: true,
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.minimum_range_m.is_finite() || self.minimum_range_m < 0.0 {
            return Err(ConfigError::Invalid {
                field: "minimum_range_m",
                message: format!("expected a non-negative number, got {}", self.minimum_range_m),
            });
        }
        if !self.fallback_distance_unit_m.is_finite() || self.fallback_distance_unit_m <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "fallback_distance_unit_m",
                message: format!(
                    "expected a positive number, got {}",
                    self.fallback_distance_unit_m
                ),
            });
        }
        if self.expected_blocks == 0 {
            return Err(ConfigError::Invalid {
                field: "expected_blocks",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Capture and decoder settings loaded together.
///
/// # Examples
/// ```
/// use pandar_core::PipelineConfig;
///
/// let config = PipelineConfig::from_json_str(r#"{"decoder": {"data_port": 2369}}"#).unwrap();
/// assert_eq!(config.decoder.data_port, 2369);
/// assert_eq!(config.capture.snap_len, 65_535);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub capture: CaptureConfig,
    pub decoder: DecoderConfig,
}

impl PipelineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.decoder.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}
