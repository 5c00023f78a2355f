//! Per-channel angular calibration.
//!
//! A [`CalibrationTable`] maps a laser id to its fixed vertical firing angle
//! and horizontal azimuth offset. The table is built once, wrapped in an
//! `Arc`, and shared read-only by every parser; the decoders above this seam
//! do not know which sensor model the table describes.

use csv::Trim;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Elevation/azimuth-offset pair for one laser, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    pub elevation_deg: f64,
    pub azimuth_offset_deg: f64,
}

impl CalibrationEntry {
    pub const fn new(elevation_deg: f64, azimuth_offset_deg: f64) -> Self {
        Self {
            elevation_deg,
            azimuth_offset_deg,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("calibration table must contain at least one laser")]
    Empty,
    #[error("laser id {laser_id} out of range for {lasers}-laser table")]
    UnknownLaser { laser_id: usize, lasers: usize },
    #[error("angle correction line {line}: {message}")]
    Csv { line: usize, message: String },
    #[error("angle correction file is missing channel {channel}")]
    MissingChannel { channel: usize },
}

/// Immutable laser-id indexed calibration.
///
/// # Examples
/// ```
/// use pandar_core::CalibrationTable;
///
/// let table = CalibrationTable::pandar64();
/// assert_eq!(table.len(), 64);
/// let top = table.lookup(0).unwrap();
/// assert!(top.elevation_deg > 14.0);
/// assert!(table.lookup(64).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    entries: Box<[CalibrationEntry]>,
}

impl CalibrationTable {
    pub fn new(entries: Vec<CalibrationEntry>) -> Result<Self, CalibrationError> {
        if entries.is_empty() {
            return Err(CalibrationError::Empty);
        }
        Ok(Self {
            entries: entries.into_boxed_slice(),
        })
    }

    /// Pandar64 design angles, channel 1 (top beam) first.
    pub fn pandar64() -> Self {
        let entries = PANDAR64_ELEVATION_DEG
            .iter()
            .zip(PANDAR64_AZIMUTH_OFFSET_DEG.iter())
            .map(|(elevation, offset)| CalibrationEntry::new(*elevation, *offset))
            .collect::<Vec<_>>();
        Self {
            entries: entries.into_boxed_slice(),
        }
    }

    /// Parse a Hesai angle correction file.
    ///
    /// The expected shape is a `Channel,Elevation,Azimuth` header followed by
    /// one row per channel with 1-based channel ids. Rows may come in any
    /// order but the ids must cover `1..=N` without gaps. Lines starting with
    /// `#` are comments.
    ///
    /// # Examples
    /// ```
    /// use pandar_core::CalibrationTable;
    ///
    /// let csv = "Channel,Elevation,Azimuth\n2,-1.5,0.5\n1,2.0,-1.0\n";
    /// let table = CalibrationTable::from_angle_correction_csv(csv).unwrap();
    /// assert_eq!(table.len(), 2);
    /// assert_eq!(table.lookup(0).unwrap().elevation_deg, 2.0);
    /// ```
    pub fn from_angle_correction_csv(text: &str) -> Result<Self, CalibrationError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers().map_err(|err| csv_error(err, 1))?.clone();
        let mut record = csv::StringRecord::new();
        let mut rows: Vec<(usize, CalibrationEntry)> = Vec::new();
        while reader
            .read_record(&mut record)
            .map_err(|err| csv_error(err, 0))?
        {
            let line = record.position().map_or(0, |pos| pos.line() as usize);
            let row: AngleRow = record
                .deserialize(Some(&headers))
                .map_err(|err| csv_error(err, line))?;
            if row.channel == 0 {
                return Err(CalibrationError::Csv {
                    line,
                    message: "channel ids start at 1".to_string(),
                });
            }
            if !row.elevation.is_finite() || !row.azimuth.is_finite() {
                return Err(CalibrationError::Csv {
                    line,
                    message: format!("non-finite angle for channel {}", row.channel),
                });
            }
            rows.push((row.channel, CalibrationEntry::new(row.elevation, row.azimuth)));
        }

        if rows.is_empty() {
            return Err(CalibrationError::Empty);
        }
        rows.sort_by_key(|(channel, _)| *channel);
        let mut entries = Vec::with_capacity(rows.len());
        for (expected, (channel, entry)) in (1..).zip(rows) {
            if channel != expected {
                return Err(CalibrationError::MissingChannel { channel: expected });
            }
            entries.push(entry);
        }
        Self::new(entries)
    }

    pub fn get(&self, laser_id: usize) -> Option<&CalibrationEntry> {
        self.entries.get(laser_id)
    }

    pub fn lookup(&self, laser_id: usize) -> Result<CalibrationEntry, CalibrationError> {
        self.get(laser_id)
            .copied()
            .ok_or(CalibrationError::UnknownLaser {
                laser_id,
                lasers: self.entries.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CalibrationEntry> {
        self.entries.iter()
    }
}

/// One row of a Hesai angle correction file.
#[derive(Debug, Deserialize)]
struct AngleRow {
    #[serde(rename = "Channel", alias = "channel")]
    channel: usize,
    #[serde(rename = "Elevation", alias = "elevation")]
    elevation: f64,
    #[serde(rename = "Azimuth", alias = "azimuth")]
    azimuth: f64,
}

/// `line` is used when the reader cannot tell where the error happened.
fn csv_error(err: csv::Error, line: usize) -> CalibrationError {
    let line = err.position().map_or(line, |pos| pos.line() as usize);
    let message = match err.kind() {
        csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
        _ => err.to_string(),
    };
    CalibrationError::Csv { line, message }
}

const PANDAR64_ELEVATION_DEG: [f64; 64] = [
    14.882, 11.032, 8.059, 5.057, 3.040, 2.028, 1.860, 1.688, //
    1.522, 1.351, 1.184, 1.013, 0.846, 0.675, 0.508, 0.337, //
    0.169, 0.000, -0.167, -0.342, -0.508, -0.676, -0.846, -1.013, //
    -1.180, -1.351, -1.522, -1.691, -1.860, -2.028, -2.198, -2.365, //
    -2.536, -2.700, -2.873, -3.040, -3.210, -3.375, -3.548, -3.712, //
    -3.884, -4.050, -4.221, -4.385, -4.558, -4.720, -4.892, -5.057, //
    -5.229, -5.391, -5.565, -5.726, -5.898, -6.061, -7.063, -8.059, //
    -9.060, -9.885, -11.032, -12.006, -12.974, -13.930, -18.889, -24.897,
];

const PANDAR64_AZIMUTH_OFFSET_DEG: [f64; 64] = [
    -1.042, -1.042, -1.042, -1.042, -1.042, -1.042, 1.042, 3.125, //
    5.208, -5.208, -3.125, -1.042, 1.042, 3.125, 5.208, -5.208, //
    -3.125, -1.042, 1.042, 3.125, 5.208, -5.208, -3.125, -1.042, //
    1.042, 3.125, 5.208, -5.208, -3.125, -1.042, 1.042, 3.125, //
    5.208, -5.208, -3.125, -1.042, 1.042, 3.125, 5.208, -5.208, //
    -3.125, -1.042, 1.042, 3.125, 5.208, -5.208, -3.125, -1.042, //
    1.042, 3.125, 5.208, -5.208, -3.125, -1.042, -1.042, -1.042, //
    -1.042, -1.042, -1.042, -1.042, -1.042, -1.042, -1.042, -1.042,
];
