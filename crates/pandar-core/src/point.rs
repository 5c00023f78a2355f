use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationEntry;
use crate::geometry::project;

/// One calibrated return in sensor-frame meters.
///
/// # Examples
/// ```
/// use pandar_core::{CalibrationEntry, PointXYZI};
///
/// let point = PointXYZI::from_polar(1.0, 0.0, &CalibrationEntry::new(0.0, 0.0), 42);
/// assert_eq!(point.x, 1.0);
/// assert_eq!(point.intensity, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointXYZI {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: u8,
}

impl PointXYZI {
    pub fn new(x: f32, y: f32, z: f32, intensity: u8) -> Self {
        Self { x, y, z, intensity }
    }

    /// Project a range/azimuth pair through a laser's calibration entry.
    pub fn from_polar(
        distance_m: f64,
        azimuth_deg: f64,
        calibration: &CalibrationEntry,
        intensity: u8,
    ) -> Self {
        let [x, y, z] = project(distance_m, azimuth_deg, calibration);
        Self::new(x as f32, y as f32, z as f32, intensity)
    }

    /// Euclidean distance from the sensor origin.
    pub fn range(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}
