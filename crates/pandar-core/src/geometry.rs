use crate::calibration::CalibrationEntry;

/// Project a calibrated range measurement into sensor-frame Cartesian meters.
///
/// The azimuth offset of the laser is added to the block azimuth before
/// conversion. The function has no state, so equal inputs give bit-identical
/// outputs.
///
/// # Examples
/// ```
/// use pandar_core::{CalibrationEntry, project};
///
/// let [x, y, z] = project(2.0, 90.0, &CalibrationEntry::new(0.0, 0.0));
/// assert!(x.abs() < 1e-12);
/// assert!((y - 2.0).abs() < 1e-12);
/// assert_eq!(z, 0.0);
/// ```
pub fn project(distance_m: f64, azimuth_deg: f64, calibration: &CalibrationEntry) -> [f64; 3] {
    let elevation = calibration.elevation_deg.to_radians();
    let azimuth = (azimuth_deg + calibration.azimuth_offset_deg).to_radians();
    let horizontal = distance_m * elevation.cos();
    [
        horizontal * azimuth.cos(),
        horizontal * azimuth.sin(),
        distance_m * elevation.sin(),
    ]
}
