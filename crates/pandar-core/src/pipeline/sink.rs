use crate::diagnostics::Diagnostic;
use crate::point::PointXYZI;
use crate::protocols::pandar64::DecodeMode;

/// Metadata handed to a sink alongside each cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    /// Zero-based position of the frame in the source.
    pub index: u64,
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub captured_len: u32,
    pub mode: Option<DecodeMode>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FrameInfo {
    pub fn timestamp(&self) -> f64 {
        f64::from(self.ts_sec) + f64::from(self.ts_usec) * 1e-6
    }
}

/// Consumer of decoded clouds, called once per input frame in capture order.
///
/// Frames that produced no points still reach the sink with an empty slice.
pub trait PointCloudSink {
    fn on_cloud(&mut self, frame: &FrameInfo, points: &[PointXYZI]);
}

impl<F> PointCloudSink for F
where
    F: FnMut(&FrameInfo, &[PointXYZI]),
{
    fn on_cloud(&mut self, frame: &FrameInfo, points: &[PointXYZI]) {
        self(frame, points)
    }
}

/// Keeps every cloud in memory.
///
/// # Examples
/// ```
/// use pandar_core::{CollectingSink, PointCloudSink};
///
/// let sink = CollectingSink::new();
/// assert!(sink.is_empty());
/// assert_eq!(sink.total_points(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    clouds: Vec<(FrameInfo, Vec<PointXYZI>)>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clouds(&self) -> &[(FrameInfo, Vec<PointXYZI>)] {
        &self.clouds
    }

    pub fn into_clouds(self) -> Vec<(FrameInfo, Vec<PointXYZI>)> {
        self.clouds
    }

    pub fn len(&self) -> usize {
        self.clouds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clouds.is_empty()
    }

    pub fn total_points(&self) -> usize {
        self.clouds.iter().map(|(_, points)| points.len()).sum()
    }
}

impl PointCloudSink for CollectingSink {
    fn on_cloud(&mut self, frame: &FrameInfo, points: &[PointXYZI]) {
        self.clouds.push((frame.clone(), points.to_vec()));
    }
}
