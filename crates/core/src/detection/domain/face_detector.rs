use crate::detection::domain::proposal::Detection;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Returns suppressed detections in original-frame coordinates, ordered by
/// descending score. `&mut self` because inference sessions need exclusive
/// access while running.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;

    /// Change the minimum proposal score for subsequent calls.
    fn set_score_threshold(&mut self, threshold: f64);
}
