use crate::alignment::domain::affine_transform::AffineTransform;
use crate::detection::domain::face_landmarks::NUM_LANDMARKS;

/// Landmark positions of a canonical face in the 112×112 chip.
pub const ARCFACE_TEMPLATE: [(f64, f64); NUM_LANDMARKS] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// Estimates a similarity transform (rotation, uniform scale, translation)
/// taking `src` points onto `dst` points.
///
/// Returns `None` when no trustworthy solution exists.
pub trait SimilarityEstimator: Send + Sync {
    fn estimate(
        &self,
        src: &[(f64, f64); NUM_LANDMARKS],
        dst: &[(f64, f64); NUM_LANDMARKS],
    ) -> Option<AffineTransform>;
}
