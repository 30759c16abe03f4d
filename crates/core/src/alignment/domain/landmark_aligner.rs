//! Produces the face image fed to the recognition model.
//!
//! The normal path warps the frame so the detected landmarks land on the
//! canonical template. When the estimator finds no transform the face box
//! is cropped instead, and a box with no area left after clamping yields
//! nothing at all.

use crate::alignment::domain::affine_transform::AffineTransform;
use crate::alignment::domain::similarity_estimator::{SimilarityEstimator, ARCFACE_TEMPLATE};
use crate::detection::domain::face_landmarks::NUM_LANDMARKS;
use crate::detection::domain::proposal::Detection;
use crate::shared::constants::CHIP_SIZE;
use crate::shared::frame::Frame;

/// Value written where the warp samples outside the frame.
const BORDER_FILL: u8 = 0;

/// Image handed to recognition for one face.
#[derive(Clone, Debug, PartialEq)]
pub enum FaceChip {
    /// `CHIP_SIZE`² warp onto the canonical template.
    Aligned(Frame),
    /// Box crop used when no transform could be estimated.
    Cropped(Frame),
}

impl FaceChip {
    pub fn frame(&self) -> &Frame {
        match self {
            FaceChip::Aligned(f) | FaceChip::Cropped(f) => f,
        }
    }

    pub fn is_aligned(&self) -> bool {
        matches!(self, FaceChip::Aligned(_))
    }
}

pub struct LandmarkAligner {
    estimator: Box<dyn SimilarityEstimator>,
    template: [(f64, f64); NUM_LANDMARKS],
    chip_size: u32,
}

impl LandmarkAligner {
    pub fn new(estimator: Box<dyn SimilarityEstimator>) -> Self {
        Self {
            estimator,
            template: ARCFACE_TEMPLATE,
            chip_size: CHIP_SIZE,
        }
    }

    /// Estimate the landmark → template transform for one detection.
    pub fn transform_for(&self, detection: &Detection) -> Option<AffineTransform> {
        self.estimator
            .estimate(detection.landmarks.points(), &self.template)
            .filter(AffineTransform::is_finite)
    }

    /// Aligned chip, fallback crop, or `None` when the face has no pixels
    /// inside the frame.
    pub fn align(&self, frame: &Frame, detection: &Detection) -> Option<FaceChip> {
        if let Some(chip) = self
            .transform_for(detection)
            .and_then(|t| warp(frame, &t, self.chip_size))
        {
            return Some(FaceChip::Aligned(chip));
        }

        log::warn!(
            "frame {}: no alignment for face at {:?}, cropping box",
            frame.index(),
            detection.bbox.to_array()
        );
        let (x1, y1, x2, y2) = detection.bbox.clamp_to_frame(frame.width(), frame.height())?;
        Some(FaceChip::Cropped(frame.crop(x1, y1, x2, y2)))
    }
}

/// Inverse-map every chip pixel into `frame` and sample bilinearly.
///
/// `transform` maps frame coordinates to chip coordinates.
pub fn warp(frame: &Frame, transform: &AffineTransform, size: u32) -> Option<Frame> {
    let inverse = transform.inverse()?;
    let channels = frame.channels() as usize;
    let mut data = Vec::with_capacity(size as usize * size as usize * channels);

    for v in 0..size {
        for u in 0..size {
            let (x, y) = inverse.apply(u as f64, v as f64);
            for c in 0..channels {
                let value = frame.sample_bilinear(x, y, c, BORDER_FILL);
                data.push(value.round().clamp(0.0, 255.0) as u8);
            }
        }
    }

    Some(Frame::new(data, size, size, frame.channels(), frame.index()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_landmarks::FaceLandmarks;
    use crate::shared::bbox::BBox;

    /// Always answers with the same transform (or none).
    struct FixedEstimator(Option<AffineTransform>);

    impl SimilarityEstimator for FixedEstimator {
        fn estimate(
            &self,
            _src: &[(f64, f64); NUM_LANDMARKS],
            _dst: &[(f64, f64); NUM_LANDMARKS],
        ) -> Option<AffineTransform> {
            self.0
        }
    }

    fn detection(bbox: BBox) -> Detection {
        Detection {
            bbox,
            score: 0.9,
            landmarks: FaceLandmarks::new(ARCFACE_TEMPLATE),
        }
    }

    fn gradient_frame(w: u32, h: u32) -> Frame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        Frame::new(data, w, h, 3, 7)
    }

    #[test]
    fn test_identity_transform_copies_top_left() {
        let frame = gradient_frame(200, 200);
        let aligner = LandmarkAligner::new(Box::new(FixedEstimator(Some(AffineTransform::identity()))));

        let chip = aligner.align(&frame, &detection(BBox::new(0.0, 0.0, 50.0, 50.0))).unwrap();

        assert!(chip.is_aligned());
        let f = chip.frame();
        assert_eq!((f.width(), f.height()), (CHIP_SIZE, CHIP_SIZE));
        assert_eq!(f.index(), 7);
        assert_eq!(f.as_ndarray()[[10, 20, 0]], 20);
        assert_eq!(f.as_ndarray()[[10, 20, 1]], 10);
    }

    #[test]
    fn test_translation_outside_frame_reads_fill() {
        let frame = Frame::filled(50, 50, [200, 200, 200], 0);
        // chip (u, v) samples frame (u - 200, v - 200): entirely outside
        let shift = AffineTransform::similarity(1.0, 0.0, 200.0, 200.0);
        let chip = warp(&frame, &shift, 112).unwrap();
        assert!(chip.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_downscale_warp_samples_scaled_positions() {
        let frame = gradient_frame(250, 250);
        // frame → chip halves coordinates, so chip (u, v) reads frame (2u, 2v)
        let half = AffineTransform::similarity(0.5, 0.0, 0.0, 0.0);
        let chip = warp(&frame, &half, 112).unwrap();
        assert_eq!(chip.as_ndarray()[[30, 40, 0]], 80);
        assert_eq!(chip.as_ndarray()[[30, 40, 1]], 60);
    }

    // ── Fallback ──

    #[test]
    fn test_no_transform_falls_back_to_clamped_crop() {
        let frame = gradient_frame(100, 80);
        let aligner = LandmarkAligner::new(Box::new(FixedEstimator(None)));

        let chip = aligner
            .align(&frame, &detection(BBox::new(-10.7, 20.9, 60.2, 500.0)))
            .unwrap();

        assert!(!chip.is_aligned());
        let f = chip.frame();
        // x: trunc(-10.7) → 0, trunc(60.2) → 60; y: 20 .. clamp(500) → 80
        assert_eq!((f.width(), f.height()), (60, 60));
        assert_eq!(f.as_ndarray()[[0, 5, 1]], 20);
    }

    #[test]
    fn test_no_transform_and_box_outside_frame_skips_face() {
        let frame = gradient_frame(100, 80);
        let aligner = LandmarkAligner::new(Box::new(FixedEstimator(None)));
        assert!(aligner
            .align(&frame, &detection(BBox::new(150.0, 10.0, 200.0, 40.0)))
            .is_none());
    }

    #[test]
    fn test_singular_transform_falls_back() {
        let frame = gradient_frame(100, 80);
        let singular = AffineTransform::similarity(0.0, 0.0, 0.0, 0.0);
        let aligner = LandmarkAligner::new(Box::new(FixedEstimator(Some(singular))));

        let chip = aligner.align(&frame, &detection(BBox::new(10.0, 10.0, 30.0, 30.0))).unwrap();

        assert_eq!(chip, FaceChip::Cropped(frame.crop(10, 10, 30, 30)));
    }

    #[test]
    fn test_non_finite_transform_falls_back() {
        let frame = gradient_frame(100, 80);
        let broken = AffineTransform::similarity(f64::NAN, 0.0, 0.0, 0.0);
        let aligner = LandmarkAligner::new(Box::new(FixedEstimator(Some(broken))));
        let chip = aligner.align(&frame, &detection(BBox::new(10.0, 10.0, 30.0, 30.0)));
        assert!(matches!(chip, Some(FaceChip::Cropped(_))));
    }

    #[test]
    fn test_collinear_landmarks_fall_back_to_crop_with_lmeds() {
        use crate::alignment::infrastructure::lmeds_similarity_estimator::LmedsSimilarityEstimator;

        let frame = gradient_frame(100, 80);
        let aligner = LandmarkAligner::new(Box::new(LmedsSimilarityEstimator::new()));
        let on_a_line = [(10.0, 20.0), (20.0, 20.0), (30.0, 20.0), (40.0, 20.0), (50.0, 20.0)];
        let det = Detection {
            bbox: BBox::new(10.0, 10.0, 50.0, 40.0),
            score: 0.9,
            landmarks: FaceLandmarks::new(on_a_line),
        };

        assert!(aligner.transform_for(&det).is_none());
        let chip = aligner.align(&frame, &det);
        assert_eq!(chip, Some(FaceChip::Cropped(frame.crop(10, 10, 50, 40))));

        let outside = Detection {
            bbox: BBox::new(150.0, 10.0, 200.0, 40.0),
            ..det
        };
        assert!(aligner.align(&frame, &outside).is_none());
    }
}
