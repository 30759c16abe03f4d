use std::sync::Arc;

use crate::alignment::domain::landmark_aligner::LandmarkAligner;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::detection::domain::proposal::Detection;
use crate::recognition::domain::embedding::Embedding;
use crate::recognition::domain::face_embedder::FaceEmbedder;
use crate::shared::bbox::BBox;
use crate::shared::frame::Frame;

/// One detected face with its unit embedding. Lives for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceRecord {
    pub bbox: BBox,
    pub landmarks: FaceLandmarks,
    pub score: f64,
    pub embedding: Embedding,
    /// False when the embedding came from a fallback box crop.
    pub aligned: bool,
}

/// Detect → align → embed → normalize for a single frame.
///
/// Only detector failures are reported as errors. Anything that goes wrong
/// for an individual face drops that face and keeps the rest.
pub struct FrameAnalyzer {
    detector: Box<dyn FaceDetector>,
    aligner: LandmarkAligner,
    embedder: Arc<dyn FaceEmbedder>,
    min_face_size: f64,
}

impl FrameAnalyzer {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        aligner: LandmarkAligner,
        embedder: Arc<dyn FaceEmbedder>,
        min_face_size: f64,
    ) -> Self {
        Self {
            detector,
            aligner,
            embedder,
            min_face_size,
        }
    }

    pub fn set_score_threshold(&mut self, threshold: f64) {
        self.detector.set_score_threshold(threshold);
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        self.detector.detect(frame)
    }

    /// Every face large enough to recognize, in detector order.
    pub fn analyze(&mut self, frame: &Frame) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>> {
        let detections = self.detector.detect(frame)?;
        let total = detections.len();
        let records: Vec<FaceRecord> = detections
            .into_iter()
            .filter(|d| self.is_large_enough(d))
            .filter_map(|d| self.embed_detection(frame, d))
            .collect();
        log::debug!(
            "frame {}: {} detections, {} embedded",
            frame.index(),
            total,
            records.len()
        );
        Ok(records)
    }

    /// Align (or crop) and embed one detection.
    pub fn embed_detection(&self, frame: &Frame, detection: Detection) -> Option<FaceRecord> {
        let chip = self.aligner.align(frame, &detection)?;
        let aligned = chip.is_aligned();
        let embedding = self.embed_image(chip.frame())?;
        Some(FaceRecord {
            bbox: detection.bbox,
            landmarks: detection.landmarks,
            score: detection.score,
            embedding,
            aligned,
        })
    }

    /// Embed an arbitrary image (whole frame, chip or crop).
    pub fn embed_image(&self, image: &Frame) -> Option<Embedding> {
        let raw = match self.embedder.embed(image) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("frame {}: embedding failed, dropping face: {e}", image.index());
                return None;
            }
        };
        match Embedding::normalize(raw) {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                log::warn!("frame {}: {e}, dropping face", image.index());
                None
            }
        }
    }

    fn is_large_enough(&self, detection: &Detection) -> bool {
        let keep = detection.bbox.width() >= self.min_face_size
            && detection.bbox.height() >= self.min_face_size;
        if !keep {
            log::trace!("skipping small face {:?}", detection.bbox.to_array());
        }
        keep
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Model-free stand-ins shared by the pipeline tests.

    use std::sync::Mutex;

    use super::*;
    use crate::alignment::domain::affine_transform::AffineTransform;
    use crate::alignment::domain::similarity_estimator::{SimilarityEstimator, ARCFACE_TEMPLATE};
    use crate::detection::domain::face_landmarks::NUM_LANDMARKS;

    /// Returns a scripted detection list per call; repeats the last one.
    pub struct ScriptedDetector {
        pub frames: Vec<Vec<Detection>>,
        pub calls: usize,
        pub thresholds: Arc<Mutex<Vec<f64>>>,
    }

    impl ScriptedDetector {
        pub fn new(frames: Vec<Vec<Detection>>) -> Self {
            Self {
                frames,
                calls: 0,
                thresholds: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl FaceDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            let i = self.calls.min(self.frames.len().saturating_sub(1));
            self.calls += 1;
            Ok(self.frames.get(i).cloned().unwrap_or_default())
        }

        fn set_score_threshold(&mut self, threshold: f64) {
            self.thresholds.lock().unwrap().push(threshold);
        }
    }

    pub struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Err("inference failed".into())
        }

        fn set_score_threshold(&mut self, _threshold: f64) {}
    }

    /// Embeds an image as its mean RGB color, so faces cut from
    /// differently colored regions get different embeddings.
    pub struct MeanColorEmbedder;

    impl FaceEmbedder for MeanColorEmbedder {
        fn embed(&self, face: &Frame) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            if face.is_empty() {
                return Err("empty".into());
            }
            let mut sums = [0f64; 3];
            for px in face.data().chunks(3) {
                for c in 0..3 {
                    sums[c] += px[c] as f64;
                }
            }
            let n = (face.width() * face.height()) as f64;
            Ok(sums.iter().map(|s| (s / n) as f32).collect())
        }
    }

    /// Maps the template box straight onto the chip via the detection's
    /// first landmark as an offset, or refuses when `fail` is set.
    pub struct ShiftEstimator {
        pub fail: bool,
    }

    impl SimilarityEstimator for ShiftEstimator {
        fn estimate(
            &self,
            src: &[(f64, f64); NUM_LANDMARKS],
            dst: &[(f64, f64); NUM_LANDMARKS],
        ) -> Option<AffineTransform> {
            if self.fail {
                return None;
            }
            Some(AffineTransform::similarity(
                1.0,
                0.0,
                dst[0].0 - src[0].0,
                dst[0].1 - src[0].1,
            ))
        }
    }

    /// A detection whose landmarks sit at the template offset by `(x, y)`.
    pub fn detection_at(x: f64, y: f64, size: f64) -> Detection {
        let mut points = ARCFACE_TEMPLATE;
        for p in &mut points {
            *p = (p.0 + x, p.1 + y);
        }
        Detection {
            bbox: BBox::new(x, y, x + size, y + size),
            score: 0.9,
            landmarks: FaceLandmarks::new(points),
        }
    }

    /// 400×200 frame: left half red, right half blue.
    pub fn two_tone_frame(index: usize) -> Frame {
        let (w, h) = (400u32, 200u32);
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for _ in 0..h {
            for x in 0..w {
                data.extend_from_slice(if x < 200 { &[200, 0, 0] } else { &[0, 0, 200] });
            }
        }
        Frame::new(data, w, h, 3, index)
    }

    pub fn analyzer(detector: Box<dyn FaceDetector>, estimator_fails: bool) -> FrameAnalyzer {
        FrameAnalyzer::new(
            detector,
            LandmarkAligner::new(Box::new(ShiftEstimator {
                fail: estimator_fails,
            })),
            Arc::new(MeanColorEmbedder),
            40.0,
        )
    }
}
