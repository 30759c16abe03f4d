/// SCRFD face detector using ONNX Runtime via `ort`.
///
/// Resizes the frame so its longest side fits the detector input, pads to a
/// stride-aligned canvas, runs the three-stride head, and hands the raw
/// tensors to the domain decoder, aggregator and suppressor.
use std::path::Path;

use ndarray::{Array2, Array4, ArrayViewD};

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::NUM_LANDMARKS;
use crate::detection::domain::non_max_suppressor::NonMaxSuppressor;
use crate::detection::domain::proposal::Detection;
use crate::detection::domain::proposal_aggregator::aggregate;
use crate::detection::domain::stride_decoder::{
    ShapeMismatch, StrideConfig, StrideDecoder, StrideOutputs, NUM_ANCHORS,
};
use crate::shared::config::DetectorConfig;
use crate::shared::constants::DETECTOR_PAD_MULTIPLE;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::open_session;
use crate::shared::preprocess::to_normalized_nchw;

/// SCRFD detector backed by an ONNX Runtime session.
pub struct OnnxScrfdDetector {
    session: ort::session::Session,
    config: DetectorConfig,
    score_threshold: f64,
}

impl OnnxScrfdDetector {
    pub fn new(model_path: &Path, config: DetectorConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path, None)?;
        let expected = config.strides.len() * 3;
        let actual = session.outputs().len();
        if actual != expected {
            return Err(format!(
                "detector model has {actual} outputs, expected {expected} for {} strides",
                config.strides.len()
            )
            .into());
        }
        Ok(Self {
            session,
            score_threshold: config.score_threshold,
            config,
        })
    }
}

impl FaceDetector for OnnxScrfdDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let input = preprocess(frame, self.config.input_size);
        let input_value = ort::value::Tensor::from_array(input.tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // Outputs are grouped by kind: all scores, then all boxes, then all
        // landmarks, each in stride order.
        let n = self.config.strides.len();
        let input_size = (input.width, input.height);
        let mut per_stride = Vec::with_capacity(n);
        for (s, stride) in self.config.strides.iter().enumerate() {
            let tensors = [s, s + n, s + 2 * n].map(|i| outputs[i].try_extract_array::<f32>().ok());
            let decoded = stride_rows(stride, input_size, tensors).and_then(|rows| {
                StrideDecoder::new(stride.clone(), self.score_threshold).decode(
                    &rows.view(),
                    input_size,
                    input.ratio,
                )
            });
            per_stride.push(decoded);
        }

        let proposals = aggregate(per_stride);
        let kept = NonMaxSuppressor::new(self.config.nms_threshold).suppress(proposals);
        log::trace!("frame {}: {} faces after NMS", frame.index(), kept.len());
        Ok(kept.into_iter().map(Detection::from).collect())
    }

    fn set_score_threshold(&mut self, threshold: f64) {
        self.score_threshold = threshold;
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct DetectorInput {
    tensor: Array4<f32>,
    /// Padded canvas width.
    width: u32,
    /// Padded canvas height.
    height: u32,
    /// Resized / original.
    ratio: f64,
}

/// Shrink frames whose longest side exceeds `target` (never enlarge), then
/// pad right and bottom with black up to a multiple of the largest stride.
fn preprocess(frame: &Frame, target: u32) -> DetectorInput {
    let (fw, fh) = (frame.width(), frame.height());
    let longest = fw.max(fh) as f64;
    let ratio = target as f64 / longest;

    let (ratio, rw, rh) = if ratio < 1.0 {
        let rw = ((fw as f64 * ratio) as u32).max(1);
        let rh = ((fh as f64 * ratio) as u32).max(1);
        (ratio, rw, rh)
    } else {
        (1.0, fw, fh)
    };

    let width = rw.div_ceil(DETECTOR_PAD_MULTIPLE) * DETECTOR_PAD_MULTIPLE;
    let height = rh.div_ceil(DETECTOR_PAD_MULTIPLE) * DETECTOR_PAD_MULTIPLE;

    DetectorInput {
        tensor: to_normalized_nchw(frame, (rw, rh), (width, height)),
        width,
        height,
        ratio,
    }
}

/// One stride's outputs reshaped to `(candidates, channels)`.
struct StrideRows {
    scores: Array2<f32>,
    bbox: Array2<f32>,
    landmarks: Array2<f32>,
}

impl StrideRows {
    fn view(&self) -> StrideOutputs<'_> {
        StrideOutputs {
            scores: self.scores.view(),
            bbox: self.bbox.view(),
            landmarks: self.landmarks.view(),
        }
    }
}

/// Reshape the score, box and landmark tensors of one stride.
///
/// A tensor that is missing, not `f32`, or does not split into rows of its
/// channel width is a `ShapeMismatch`, so only this stride is skipped.
fn stride_rows(
    stride: &StrideConfig,
    input_size: (u32, u32),
    tensors: [Option<ArrayViewD<'_, f32>>; 3],
) -> Result<StrideRows, ShapeMismatch> {
    let (fh, fw) = stride.grid(input_size.0, input_size.1);
    let count = fh * fw * NUM_ANCHORS;
    let [scores, bbox, landmarks] = tensors;
    Ok(StrideRows {
        scores: reshape(stride.stride, count, "score", 1, scores)?,
        bbox: reshape(stride.stride, count, "bbox", 4, bbox)?,
        landmarks: reshape(stride.stride, count, "landmark", NUM_LANDMARKS * 2, landmarks)?,
    })
}

fn reshape(
    stride: u32,
    count: usize,
    tensor: &'static str,
    channels: usize,
    view: Option<ArrayViewD<'_, f32>>,
) -> Result<Array2<f32>, ShapeMismatch> {
    let mismatch = |actual| ShapeMismatch {
        stride,
        tensor,
        expected: (count, channels),
        actual,
    };
    let view = view.ok_or_else(|| mismatch((0, 0)))?;
    let len = view.len();
    to_rows(view, channels).ok_or_else(|| mismatch((1, len)))
}

/// Flatten an output tensor to `(candidates, channels)`.
///
/// Exported models emit either `(N, C)` or a batched `(1, N, C)`. `None`
/// when the element count is not a multiple of `channels`.
fn to_rows(view: ArrayViewD<'_, f32>, channels: usize) -> Option<Array2<f32>> {
    let len = view.len();
    if channels == 0 || len % channels != 0 {
        return None;
    }
    let data: Vec<f32> = view.iter().copied().collect();
    Array2::from_shape_vec((len / channels, channels), data).ok()
}
