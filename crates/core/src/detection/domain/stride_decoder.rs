//! Anchor-based decoding of one detector stride.
//!
//! Each stride produces a `fh × fw` grid of cells with two anchors per cell.
//! Candidate `i` sits at cell `i / 2` (row-major) and uses anchor `i % 2`.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::face_landmarks::{FaceLandmarks, NUM_LANDMARKS};
use crate::detection::domain::proposal::Proposal;
use crate::shared::bbox::BBox;

/// Anchors per grid cell.
pub const NUM_ANCHORS: usize = 2;

/// Regression scale for box center offsets.
const CENTER_VARIANCE: f64 = 0.1;
/// Regression scale for log box sizes.
const SIZE_VARIANCE: f64 = 0.2;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrideConfig {
    pub stride: u32,
    pub anchor_sizes: [f64; NUM_ANCHORS],
}

impl StrideConfig {
    pub fn new(stride: u32, anchor_sizes: [f64; NUM_ANCHORS]) -> Self {
        Self {
            stride,
            anchor_sizes,
        }
    }

    /// Strides 8/16/32 with the anchor sizes the SCRFD `det_10g` head expects.
    pub fn scrfd_defaults() -> Vec<Self> {
        vec![
            Self::new(8, [16.0, 32.0]),
            Self::new(16, [64.0, 128.0]),
            Self::new(32, [256.0, 512.0]),
        ]
    }

    /// Feature-map `(rows, cols)` for a padded detector input.
    pub fn grid(&self, input_width: u32, input_height: u32) -> (usize, usize) {
        (
            (input_height / self.stride) as usize,
            (input_width / self.stride) as usize,
        )
    }
}

/// Raw tensors for one stride, squeezed to `(candidates, channels)`.
///
/// Channels: scores 1, box regression 4 (`tx, ty, tw, th`),
/// landmark regression 10 (interleaved x/y).
#[derive(Clone, Copy, Debug)]
pub struct StrideOutputs<'a> {
    pub scores: ArrayView2<'a, f32>,
    pub bbox: ArrayView2<'a, f32>,
    pub landmarks: ArrayView2<'a, f32>,
}

/// A stride's tensors do not match the grid implied by the input size.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("stride {stride}: {tensor} tensor has shape {actual:?}, expected {expected:?}")]
pub struct ShapeMismatch {
    pub stride: u32,
    pub tensor: &'static str,
    pub expected: (usize, usize),
    pub actual: (usize, usize),
}

/// Decodes one stride's raw outputs into proposals in original-frame
/// coordinates.
#[derive(Clone, Debug)]
pub struct StrideDecoder {
    config: StrideConfig,
    score_threshold: f64,
}

impl StrideDecoder {
    pub fn new(config: StrideConfig, score_threshold: f64) -> Self {
        Self {
            config,
            score_threshold,
        }
    }

    /// Decode every candidate whose score exceeds the threshold.
    ///
    /// `input_size` is the padded detector input `(width, height)`;
    /// `resize_ratio` is the preprocessing scale applied to the original
    /// frame. All geometry is divided by it before returning.
    pub fn decode(
        &self,
        outputs: &StrideOutputs<'_>,
        input_size: (u32, u32),
        resize_ratio: f64,
    ) -> Result<Vec<Proposal>, ShapeMismatch> {
        let (fh, fw) = self.config.grid(input_size.0, input_size.1);
        let count = fh * fw * NUM_ANCHORS;
        self.check_shape("score", outputs.scores, (count, 1))?;
        self.check_shape("bbox", outputs.bbox, (count, 4))?;
        self.check_shape("landmark", outputs.landmarks, (count, NUM_LANDMARKS * 2))?;

        let stride = self.config.stride as f64;
        let mut proposals = Vec::new();

        for i in 0..count {
            let score = outputs.scores[[i, 0]] as f64;
            if score.is_nan() || score <= self.score_threshold {
                continue;
            }

            let cell = i / NUM_ANCHORS;
            let anchor = self.config.anchor_sizes[i % NUM_ANCHORS];
            let (row, col) = (cell / fw, cell % fw);
            let cx = col as f64 * stride + stride / 2.0;
            let cy = row as f64 * stride + stride / 2.0;

            let reg = outputs.bbox.row(i);
            let dx = reg[0] as f64 * CENTER_VARIANCE * anchor;
            let dy = reg[1] as f64 * CENTER_VARIANCE * anchor;
            let w = (reg[2] as f64 * SIZE_VARIANCE).exp() * anchor;
            let h = (reg[3] as f64 * SIZE_VARIANCE).exp() * anchor;
            let bbox = BBox::from_center(cx + dx, cy + dy, w, h);

            let kps = outputs.landmarks.row(i);
            let mut points = [(0.0, 0.0); NUM_LANDMARKS];
            for (k, p) in points.iter_mut().enumerate() {
                *p = (
                    kps[2 * k] as f64 * stride + cx,
                    kps[2 * k + 1] as f64 * stride + cy,
                );
            }

            proposals.push(Proposal {
                bbox: bbox.unscale(resize_ratio),
                score,
                landmarks: FaceLandmarks::new(points).unscale(resize_ratio),
            });
        }

        Ok(proposals)
    }

    fn check_shape(
        &self,
        tensor: &'static str,
        view: ArrayView2<'_, f32>,
        expected: (usize, usize),
    ) -> Result<(), ShapeMismatch> {
        let actual = view.dim();
        if actual == expected {
            Ok(())
        } else {
            Err(ShapeMismatch {
                stride: self.config.stride,
                tensor,
                expected,
                actual,
            })
        }
    }
}
