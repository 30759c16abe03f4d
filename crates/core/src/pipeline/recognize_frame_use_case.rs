use std::sync::Arc;

use serde::Serialize;

use crate::pipeline::frame_analyzer::{FaceRecord, FrameAnalyzer};
use crate::pipeline::recognition_state::RecognitionState;
use crate::recognition::domain::gallery::Gallery;
use crate::recognition::domain::gallery_matcher::GalleryMatcher;
use crate::shared::bbox::BBox;
use crate::shared::constants::UNKNOWN_LABEL;
use crate::shared::frame::Frame;
use crate::tracking::domain::identity_tracker::Observation;

/// Per-face output: where, who, how sure, and which track.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceResult {
    pub bbox: BBox,
    pub label: String,
    pub confidence: f32,
    pub track_id: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameResult {
    pub frame: usize,
    pub faces: Vec<FaceResult>,
}

/// A face after matching, before tracking.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentifiedFace {
    pub bbox: BBox,
    pub label: String,
    pub similarity: f32,
}

/// Match each analyzed face against a gallery snapshot.
pub fn identify(records: &[FaceRecord], matcher: &GalleryMatcher, gallery: &Gallery) -> Vec<IdentifiedFace> {
    records
        .iter()
        .map(|record| {
            let outcome = matcher.best_match(&record.embedding, gallery);
            log::debug!(
                "face {:?}: {} ({:.3})",
                record.bbox.to_array(),
                outcome.label,
                outcome.similarity
            );
            IdentifiedFace {
                bbox: record.bbox,
                label: outcome.label,
                similarity: outcome.similarity,
            }
        })
        .collect()
}

/// Feed one frame's identified faces to the tracker and build the output.
///
/// The tracker always sees every face; `known_only` filters the result
/// afterwards.
pub fn stabilize(
    state: &RecognitionState,
    frame_index: usize,
    faces: Vec<IdentifiedFace>,
    known_only: bool,
) -> Result<FrameResult, Box<dyn std::error::Error>> {
    let observations: Vec<Observation> = faces
        .iter()
        .map(|f| Observation {
            bbox: f.bbox,
            label: f.label.clone(),
        })
        .collect();
    let assignments = state.update_tracker(&observations)?;

    let faces = faces
        .into_iter()
        .zip(assignments)
        .map(|(face, assignment)| FaceResult {
            bbox: face.bbox,
            label: assignment.stable_label,
            confidence: face.similarity,
            track_id: assignment.track_id,
        })
        .filter(|f| !known_only || f.label != UNKNOWN_LABEL)
        .collect();

    Ok(FrameResult {
        frame: frame_index,
        faces,
    })
}

/// Recognize faces in frames one at a time on the calling thread.
pub struct RecognizeFrameUseCase {
    analyzer: FrameAnalyzer,
    matcher: GalleryMatcher,
    state: Arc<RecognitionState>,
    known_only: bool,
}

impl RecognizeFrameUseCase {
    pub fn new(
        analyzer: FrameAnalyzer,
        matcher: GalleryMatcher,
        state: Arc<RecognitionState>,
        known_only: bool,
    ) -> Self {
        Self {
            analyzer,
            matcher,
            state,
            known_only,
        }
    }

    pub fn execute(&mut self, frame: &Frame) -> Result<FrameResult, Box<dyn std::error::Error>> {
        let records = self.analyzer.analyze(frame)?;
        let gallery = self.state.gallery_snapshot()?;
        let faces = identify(&records, &self.matcher, &gallery);
        stabilize(&self.state, frame.index(), faces, self.known_only)
    }
}
