use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::bbox::BBox;

/// A decoded candidate face, already mapped back to original-frame
/// coordinates. Lives only between decoding and suppression.
#[derive(Clone, Debug, PartialEq)]
pub struct Proposal {
    pub bbox: BBox,
    pub score: f64,
    pub landmarks: FaceLandmarks,
}

/// A proposal that survived suppression. Owned by one frame's analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BBox,
    pub score: f64,
    pub landmarks: FaceLandmarks,
}

impl From<Proposal> for Detection {
    fn from(p: Proposal) -> Self {
        Self {
            bbox: p.bbox,
            score: p.score,
            landmarks: p.landmarks,
        }
    }
}
