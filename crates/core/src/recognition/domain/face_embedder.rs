use crate::shared::frame::Frame;

/// Maps a face image to a raw (unnormalized) embedding vector.
///
/// Implementations resize the input themselves, so both aligned chips and
/// fallback crops of any size are accepted.
pub trait FaceEmbedder: Send + Sync {
    fn embed(&self, face: &Frame) -> Result<Vec<f32>, Box<dyn std::error::Error>>;
}
