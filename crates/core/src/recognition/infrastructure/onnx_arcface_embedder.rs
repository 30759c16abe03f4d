/// ArcFace recognition model run through ONNX Runtime.
///
/// Accepts any face image, resizes it to the model's 112×112 input and
/// returns the raw output vector. Normalization happens in the domain.
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;

use crate::recognition::domain::face_embedder::FaceEmbedder;
use crate::shared::constants::CHIP_SIZE;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::open_session;
use crate::shared::preprocess::to_normalized_nchw;

pub struct OnnxArcfaceEmbedder {
    session: Mutex<ort::session::Session>,
}

impl OnnxArcfaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path, None)?;
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl FaceEmbedder for OnnxArcfaceEmbedder {
    fn embed(&self, face: &Frame) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        if face.is_empty() {
            return Err("cannot embed an empty face image".into());
        }
        let input_value = ort::value::Tensor::from_array(preprocess(face))?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let embedding = outputs[0].try_extract_array::<f32>()?;
        Ok(embedding.iter().copied().collect())
    }
}

/// Stretch to the model input (no aspect preservation) and normalize.
fn preprocess(face: &Frame) -> Array4<f32> {
    let size = (CHIP_SIZE, CHIP_SIZE);
    to_normalized_nchw(face, size, size)
}
