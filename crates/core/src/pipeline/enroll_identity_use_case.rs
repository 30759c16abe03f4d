use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::frame_analyzer::FrameAnalyzer;
use crate::pipeline::recognition_state::RecognitionState;
use crate::recognition::domain::embedding::Embedding;
use crate::recognition::domain::gallery_store::GalleryStore;
use crate::shared::frame::Frame;
use crate::video::infrastructure::image_sequence_reader::load_image;

/// Adds reference embeddings for one identity from still images.
///
/// Each image contributes at most one embedding: the largest detected
/// face, or the whole image when nothing is detected.
pub struct EnrollIdentityUseCase {
    analyzer: FrameAnalyzer,
    state: Arc<RecognitionState>,
    store: Box<dyn GalleryStore>,
    enroll_threshold: f64,
    recognize_threshold: f64,
}

impl EnrollIdentityUseCase {
    pub fn new(
        analyzer: FrameAnalyzer,
        state: Arc<RecognitionState>,
        store: Box<dyn GalleryStore>,
        enroll_threshold: f64,
        recognize_threshold: f64,
    ) -> Self {
        Self {
            analyzer,
            state,
            store,
            enroll_threshold,
            recognize_threshold,
        }
    }

    /// Enroll from image files. Returns the number of embeddings added.
    pub fn execute(&mut self, identity: &str, images: &[PathBuf]) -> Result<usize, Box<dyn std::error::Error>> {
        let mut frames = Vec::with_capacity(images.len());
        for (i, path) in images.iter().enumerate() {
            match load_image(path, i) {
                Ok(frame) => frames.push(frame),
                Err(e) => log::warn!("Skipping enrollment image: {e}"),
            }
        }
        self.enroll_frames(identity, &frames)
    }

    /// Enroll from already-decoded frames.
    pub fn enroll_frames(&mut self, identity: &str, frames: &[Frame]) -> Result<usize, Box<dyn std::error::Error>> {
        self.analyzer.set_score_threshold(self.enroll_threshold);
        let embeddings = self.collect_embeddings(frames);
        self.analyzer.set_score_threshold(self.recognize_threshold);

        if embeddings.is_empty() {
            log::warn!("No usable face found for {identity}");
            return Ok(0);
        }

        // Persist first so memory never gets ahead of the store.
        let (added, total) = self.state.with_gallery_mut(
            |gallery| -> Result<(usize, usize), Box<dyn std::error::Error>> {
                let mut updated = gallery.clone();
                let added = updated.extend(identity, embeddings)?;
                self.store.save(&updated)?;
                let total = updated.get(identity).map_or(0, |e| e.embeddings().len());
                *gallery = updated;
                Ok((added, total))
            },
        )??;

        log::info!("Enrolled {identity}: {added} added, {total} total");
        Ok(added)
    }

    /// One embedding per usable frame. A frame the detector fails on is
    /// logged and skipped.
    fn collect_embeddings(&mut self, frames: &[Frame]) -> Vec<Embedding> {
        let mut embeddings = Vec::new();
        for frame in frames {
            match self.embed_largest_face(frame) {
                Ok(Some(e)) => embeddings.push(e),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping enrollment frame {}: {e}", frame.index()),
            }
        }
        embeddings
    }

    fn embed_largest_face(&mut self, frame: &Frame) -> Result<Option<Embedding>, Box<dyn std::error::Error>> {
        let detections = self.analyzer.detect(frame)?;
        let largest = detections
            .into_iter()
            .reduce(|best, d| if d.bbox.area() > best.bbox.area() { d } else { best });

        match largest {
            Some(detection) => Ok(self
                .analyzer
                .embed_detection(frame, detection)
                .map(|record| record.embedding)),
            None => {
                log::info!("frame {}: no face detected, embedding whole image", frame.index());
                Ok(self.analyzer.embed_image(frame))
            }
        }
    }
}
