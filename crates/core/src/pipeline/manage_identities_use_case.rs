use std::sync::Arc;

use crate::pipeline::recognition_state::RecognitionState;
use crate::recognition::domain::gallery_store::GalleryStore;

/// Listing and removal of enrolled identities.
pub struct ManageIdentitiesUseCase {
    state: Arc<RecognitionState>,
    store: Box<dyn GalleryStore>,
}

impl ManageIdentitiesUseCase {
    pub fn new(state: Arc<RecognitionState>, store: Box<dyn GalleryStore>) -> Self {
        Self { state, store }
    }

    /// `(identity, embedding count)` in enrollment order.
    pub fn list(&self) -> Result<Vec<(String, usize)>, Box<dyn std::error::Error>> {
        let gallery = self.state.gallery_snapshot()?;
        Ok(gallery
            .identities()
            .into_iter()
            .map(|(id, n)| (id.to_string(), n))
            .collect())
    }

    /// Delete `identity` and persist. Returns false when it was not enrolled.
    pub fn remove(&self, identity: &str) -> Result<bool, Box<dyn std::error::Error>> {
        let removed = self.state.with_gallery_mut(
            |gallery| -> Result<bool, Box<dyn std::error::Error>> {
                let mut updated = gallery.clone();
                if !updated.remove(identity) {
                    return Ok(false);
                }
                self.store.save(&updated)?;
                *gallery = updated;
                Ok(true)
            },
        )??;
        if !removed {
            log::warn!("{identity} is not enrolled");
            return Ok(false);
        }
        log::info!("Removed {identity}");
        Ok(true)
    }
}
