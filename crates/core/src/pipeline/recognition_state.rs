//! Process-lifetime state shared by every frame: the enrolled gallery and
//! the identity tracker.
//!
//! The gallery sits behind an `RwLock<Arc<_>>`. Readers take a cheap
//! snapshot and match against it without holding the lock; writers
//! copy-on-write under the exclusive lock. The tracker sits behind a
//! `Mutex`, so at most one update is in flight at a time.

use std::sync::{Arc, Mutex, RwLock};

use thiserror::Error;

use crate::recognition::domain::gallery::Gallery;
use crate::tracking::domain::identity_tracker::{
    IdentityTracker, Observation, TrackAssignment, TrackerConfig,
};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0} lock poisoned by a panicked thread")]
pub struct StatePoisoned(pub &'static str);

pub struct RecognitionState {
    gallery: RwLock<Arc<Gallery>>,
    tracker: Mutex<IdentityTracker>,
}

impl RecognitionState {
    pub fn new(gallery: Gallery, tracker_config: TrackerConfig) -> Self {
        Self {
            gallery: RwLock::new(Arc::new(gallery)),
            tracker: Mutex::new(IdentityTracker::new(tracker_config)),
        }
    }

    /// Immutable view of the gallery as of now. Later enrollments do not
    /// affect it.
    pub fn gallery_snapshot(&self) -> Result<Arc<Gallery>, StatePoisoned> {
        self.gallery
            .read()
            .map(|g| Arc::clone(&g))
            .map_err(|_| StatePoisoned("gallery"))
    }

    /// Run `f` with exclusive access to the gallery.
    pub fn with_gallery_mut<R>(&self, f: impl FnOnce(&mut Gallery) -> R) -> Result<R, StatePoisoned> {
        let mut guard = self.gallery.write().map_err(|_| StatePoisoned("gallery"))?;
        Ok(f(Arc::make_mut(&mut guard)))
    }

    pub fn update_tracker(&self, observations: &[Observation]) -> Result<Vec<TrackAssignment>, StatePoisoned> {
        let mut tracker = self.tracker.lock().map_err(|_| StatePoisoned("tracker"))?;
        Ok(tracker.update(observations))
    }

    pub fn live_tracks(&self) -> Result<usize, StatePoisoned> {
        let tracker = self.tracker.lock().map_err(|_| StatePoisoned("tracker"))?;
        Ok(tracker.tracks().len())
    }
}
