/// Greedy IoU tracker with majority-vote label smoothing.
///
/// Each update walks the live tracks in creation order and lets each one
/// claim the unclaimed detection it overlaps most. Earlier tracks win
/// contested detections; there is no global assignment step. Matched
/// tracks record the detection's label and report the most frequent label
/// of their recent history.
use serde::{Deserialize, Serialize};

use crate::shared::bbox::BBox;
use crate::tracking::domain::label_history::LabelHistory;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Consecutive missed frames after which a track is dropped.
    pub max_misses: u32,
    /// Minimum IoU (exclusive) for a detection to continue a track.
    pub iou_threshold: f64,
    /// Labels remembered per track for voting.
    pub history_len: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_misses: 5,
            iou_threshold: 0.3,
            history_len: 7,
        }
    }
}

/// One face in the current frame, as proposed by recognition.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub bbox: BBox,
    pub label: String,
}

/// Track assigned to the observation at the same index.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackAssignment {
    pub track_id: u64,
    pub stable_label: String,
}

#[derive(Clone, Debug)]
pub struct Track {
    id: u64,
    bbox: BBox,
    misses: u32,
    history: LabelHistory,
    stable_label: String,
}

impl Track {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    pub fn history(&self) -> &LabelHistory {
        &self.history
    }

    pub fn stable_label(&self) -> &str {
        &self.stable_label
    }

    fn observe(&mut self, obs: &Observation) {
        self.bbox = obs.bbox;
        self.misses = 0;
        self.history.push(obs.label.clone());
        if let Some(label) = self.history.majority() {
            self.stable_label = label.to_string();
        }
    }
}

pub struct IdentityTracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: u64,
}

impl IdentityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_id: 0,
        }
    }

    /// Live tracks in creation order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Advance by one frame. Returns one assignment per observation, in
    /// input order.
    pub fn update(&mut self, observations: &[Observation]) -> Vec<TrackAssignment> {
        let mut assigned: Vec<Option<usize>> = vec![None; observations.len()];
        let existing = self.tracks.len();

        self.associate(observations, &mut assigned);
        self.age_unmatched(existing, &assigned);
        self.spawn_unmatched(observations, &mut assigned);

        let result: Vec<TrackAssignment> = assigned
            .iter()
            .filter_map(|slot| slot.map(|ti| &self.tracks[ti]))
            .map(|t| TrackAssignment {
                track_id: t.id,
                stable_label: t.stable_label.clone(),
            })
            .collect();
        debug_assert_eq!(result.len(), observations.len(), "every observation gets a track");

        let max_misses = self.config.max_misses;
        self.tracks.retain(|t| t.misses < max_misses);
        self.debug_check_invariants();

        result
    }

    /// Each pre-existing track, in order, claims its best unclaimed match.
    fn associate(&mut self, observations: &[Observation], assigned: &mut [Option<usize>]) {
        for (ti, track) in self.tracks.iter_mut().enumerate() {
            let mut best: Option<(usize, f64)> = None;
            for (di, obs) in observations.iter().enumerate() {
                if assigned[di].is_some() {
                    continue;
                }
                let iou = track.bbox.iou(&obs.bbox);
                if best.map_or(true, |(_, b)| iou > b) {
                    best = Some((di, iou));
                }
            }
            if let Some((di, iou)) = best {
                if iou > self.config.iou_threshold {
                    track.observe(&observations[di]);
                    assigned[di] = Some(ti);
                }
            }
        }
    }

    fn age_unmatched(&mut self, existing: usize, assigned: &[Option<usize>]) {
        for (ti, track) in self.tracks.iter_mut().enumerate().take(existing) {
            if !assigned.contains(&Some(ti)) {
                track.misses += 1;
            }
        }
    }

    fn spawn_unmatched(&mut self, observations: &[Observation], assigned: &mut [Option<usize>]) {
        for (di, obs) in observations.iter().enumerate() {
            if assigned[di].is_some() {
                continue;
            }
            self.tracks.push(Track {
                id: self.next_id,
                bbox: obs.bbox,
                misses: 0,
                history: LabelHistory::new(self.config.history_len, obs.label.clone()),
                stable_label: obs.label.clone(),
            });
            log::debug!("new track {} ({})", self.next_id, obs.label);
            self.next_id += 1;
            assigned[di] = Some(self.tracks.len() - 1);
        }
    }

    fn debug_check_invariants(&self) {
        debug_assert!(
            self.tracks.windows(2).all(|w| w[0].id < w[1].id),
            "track ids are unique and in creation order"
        );
        debug_assert!(
            self.tracks.iter().all(|t| t.id < self.next_id),
            "track ids are never reused"
        );
    }
}
