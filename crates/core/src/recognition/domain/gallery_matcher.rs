//! Nearest-embedding identity lookup.
//!
//! Every enrolled embedding is scored on its own; embeddings of one
//! identity are never pooled, so an identity with more enrolled samples
//! has more chances to produce the top match.

use crate::recognition::domain::embedding::Embedding;
use crate::recognition::domain::gallery::Gallery;
use crate::shared::constants::UNKNOWN_LABEL;

/// Similarity reported when there is nothing to compare against.
pub const NO_MATCH_SIMILARITY: f32 = -1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Candidate<'g> {
    pub identity: &'g str,
    pub similarity: f32,
}

/// Decision for one query embedding.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchOutcome {
    /// Best identity, or `UNKNOWN_LABEL` below threshold.
    pub label: String,
    /// Similarity of the best candidate, even when it was rejected.
    pub similarity: f32,
    /// Best `top_k` candidates, for diagnostics.
    pub top: Vec<(String, f32)>,
}

#[derive(Clone, Debug)]
pub struct GalleryMatcher {
    similarity_threshold: f32,
    top_k: usize,
}

impl GalleryMatcher {
    pub fn new(similarity_threshold: f32, top_k: usize) -> Self {
        Self {
            similarity_threshold,
            top_k,
        }
    }

    /// All enrolled embeddings, best first. Equal similarities keep gallery
    /// order.
    pub fn rank<'g>(&self, query: &Embedding, gallery: &'g Gallery) -> Vec<Candidate<'g>> {
        let mut ranked: Vec<Candidate<'g>> = gallery
            .entries()
            .iter()
            .flat_map(|entry| {
                entry.embeddings().iter().map(move |e| Candidate {
                    identity: entry.identity(),
                    similarity: query.similarity(e),
                })
            })
            .collect();
        ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        ranked
    }

    pub fn best_match(&self, query: &Embedding, gallery: &Gallery) -> MatchOutcome {
        let ranked = self.rank(query, gallery);
        let top: Vec<(String, f32)> = ranked
            .iter()
            .take(self.top_k)
            .map(|c| (c.identity.to_string(), c.similarity))
            .collect();
        log::debug!("top-{} candidates: {top:?}", self.top_k);

        let Some(best) = ranked.first() else {
            return MatchOutcome {
                label: UNKNOWN_LABEL.to_string(),
                similarity: NO_MATCH_SIMILARITY,
                top,
            };
        };

        let label = if best.similarity < self.similarity_threshold {
            UNKNOWN_LABEL
        } else {
            best.identity
        };
        MatchOutcome {
            label: label.to_string(),
            similarity: best.similarity,
            top,
        }
    }
}
