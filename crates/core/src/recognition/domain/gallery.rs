//! Enrolled identities and their embeddings.
//!
//! Identities keep the order they were first enrolled in and each keeps its
//! embeddings in enrollment order. Matching ties resolve along that order.

use thiserror::Error;

use crate::recognition::domain::embedding::Embedding;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GalleryError {
    #[error("embedding has dimension {actual}, gallery holds dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("identity name must not be empty")]
    EmptyIdentity,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GalleryEntry {
    identity: String,
    embeddings: Vec<Embedding>,
}

impl GalleryEntry {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn get(&self, identity: &str) -> Option<&GalleryEntry> {
        self.entries.iter().find(|e| e.identity == identity)
    }

    pub fn is_empty(&self) -> bool {
        self.total_embeddings() == 0
    }

    pub fn total_embeddings(&self) -> usize {
        self.entries.iter().map(|e| e.embeddings.len()).sum()
    }

    /// Dimension shared by every stored embedding, if any are stored.
    pub fn dimension(&self) -> Option<usize> {
        self.entries
            .iter()
            .flat_map(|e| e.embeddings.first())
            .map(Embedding::dimension)
            .next()
    }

    /// `(identity, embedding count)` in enrollment order.
    pub fn identities(&self) -> Vec<(&str, usize)> {
        self.entries
            .iter()
            .map(|e| (e.identity.as_str(), e.embeddings.len()))
            .collect()
    }

    /// Append one embedding to `identity`, creating it if new.
    pub fn enroll(&mut self, identity: &str, embedding: Embedding) -> Result<(), GalleryError> {
        self.extend(identity, vec![embedding]).map(|_| ())
    }

    /// Append several embeddings at once. Either all are added or none.
    pub fn extend(&mut self, identity: &str, embeddings: Vec<Embedding>) -> Result<usize, GalleryError> {
        if identity.trim().is_empty() {
            return Err(GalleryError::EmptyIdentity);
        }
        if embeddings.is_empty() {
            return Ok(0);
        }
        let mut expected = self.dimension();
        for e in &embeddings {
            match expected {
                Some(d) if d != e.dimension() => {
                    return Err(GalleryError::DimensionMismatch {
                        expected: d,
                        actual: e.dimension(),
                    })
                }
                _ => expected = Some(e.dimension()),
            }
        }

        let added = embeddings.len();
        match self.entries.iter_mut().find(|e| e.identity == identity) {
            Some(entry) => entry.embeddings.extend(embeddings),
            None => self.entries.push(GalleryEntry {
                identity: identity.to_string(),
                embeddings,
            }),
        }
        Ok(added)
    }

    /// Drop `identity` and all its embeddings. Returns whether it existed.
    pub fn remove(&mut self, identity: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.identity != identity);
        self.entries.len() != before
    }
}
