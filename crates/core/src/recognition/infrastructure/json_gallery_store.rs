//! Gallery persisted as a single JSON document.
//!
//! ```json
//! { "version": 1, "identities": [ { "identity": "alice", "embeddings": [[...], ...] } ] }
//! ```

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::recognition::domain::embedding::Embedding;
use crate::recognition::domain::gallery::Gallery;
use crate::recognition::domain::gallery_store::{GalleryStore, GalleryStoreError};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct GalleryDocument {
    version: u32,
    identities: Vec<IdentityRecord>,
}

#[derive(Serialize, Deserialize)]
struct IdentityRecord {
    identity: String,
    embeddings: Vec<Vec<f32>>,
}

pub struct JsonGalleryStore {
    path: PathBuf,
}

impl JsonGalleryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/Rollcall/gallery.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("Rollcall").join("gallery.json"))
    }

    fn write_err(&self, source: std::io::Error) -> GalleryStoreError {
        GalleryStoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl GalleryStore for JsonGalleryStore {
    fn load(&self) -> Result<Gallery, GalleryStoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No gallery at {}, starting empty", self.path.display());
                return Ok(Gallery::new());
            }
            Err(source) => {
                return Err(GalleryStoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let doc: GalleryDocument =
            serde_json::from_str(&text).map_err(|source| GalleryStoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        if doc.version != FORMAT_VERSION {
            return Err(GalleryStoreError::Version(doc.version));
        }

        let mut gallery = Gallery::new();
        for record in doc.identities {
            let mut embeddings = Vec::with_capacity(record.embeddings.len());
            for raw in record.embeddings {
                match Embedding::normalize(raw) {
                    Ok(e) => embeddings.push(e),
                    Err(e) => log::warn!("Dropping stored embedding of {}: {e}", record.identity),
                }
            }
            gallery.extend(&record.identity, embeddings)?;
        }
        log::debug!(
            "Loaded {} identities ({} embeddings) from {}",
            gallery.entries().len(),
            gallery.total_embeddings(),
            self.path.display()
        );
        Ok(gallery)
    }

    fn save(&self, gallery: &Gallery) -> Result<(), GalleryStoreError> {
        let doc = GalleryDocument {
            version: FORMAT_VERSION,
            identities: gallery
                .entries()
                .iter()
                .map(|entry| IdentityRecord {
                    identity: entry.identity().to_string(),
                    embeddings: entry
                        .embeddings()
                        .iter()
                        .map(|e| e.as_slice().to_vec())
                        .collect(),
                })
                .collect(),
        };
        let json = serde_json::to_vec(&doc).map_err(|source| GalleryStoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_err(e))?;
        }

        // Write beside the target and rename so readers never see a partial file.
        let temp_path = self.path.with_extension("json.tmp");
        let result = fs::File::create(&temp_path)
            .and_then(|mut f| {
                f.write_all(&json)?;
                f.sync_all()
            })
            .and_then(|()| fs::rename(&temp_path, &self.path));
        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(self.write_err(e));
        }
        Ok(())
    }
}
