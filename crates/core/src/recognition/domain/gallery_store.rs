use std::path::PathBuf;

use thiserror::Error;

use crate::recognition::domain::gallery::{Gallery, GalleryError};

#[derive(Error, Debug)]
pub enum GalleryStoreError {
    #[error("failed to read gallery {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write gallery {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed gallery {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported gallery version {0}")]
    Version(u32),
    #[error(transparent)]
    Gallery(#[from] GalleryError),
}

/// Persistence for enrolled identities.
pub trait GalleryStore: Send {
    fn load(&self) -> Result<Gallery, GalleryStoreError>;
    fn save(&self, gallery: &Gallery) -> Result<(), GalleryStoreError>;
}
