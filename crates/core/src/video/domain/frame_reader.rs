use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum FrameReadError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to list {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Yields decoded RGB frames in presentation order.
///
/// Frame indices start at 0 and increase by one per yielded item, errors
/// included, so a failed decode does not shift later indices.
pub trait FrameReader: Send {
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, FrameReadError>> + Send + '_>;
}
