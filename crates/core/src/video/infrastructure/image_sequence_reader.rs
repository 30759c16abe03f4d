use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_reader::{FrameReadError, FrameReader};

/// Treats an ordered list of still images as consecutive video frames.
///
/// Images are decoded lazily, one per `next()`, and converted to RGB.
pub struct ImageSequenceReader {
    paths: Vec<PathBuf>,
}

impl ImageSequenceReader {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Expand directories into their image files (sorted by name) and keep
    /// plain file arguments in the order given.
    pub fn from_inputs(inputs: &[PathBuf]) -> Result<Self, FrameReadError> {
        let mut paths = Vec::new();
        for input in inputs {
            if input.is_dir() {
                paths.extend(list_images(input)?);
            } else {
                paths.push(input.clone());
            }
        }
        Ok(Self::new(paths))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameReader for ImageSequenceReader {
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, FrameReadError>> + Send + '_> {
        Box::new(
            self.paths
                .iter()
                .enumerate()
                .map(|(index, path)| load_image(path, index)),
        )
    }
}

/// Decode one image file into an RGB frame.
pub fn load_image(path: &Path, index: usize) -> Result<Frame, FrameReadError> {
    let image = image::open(path).map_err(|source| FrameReadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Frame::from_rgb_image(image.to_rgb8(), index))
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, FrameReadError> {
    let list_err = |source| FrameReadError::List {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_err)? {
        let path = entry.map_err(list_err)?.path();
        if path.is_file() && has_image_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_image(dir: &Path, name: &str, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        let mut img = image::RgbImage::new(20, 10);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb(rgb);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_frames_are_indexed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_image(dir.path(), "a.png", [10, 20, 30]);
        let b = write_image(dir.path(), "b.png", [40, 50, 60]);

        let mut reader = ImageSequenceReader::new(vec![b, a]);
        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].index(), 0);
        assert_eq!(frames[0].data()[0], 40);
        assert_eq!(frames[1].index(), 1);
        assert_eq!((frames[1].width(), frames[1].height()), (20, 10));
    }

    #[test]
    fn test_unreadable_file_yields_error_without_shifting_indices() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_image(dir.path(), "good.png", [1, 2, 3]);
        let bad = dir.path().join("missing.png");

        let mut reader = ImageSequenceReader::new(vec![bad, good]);
        let frames: Vec<_> = reader.frames().collect();

        assert!(matches!(frames[0], Err(FrameReadError::Decode { .. })));
        assert_eq!(frames[1].as_ref().unwrap().index(), 1);
    }

    #[test]
    fn test_directories_expand_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "02.png", [0, 0, 0]);
        write_image(dir.path(), "01.PNG", [0, 0, 0]);
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let reader = ImageSequenceReader::from_inputs(&[dir.path().to_path_buf()]).unwrap();

        let names: Vec<_> = reader
            .paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["01.PNG", "02.png"]);
    }

    #[test]
    fn test_grayscale_is_converted_to_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(4, 4, image::Luma([77])).save(&path).unwrap();

        let frame = load_image(&path, 3).unwrap();

        assert_eq!(frame.channels(), 3);
        assert_eq!(&frame.data()[..3], &[77, 77, 77]);
        assert_eq!(frame.index(), 3);
    }
}
