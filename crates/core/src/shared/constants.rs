pub const DETECTION_MODEL_NAME: &str = "det_10g.onnx";
pub const DETECTION_MODEL_URL: &str =
    "https://huggingface.co/public-data/insightface/resolve/main/models/buffalo_l/det_10g.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://huggingface.co/public-data/insightface/resolve/main/models/buffalo_l/w600k_r50.onnx";

/// Label reported when no enrolled identity is similar enough.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Side length of the aligned face chip fed to the recognition model.
pub const CHIP_SIZE: u32 = 112;

/// Longest side of the detector input before padding.
pub const DETECTOR_TARGET_SIZE: u32 = 640;

/// Detector input sides are padded up to a multiple of this.
pub const DETECTOR_PAD_MULTIPLE: u32 = 32;

/// Pixel normalization shared by detector and recognizer: `(x - MEAN) / STD`.
pub const NORM_MEAN: f32 = 127.5;
pub const NORM_STD: f32 = 128.0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
