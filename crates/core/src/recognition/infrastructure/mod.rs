pub mod json_gallery_store;
pub mod onnx_arcface_embedder;
