pub mod onnx_scrfd_detector;
