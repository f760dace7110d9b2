pub mod backend_providers;
pub mod execution_provider;
pub mod math;
pub mod onnx_box_detector;
pub mod onnx_landmark_detector;
pub mod skin_tone_detector;
