/// Landmark-capable face model (YOLO pose head, 5 keypoints).
pub const LANDMARK_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";

/// Box-only face model (BlazeFace short range).
pub const BOX_MODEL_NAME: &str = "blazeface_short_range.onnx";

/// Directory name used under the platform cache/data dir.
pub const APP_DIR_NAME: &str = "Eyeline";

pub const DEFAULT_PROCESS_INTERVAL_MS: u64 = 150;
pub const DEFAULT_DETECT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_MAX_DETECTED_FACES: usize = 5;

pub const DEFAULT_YAW_THRESHOLD: f64 = 40.0;
pub const DEFAULT_PITCH_THRESHOLD: f64 = 35.0;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.1;

/// Approximate display refresh period used by the interval ticker.
pub const DEFAULT_TICK_MS: u64 = 16;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
