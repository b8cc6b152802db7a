/// MediaPipe Face Mesh landmark network exported to ONNX.
pub const FACE_MESH_MODEL_NAME: &str = "face_landmark.onnx";

/// Face Landmarker's landmark network: 478 points (iris included) in a
/// single output tensor, 256×256 input.
pub const FACE_MESH_REFINED_MODEL_NAME: &str = "face_landmarks_detector.onnx";

/// BlazeFace short-range detector used by the bounding-box fallback tier.
pub const BLAZEFACE_MODEL_NAME: &str = "face_detection_short_range.onnx";

/// The core tracks a single face per stream.
pub const MAX_FACES: u32 = 1;

pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_MIN_TRACKING_CONFIDENCE: f64 = 0.5;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
