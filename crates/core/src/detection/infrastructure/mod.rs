pub mod execution_provider;
pub mod model_resolver;
pub mod onnx_blazeface_detector;
pub mod onnx_cascade;
pub mod onnx_face_mesh_detector;
pub mod preprocess;
pub mod roi_tracker;
pub mod shared_box_detector;
