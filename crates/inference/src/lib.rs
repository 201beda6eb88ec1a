pub mod backend;
pub mod config;
pub mod detector;
pub mod labels;
pub mod loader;
pub mod postprocessing;
pub mod preprocessing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{DetectorConfig, ExecutionProvider};
pub use detector::{Detector, ImageResult, YoloDetector};
pub use labels::Labels;
pub use loader::{DetectorHandle, LoadError, ModelLoader, ModelState};
pub use postprocessing::RawDetection;

#[cfg(feature = "ort-backend")]
pub use detector::load_yolo_detector;
