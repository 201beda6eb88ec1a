/// Weights loaded when no model path is configured.
pub const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";

/// YOLOv8 exports use a square 640 input.
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl ExecutionProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionProvider::Cpu => "cpu",
            ExecutionProvider::Cuda => "cuda",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub model_path: String,
    pub input_size: (u32, u32),
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub intra_threads: usize,
    pub execution_provider: ExecutionProvider,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: DEFAULT_MODEL_PATH.to_string(),
            input_size: DEFAULT_INPUT_SIZE,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            intra_threads: 4,
            execution_provider: ExecutionProvider::Cpu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_yolov8_export() {
        let config = DetectorConfig::default();
        assert_eq!(config.model_path, "yolov8n.onnx");
        assert_eq!(config.input_size, (640, 640));
        assert_eq!(config.max_detections, 300);
        assert_eq!(config.execution_provider.as_str(), "cpu");
    }
}
