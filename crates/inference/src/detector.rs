use crate::{
    backend::{InferenceBackend, InferenceOutput},
    config::DetectorConfig,
    labels::Labels,
    postprocessing::{PostProcessor, RawDetection},
    preprocessing::PreProcessor,
};
use image::DynamicImage;
use std::sync::Mutex;

/// Per-image output of a detector.
///
/// `boxes` is `None` when the detector produced a result object without a
/// populated box set; consumers skip such results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageResult {
    pub boxes: Option<Vec<RawDetection>>,
}

/// A loaded detection model.
///
/// `detect` is synchronous and CPU/accelerator bound; async callers should
/// run it on the blocking pool.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<ImageResult>>;

    fn labels(&self) -> &Labels;
}

/// YOLOv8 pipeline: letterbox, backend inference, decode + NMS.
pub struct YoloDetector<B: InferenceBackend> {
    backend: Mutex<B>,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
    labels: Labels,
}

impl<B: InferenceBackend> YoloDetector<B> {
    /// Wrap `backend`, taking class names from the model when it carries
    /// them and falling back to COCO otherwise.
    pub fn new(backend: B, config: &DetectorConfig) -> Self {
        let labels = match backend.class_names() {
            Some(labels) => labels,
            None => {
                tracing::debug!("Model has no class names, using COCO labels");
                Labels::coco()
            }
        };
        Self::with_labels(backend, config, labels)
    }

    pub fn with_labels(backend: B, config: &DetectorConfig, labels: Labels) -> Self {
        Self {
            backend: Mutex::new(backend),
            preprocessor: PreProcessor::new(config.input_size),
            postprocessor: PostProcessor::new(
                config.confidence_threshold,
                config.iou_threshold,
                config.max_detections,
            ),
            labels,
        }
    }
}

impl<B: InferenceBackend> Detector for YoloDetector<B> {
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<ImageResult>> {
        let span = tracing::info_span!(
            "detect",
            width = image.width(),
            height = image.height()
        );
        let _enter = span.enter();

        let (input, transform) = self.preprocessor.preprocess(image)?;

        let InferenceOutput { predictions } = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            let mut backend = self
                .backend
                .lock()
                .map_err(|_| anyhow::anyhow!("inference backend lock poisoned"))?;
            backend.infer(&input)?
        };

        let boxes = self
            .postprocessor
            .parse_detections(&predictions.view(), &transform)?;

        Ok(vec![ImageResult { boxes: Some(boxes) }])
    }

    fn labels(&self) -> &Labels {
        &self.labels
    }
}

#[cfg(feature = "ort-backend")]
/// Load the ONNX Runtime backed YOLOv8 detector described by `config`.
pub fn load_yolo_detector(
    config: &DetectorConfig,
) -> anyhow::Result<YoloDetector<crate::backend::ort::OrtBackend>> {
    let backend = crate::backend::ort::OrtBackend::load_with_config(config)?;
    Ok(YoloDetector::new(backend, config))
}
