#[cfg(feature = "ort-backend")]
use crate::config::Config;
use crate::fetch::ImageFetcher;
use crate::logging::SERVICE_NAME;
use crate::metrics::PredictMetrics;
use inference::ModelLoader;

#[derive(Clone)]
pub struct AppState {
    pub loader: ModelLoader,
    pub fetcher: ImageFetcher,
    pub max_image_bytes: usize,
    pub metrics: PredictMetrics,
}

impl AppState {
    pub fn new(loader: ModelLoader, fetcher: ImageFetcher, max_image_bytes: usize) -> Self {
        Self {
            loader,
            fetcher,
            max_image_bytes,
            metrics: PredictMetrics::new(SERVICE_NAME),
        }
    }

    /// State for the real service: a lazily loaded ONNX Runtime detector.
    #[cfg(feature = "ort-backend")]
    pub fn from_config(config: &Config) -> Self {
        let fetcher = ImageFetcher::new(config.fetch_timeout(), config.max_image_bytes);
        Self::new(
            yolo_loader(config.detector_config()),
            fetcher,
            config.max_image_bytes,
        )
    }
}

/// Loader that builds the YOLOv8 detector from `config` on first use.
#[cfg(feature = "ort-backend")]
pub fn yolo_loader(config: inference::DetectorConfig) -> ModelLoader {
    use inference::DetectorHandle;
    use std::sync::Arc;

    ModelLoader::new(config.model_path.clone(), move || {
        let detector = inference::load_yolo_detector(&config)?;
        Ok(Arc::new(detector) as DetectorHandle)
    })
}
