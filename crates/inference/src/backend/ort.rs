use super::{InferenceBackend, InferenceOutput};
use crate::config::{DetectorConfig, ExecutionProvider};
use crate::labels::Labels;
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

/// Input tensor name of Ultralytics ONNX exports.
const INPUT_NAME: &str = "images";

pub struct OrtBackend {
    session: Session,
}

impl OrtBackend {
    /// Load model with the execution provider and thread count from `config`.
    pub fn load_with_config(config: &DetectorConfig) -> anyhow::Result<Self> {
        let path = &config.model_path;
        if !std::path::Path::new(path).exists() {
            anyhow::bail!("model file not found: {}", path);
        }

        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        #[allow(unused_mut)]
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?;

        match config.execution_provider {
            #[cfg(feature = "cuda")]
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            #[cfg(not(feature = "cuda"))]
            ExecutionProvider::Cuda => {
                anyhow::bail!("CUDA execution provider requested but the `cuda` feature is disabled");
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(path)?;

        tracing::info!(
            model_path = %path,
            provider = config.execution_provider.as_str(),
            "ONNX session created"
        );
        Ok(Self { session })
    }
}

impl InferenceBackend for OrtBackend {
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        let outputs = self.session.run(ort::inputs![
            INPUT_NAME => TensorRef::from_array_view(images.view())?
        ])?;

        let predictions = outputs[0].try_extract_array::<f32>()?;

        Ok(InferenceOutput {
            predictions: predictions.into_owned(),
        })
    }

    fn class_names(&self) -> Option<Labels> {
        let metadata = self.session.metadata().ok()?;
        let names = metadata.custom("names").ok()??;
        Labels::from_names_metadata(&names)
    }
}
