use crate::labels::Labels;
use ndarray::{Array, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

pub trait InferenceBackend: Send {
    /// Run inference on a preprocessed `[1, 3, H, W]` batch.
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;

    /// Class names embedded in the model file, if it carries any.
    fn class_names(&self) -> Option<Labels> {
        None
    }
}

pub struct InferenceOutput {
    pub predictions: ndarray::ArrayD<f32>, // [1, 4 + num_classes, num_anchors] cxcywh in input pixels
}
