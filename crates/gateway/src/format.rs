use inference::{ImageResult, Labels, RawDetection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// One detected object as returned by `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub class_name: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    fn from_raw(raw: &RawDetection, labels: &Labels) -> Self {
        Self {
            class_id: raw.class_id,
            class_name: labels.name_or_placeholder(raw.class_id),
            confidence: round_to(f64::from(raw.confidence).clamp(0.0, 1.0), 3),
            bbox: BoundingBox {
                x1: round_to(f64::from(raw.x1), 2),
                y1: round_to(f64::from(raw.y1), 2),
                x2: round_to(f64::from(raw.x2), 2),
                y2: round_to(f64::from(raw.y2), 2),
            },
        }
    }
}

/// Flatten detector results into the response list, keeping detector order.
///
/// Results without a boxes field are skipped; an empty list is a valid answer.
pub fn format_detections(results: &[ImageResult], labels: &Labels) -> Vec<Detection> {
    results
        .iter()
        .filter_map(|result| result.boxes.as_deref())
        .flatten()
        .map(|raw| Detection::from_raw(raw, labels))
        .collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
