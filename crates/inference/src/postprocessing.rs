use crate::preprocessing::TransformParams;
use common::span_debug;
use std::cmp::Ordering;

/// One detected object in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Decode YOLOv8 output into detections sorted by descending confidence.
    ///
    /// `predictions` is `[1, 4 + num_classes, num_anchors]`; the first four
    /// rows hold `cx, cy, w, h` in input pixels, the rest per-class scores.
    #[tracing::instrument(skip_all)]
    pub fn parse_detections(
        &self,
        predictions: &ndarray::ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<RawDetection>> {
        let shape = predictions.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            anyhow::bail!(
                "unexpected prediction shape {:?}, expected [1, 4 + classes, anchors]",
                shape
            );
        }

        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];

        let mut candidates = Vec::new();

        for a in 0..num_anchors {
            let mut best_score = f32::NEG_INFINITY;
            let mut class_idx = 0usize;
            for c in 0..num_classes {
                let score = predictions[[0, 4 + c, a]];
                if score > best_score {
                    best_score = score;
                    class_idx = c;
                }
            }

            if best_score < self.confidence_threshold {
                continue;
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(
                predictions[[0, 0, a]],
                predictions[[0, 1, a]],
                predictions[[0, 2, a]],
                predictions[[0, 3, a]],
            );

            let (x1, y1) = transform.to_source(x1, y1);
            let (x2, y2) = transform.to_source(x2, y2);

            candidates.push(RawDetection {
                x1,
                y1,
                x2,
                y2,
                confidence: best_score,
                class_id: class_idx as u32,
            });
        }

        let detections =
            non_maximum_suppression(candidates, self.iou_threshold, self.max_detections);

        tracing::trace!(count = detections.len(), "Decoded detections");

        Ok(detections)
    }
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}

fn iou(a: &RawDetection, b: &RawDetection) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;

    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union = area_a + area_b - inter;

    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Greedy class-aware NMS. Boxes of different classes never suppress each
/// other.
fn non_maximum_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    let _s = span_debug!("non_maximum_suppression");
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    /// Helper to create a default PostProcessor for tests
    fn test_postprocessor() -> PostProcessor {
        PostProcessor::new(0.25, 0.7, 300)
    }

    /// Identity transform for a 640x640 source image
    fn identity_transform() -> TransformParams {
        TransformParams {
            orig_width: 640,
            orig_height: 640,
            input_width: 640,
            input_height: 640,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Helper to create YOLOv8 format test data
    /// Creates predictions [1, 4 + num_classes, n] from (cxcywh, class, score) anchors;
    /// every other class score is 0.0
    fn create_yolo_test_data(
        anchors: &[([f32; 4], usize, f32)],
        num_classes: usize,
    ) -> Array<f32, IxDyn> {
        let n = anchors.len();
        let rows = 4 + num_classes;
        let mut data = vec![0.0f32; rows * n];

        for (a, (bbox, class_idx, score)) in anchors.iter().enumerate() {
            for (r, v) in bbox.iter().enumerate() {
                data[r * n + a] = *v;
            }
            data[(4 + class_idx) * n + a] = *score;
        }

        Array::from_shape_vec(IxDyn(&[1, rows, n]), data).unwrap()
    }

    #[test]
    fn test_cxcywh_to_xyxy() {
        let (x1, y1, x2, y2) = cxcywh_to_xyxy(100.0, 50.0, 40.0, 20.0);
        assert_eq!((x1, y1, x2, y2), (80.0, 40.0, 120.0, 60.0));
    }

    #[test]
    fn test_iou() {
        let a = RawDetection {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
            confidence: 0.9,
            class_id: 0,
        };
        let b = RawDetection {
            x1: 5.0,
            x2: 15.0,
            ..a
        };
        let far = RawDetection {
            x1: 100.0,
            x2: 110.0,
            ..a
        };

        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(iou(&a, &far), 0.0);
    }

    #[test]
    fn test_confidence_threshold_filtering() {
        let predictions = create_yolo_test_data(
            &[
                ([100.0, 100.0, 20.0, 20.0], 0, 0.1),
                ([300.0, 300.0, 20.0, 20.0], 1, 0.25),
                ([500.0, 500.0, 20.0, 20.0], 2, 0.8),
            ],
            3,
        );

        let detections = test_postprocessor()
            .parse_detections(&predictions.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 2, "Score below threshold should be dropped");
        assert_eq!(detections[0].class_id, 2);
        assert_eq!(detections[1].class_id, 1);
    }

    #[test]
    fn test_argmax_picks_best_class() {
        let mut predictions = create_yolo_test_data(&[([50.0, 50.0, 10.0, 10.0], 3, 0.6)], 5);
        predictions[[0, 4 + 1, 0]] = 0.4;

        let detections = test_postprocessor()
            .parse_detections(&predictions.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 3);
        assert!((detections[0].confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_boxes_mapped_to_source_coordinates() {
        // 1280x640 source letterboxed into 640x640: scale 0.5, 160px vertical padding
        let transform = TransformParams {
            orig_width: 1280,
            orig_height: 640,
            input_width: 640,
            input_height: 640,
            scale: 0.5,
            offset_x: 0.0,
            offset_y: 160.0,
        };
        let predictions = create_yolo_test_data(&[([320.0, 320.0, 100.0, 50.0], 0, 0.9)], 1);

        let detections = test_postprocessor()
            .parse_detections(&predictions.view(), &transform)
            .unwrap();

        let d = detections[0];
        assert!((d.x1 - 540.0).abs() < 1e-3);
        assert!((d.y1 - 270.0).abs() < 1e-3);
        assert!((d.x2 - 740.0).abs() < 1e-3);
        assert!((d.y2 - 370.0).abs() < 1e-3);
    }

    #[test]
    fn test_boxes_clipped_to_image() {
        let predictions = create_yolo_test_data(&[([5.0, 635.0, 40.0, 40.0], 0, 0.9)], 1);

        let detections = test_postprocessor()
            .parse_detections(&predictions.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections[0].x1, 0.0);
        assert_eq!(detections[0].y2, 640.0);
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let predictions = create_yolo_test_data(
            &[
                ([100.0, 100.0, 50.0, 50.0], 0, 0.7),
                ([102.0, 101.0, 50.0, 50.0], 0, 0.9),
                ([101.0, 100.0, 50.0, 50.0], 1, 0.8),
            ],
            2,
        );

        let detections = test_postprocessor()
            .parse_detections(&predictions.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 2, "Same-class overlap should be suppressed");
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(detections[0].class_id, 0);
        assert_eq!(detections[1].class_id, 1, "Other class survives NMS");
    }

    #[test]
    fn test_max_detections_cap() {
        let anchors: Vec<_> = (0..10)
            .map(|i| ([i as f32 * 60.0 + 20.0, 20.0, 10.0, 10.0], 0, 0.5))
            .collect();
        let predictions = create_yolo_test_data(&anchors, 1);

        let detections = PostProcessor::new(0.25, 0.7, 4)
            .parse_detections(&predictions.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 4);
    }

    #[test]
    fn test_empty_output_yields_no_detections() {
        let predictions = create_yolo_test_data(&[], 80);

        let detections = test_postprocessor()
            .parse_detections(&predictions.view(), &identity_transform())
            .unwrap();

        assert!(detections.is_empty());
    }

    #[test]
    fn test_rejects_unexpected_shape() {
        let predictions = Array::from_shape_vec(IxDyn(&[1, 4, 2]), vec![0.0f32; 8]).unwrap();

        let result = test_postprocessor().parse_detections(&predictions.view(), &identity_transform());

        assert!(result.is_err());
    }
}
