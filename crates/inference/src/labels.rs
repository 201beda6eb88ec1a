use std::collections::HashMap;

const COCO_NAMES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Class id to display name table of a detection model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    names: HashMap<u32, String>,
}

impl Labels {
    pub fn new(names: HashMap<u32, String>) -> Self {
        Self { names }
    }

    /// The 80 COCO classes in YOLOv8 order.
    pub fn coco() -> Self {
        Self::from_iter(COCO_NAMES.iter().map(|name| name.to_string()))
    }

    /// Parse the `names` entry that Ultralytics writes into exported ONNX
    /// metadata, e.g. `{0: 'person', 1: 'bicycle'}`.
    ///
    /// Returns `None` when no entry can be parsed.
    pub fn from_names_metadata(raw: &str) -> Option<Self> {
        let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;

        let mut names = HashMap::new();
        for entry in body.split(',') {
            let Some((id, name)) = entry.split_once(':') else {
                continue;
            };
            let Ok(id) = id.trim().parse::<u32>() else {
                continue;
            };
            let name = name.trim().trim_matches(|c| c == '\'' || c == '"');
            names.insert(id, name.to_string());
        }

        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    pub fn get(&self, class_id: u32) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    /// Name for `class_id`, or `class_{id}` when the table has no entry.
    pub fn name_or_placeholder(&self, class_id: u32) -> String {
        self.get(class_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<String> for Labels {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let names = iter
            .into_iter()
            .enumerate()
            .map(|(id, name)| (id as u32, name))
            .collect();
        Self { names }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_table_has_eighty_classes() {
        let labels = Labels::coco();
        assert_eq!(labels.len(), 80);
        assert_eq!(labels.get(0), Some("person"));
        assert_eq!(labels.get(47), Some("apple"));
        assert_eq!(labels.get(79), Some("toothbrush"));
        assert_eq!(labels.get(80), None);
    }

    #[test]
    fn parses_ultralytics_names_metadata() {
        let labels = Labels::from_names_metadata("{0: 'person', 1: 'bicycle', 2: \"car\"}")
            .expect("metadata should parse");

        assert_eq!(labels.len(), 3);
        assert_eq!(labels.get(0), Some("person"));
        assert_eq!(labels.get(1), Some("bicycle"));
        assert_eq!(labels.get(2), Some("car"));
    }

    #[test]
    fn names_with_spaces_are_kept_intact() {
        let labels = Labels::from_names_metadata("{9: 'traffic light', 10: 'fire hydrant'}")
            .expect("metadata should parse");

        assert_eq!(labels.get(9), Some("traffic light"));
        assert_eq!(labels.get(10), Some("fire hydrant"));
    }

    #[test]
    fn malformed_metadata_is_rejected() {
        assert!(Labels::from_names_metadata("").is_none());
        assert!(Labels::from_names_metadata("[person, car]").is_none());
        assert!(Labels::from_names_metadata("{}").is_none());
        assert!(Labels::from_names_metadata("{a: 'person'}").is_none());
    }

    #[test]
    fn unknown_class_gets_placeholder_name() {
        let labels = Labels::coco();
        assert_eq!(labels.name_or_placeholder(2), "car");
        assert_eq!(labels.name_or_placeholder(412), "class_412");
    }
}
