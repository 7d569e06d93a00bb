use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Result of running the detector on one frame.
///
/// Detections are produced fresh per frame and never retained past it.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    /// All candidates above the backend's own confidence floor, in model order.
    pub detections: Vec<Detection>,
    /// Wall time spent inside the backend, when it reports one.
    pub inference_ms: Option<u64>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            inference_ms: None,
        }
    }

    pub fn count(&self, class: ObjectClass) -> usize {
        self.detections.iter().filter(|d| d.class == class).count()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: ObjectClass,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl Detection {
    pub fn new(class: ObjectClass, bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            class,
            bbox,
            confidence,
        }
    }

    pub fn person(bbox: BoundingBox, confidence: f32) -> Self {
        Self::new(ObjectClass::Person, bbox, confidence)
    }

    pub fn head(bbox: BoundingBox, confidence: f32) -> Self {
        Self::new(ObjectClass::Head, bbox, confidence)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectClass {
    Person,
    Head,
    /// Any other label a model may emit. Ignored by the pipeline.
    Unknown,
}

impl ObjectClass {
    /// Map a model label (case-insensitive) to a class.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "person" => ObjectClass::Person,
            "head" => ObjectClass::Head,
            _ => ObjectClass::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectClass::Person => "person",
            ObjectClass::Head => "head",
            ObjectClass::Unknown => "unknown",
        }
    }
}

impl From<String> for ObjectClass {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<ObjectClass> for String {
    fn from(class: ObjectClass) -> Self {
        class.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_case_insensitive() {
        assert_eq!(ObjectClass::from_label("Person"), ObjectClass::Person);
        assert_eq!(ObjectClass::from_label(" HEAD "), ObjectClass::Head);
        assert_eq!(ObjectClass::from_label("laptop"), ObjectClass::Unknown);
    }

    #[test]
    fn unknown_labels_deserialize_as_unknown() {
        let det: Detection = serde_json::from_str(
            r#"{"class":"chair","box":{"centerX":1,"centerY":1,"width":2,"height":2},"confidence":0.9}"#,
        )
        .unwrap();
        assert_eq!(det.class, ObjectClass::Unknown);
    }
}
