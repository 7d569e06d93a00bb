//! Per-frame head-to-person association.
//!
//! Every frame is matched on its own; nothing carries over between frames.

use serde::{Deserialize, Serialize};

use crate::detect::{Detection, ObjectClass};
use crate::geometry::iou;

/// A head must overlap its person by strictly more than this to count.
pub const ASSOCIATION_IOU_THRESHOLD: f32 = 0.1;

pub const DEFAULT_DETECTOR_CONFIDENCE: f32 = 0.55;
pub const DEFAULT_PERSON_CONFIDENCE: f32 = 0.40;
pub const DEFAULT_HEAD_CONFIDENCE: f32 = 0.30;

/// One person and the head matched to it, if any.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub person: Detection,
    pub head: Option<Detection>,
    /// Overlap of the matched head, `0.0` when unmatched.
    pub iou: f32,
}

/// Operator-adjustable confidence floors.
///
/// These are live tunables: out-of-range values are clamped into `[0, 1]`
/// rather than rejected. NaN falls back to the default.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceThresholds {
    detector: f32,
    person: f32,
    head: f32,
}

impl ConfidenceThresholds {
    pub fn new(detector: f32, person: f32, head: f32) -> Self {
        let mut thresholds = Self::default();
        thresholds.set_detector(detector);
        thresholds.set_person(person);
        thresholds.set_head(head);
        thresholds
    }

    /// Model-level floor handed to backends that filter internally.
    pub fn detector(&self) -> f32 {
        self.detector
    }

    pub fn person(&self) -> f32 {
        self.person
    }

    pub fn head(&self) -> f32 {
        self.head
    }

    pub fn set_detector(&mut self, value: f32) {
        self.detector = clamp_confidence("detector", value, DEFAULT_DETECTOR_CONFIDENCE);
    }

    pub fn set_person(&mut self, value: f32) {
        self.person = clamp_confidence("person", value, DEFAULT_PERSON_CONFIDENCE);
    }

    pub fn set_head(&mut self, value: f32) {
        self.head = clamp_confidence("head", value, DEFAULT_HEAD_CONFIDENCE);
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            detector: DEFAULT_DETECTOR_CONFIDENCE,
            person: DEFAULT_PERSON_CONFIDENCE,
            head: DEFAULT_HEAD_CONFIDENCE,
        }
    }
}

fn clamp_confidence(name: &str, value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        log::debug!("{} confidence is NaN, using {:.2}", name, fallback);
        return fallback;
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        log::debug!(
            "{} confidence {} clamped to {:.2}",
            name,
            value,
            clamped
        );
    }
    clamped
}

/// Split oracle output into persons and heads above their thresholds.
///
/// Input order is preserved within each class. Other classes are dropped.
pub fn partition_detections(
    detections: &[Detection],
    thresholds: &ConfidenceThresholds,
) -> (Vec<Detection>, Vec<Detection>) {
    let mut persons = Vec::new();
    let mut heads = Vec::new();
    for det in detections {
        match det.class {
            ObjectClass::Person if det.confidence >= thresholds.person() => {
                persons.push(det.clone())
            }
            ObjectClass::Head if det.confidence >= thresholds.head() => heads.push(det.clone()),
            _ => {}
        }
    }
    (persons, heads)
}

/// Greedily match heads to persons.
///
/// Persons are visited in input order; each takes the unclaimed head with the
/// highest IoU if that IoU exceeds [`ASSOCIATION_IOU_THRESHOLD`]. Ties keep the
/// earlier head. This is order-dependent and not a globally optimal
/// assignment. Runs in O(P·H) and leaves the inputs untouched.
pub fn associate(persons: &[Detection], heads: &[Detection]) -> Vec<Association> {
    let mut claimed = vec![false; heads.len()];

    persons
        .iter()
        .map(|person| {
            let best = heads
                .iter()
                .enumerate()
                .filter(|(idx, _)| !claimed[*idx])
                .map(|(idx, head)| (idx, iou(&person.bbox, &head.bbox)))
                .fold(None::<(usize, f32)>, |best, (idx, overlap)| match best {
                    Some((_, best_overlap)) if best_overlap >= overlap => best,
                    _ => Some((idx, overlap)),
                });

            match best {
                Some((idx, overlap)) if overlap > ASSOCIATION_IOU_THRESHOLD => {
                    claimed[idx] = true;
                    Association {
                        person: person.clone(),
                        head: Some(heads[idx].clone()),
                        iou: overlap,
                    }
                }
                _ => Association {
                    person: person.clone(),
                    head: None,
                    iou: 0.0,
                },
            }
        })
        .collect()
}
