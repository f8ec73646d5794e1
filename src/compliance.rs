//! Per-person PPE compliance over a single frame's detections.
//!
//! Detections are bucketed by category, then every person is checked for a
//! helmet, goggles and ear protection whose box center falls inside the top
//! band of the person's box. The result is a verdict per person plus frame
//! counts for display. No state survives the call: the same detections always
//! produce the same report, in any order.

use serde::{Deserialize, Serialize};

use crate::detect::{BBox, Category, Detection};

/// Share of the person's height treated as the head region.
pub const DEFAULT_HEAD_FRACTION: f32 = 0.4;

/// Three-level compliance verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// All three monitored PPE categories present.
    Safe,
    /// One or two present.
    Partial,
    /// None present.
    Unsafe,
}

impl Verdict {
    pub fn from_present_count(count: usize) -> Self {
        match count {
            0 => Verdict::Unsafe,
            1 | 2 => Verdict::Partial,
            _ => Verdict::Safe,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Partial => "PARTIAL",
            Verdict::Unsafe => "UNSAFE",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which monitored PPE categories were found near a person's head.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpePresence {
    pub helmet: bool,
    pub goggles: bool,
    pub ear_protection: bool,
}

impl PpePresence {
    pub fn count(&self) -> usize {
        [self.helmet, self.goggles, self.ear_protection]
            .iter()
            .filter(|&&p| p)
            .count()
    }

    /// (category, present) in display order.
    pub fn items(&self) -> [(Category, bool); 3] {
        [
            (Category::Helmet, self.helmet),
            (Category::Goggles, self.goggles),
            (Category::EarProtection, self.ear_protection),
        ]
    }
}

/// Compliance result for one detected person.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonReport {
    pub bbox: BBox,
    pub confidence: f32,
    pub ppe: PpePresence,
    pub verdict: Verdict,
}

/// Per-category detection counts for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCounts {
    pub persons: usize,
    pub helmets: usize,
    pub goggles: usize,
    pub ear_protection: usize,
    pub vests: usize,
    pub other: usize,
}

impl FrameCounts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Person => self.persons,
            Category::Helmet => self.helmets,
            Category::Goggles => self.goggles,
            Category::EarProtection => self.ear_protection,
            Category::Vest => self.vests,
            Category::Other => self.other,
        }
    }
}

/// Everything derived from one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub people: Vec<PersonReport>,
    pub counts: FrameCounts,
}

impl FrameReport {
    /// Number of people per verdict: (safe, partial, unsafe).
    pub fn tally(&self) -> (usize, usize, usize) {
        self.people
            .iter()
            .fold((0, 0, 0), |(s, p, u), person| match person.verdict {
                Verdict::Safe => (s + 1, p, u),
                Verdict::Partial => (s, p + 1, u),
                Verdict::Unsafe => (s, p, u + 1),
            })
    }
}

/// Detections of one frame bucketed by category.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub persons: Vec<&'a Detection>,
    pub helmets: Vec<&'a Detection>,
    pub goggles: Vec<&'a Detection>,
    pub ear_protection: Vec<&'a Detection>,
    pub vests: Vec<&'a Detection>,
    pub other: Vec<&'a Detection>,
}

impl<'a> Partition<'a> {
    /// Bucket detections; boxes that are not well formed are dropped.
    pub fn from_detections(detections: &'a [Detection]) -> Self {
        let mut partition = Partition::default();
        for det in detections {
            if !det.bbox.is_well_formed() {
                log::debug!("ignoring malformed {} box {:?}", det.label, det.bbox);
                continue;
            }
            let bucket = match Category::from_label(&det.label) {
                Category::Person => &mut partition.persons,
                Category::Helmet => &mut partition.helmets,
                Category::Goggles => &mut partition.goggles,
                Category::EarProtection => &mut partition.ear_protection,
                Category::Vest => &mut partition.vests,
                Category::Other => &mut partition.other,
            };
            bucket.push(det);
        }
        partition
    }

    pub fn counts(&self) -> FrameCounts {
        FrameCounts {
            persons: self.persons.len(),
            helmets: self.helmets.len(),
            goggles: self.goggles.len(),
            ear_protection: self.ear_protection.len(),
            vests: self.vests.len(),
            other: self.other.len(),
        }
    }
}

/// True when any item's box center lies in the person's head region.
pub fn ppe_near_head(person: &BBox, items: &[&Detection], head_fraction: f32) -> bool {
    let head = person.head_region(head_fraction);
    items.iter().any(|item| {
        let (cx, cy) = item.bbox.center();
        head.contains_point(cx, cy)
    })
}

/// Stateless per-frame compliance classifier.
#[derive(Clone, Copy, Debug)]
pub struct ComplianceClassifier {
    head_fraction: f32,
}

impl ComplianceClassifier {
    pub fn new(head_fraction: f32) -> Self {
        Self { head_fraction }
    }

    pub fn head_fraction(&self) -> f32 {
        self.head_fraction
    }

    pub fn classify(&self, detections: &[Detection]) -> FrameReport {
        let partition = Partition::from_detections(detections);

        let people = partition
            .persons
            .iter()
            .map(|person| {
                let ppe = PpePresence {
                    helmet: ppe_near_head(&person.bbox, &partition.helmets, self.head_fraction),
                    goggles: ppe_near_head(&person.bbox, &partition.goggles, self.head_fraction),
                    ear_protection: ppe_near_head(
                        &person.bbox,
                        &partition.ear_protection,
                        self.head_fraction,
                    ),
                };
                PersonReport {
                    bbox: person.bbox,
                    confidence: person.confidence,
                    ppe,
                    verdict: Verdict::from_present_count(ppe.count()),
                }
            })
            .collect();

        FrameReport {
            people,
            counts: partition.counts(),
        }
    }
}

impl Default for ComplianceClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_HEAD_FRACTION)
    }
}
