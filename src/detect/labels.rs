use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::result::{Detection, RawDetection};

/// Open-vocabulary prompt list, in model class-id order.
pub const DEFAULT_LABELS: [&str; 7] = [
    "helmet",
    "person",
    "safety vest",
    "safety goggles",
    "ear protection",
    "earmuffs",
    "bottle",
];

/// Semantic bucket a label falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Person,
    Helmet,
    Goggles,
    EarProtection,
    Vest,
    Other,
}

impl Category {
    /// Resolve a label, case-insensitively, merging known synonyms.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "person" => Category::Person,
            "helmet" | "hard hat" | "hardhat" => Category::Helmet,
            "goggles" | "safety goggles" => Category::Goggles,
            "ear protection" | "earmuffs" | "ear muffs" => Category::EarProtection,
            "vest" | "safety vest" => Category::Vest,
            _ => Category::Other,
        }
    }

    /// The three categories checked per person.
    pub fn is_monitored_ppe(self) -> bool {
        matches!(
            self,
            Category::Helmet | Category::Goggles | Category::EarProtection
        )
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Category::Person => "Person",
            Category::Helmet => "Helmet",
            Category::Goggles => "Goggles",
            Category::EarProtection => "Ear protection",
            Category::Vest => "Vest",
            Category::Other => "Object",
        }
    }
}

/// Class id to label mapping, fixed at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    pub fn new(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(anyhow!("label map must contain at least one label"));
        }
        if labels.iter().any(|l| l.trim().is_empty()) {
            return Err(anyhow!("label map contains an empty label"));
        }
        if !labels
            .iter()
            .any(|l| Category::from_label(l) == Category::Person)
        {
            return Err(anyhow!("label map has no person label"));
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Attach labels to raw detector output. Unknown class ids are dropped.
    pub fn resolve(&self, raw: Vec<RawDetection>) -> Vec<Detection> {
        raw.into_iter()
            .filter_map(|r| match self.label(r.class_id) {
                Some(label) => Some(Detection::new(label, r.confidence, r.bbox)),
                None => {
                    log::debug!("dropping detection with unmapped class id {}", r.class_id);
                    None
                }
            })
            .collect()
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;

    #[test]
    fn ear_protection_synonyms_merge() {
        assert_eq!(
            Category::from_label("ear protection"),
            Category::EarProtection
        );
        assert_eq!(Category::from_label("Earmuffs "), Category::EarProtection);
        assert_eq!(Category::from_label("safety goggles"), Category::Goggles);
        assert_eq!(Category::from_label("bottle"), Category::Other);
        assert!(!Category::Vest.is_monitored_ppe());
    }

    #[test]
    fn default_map_follows_prompt_order() {
        let map = LabelMap::default();
        assert_eq!(map.len(), 7);
        assert_eq!(map.label(0), Some("helmet"));
        assert_eq!(map.label(1), Some("person"));
        assert_eq!(map.label(5), Some("earmuffs"));
        assert_eq!(map.label(7), None);
    }

    #[test]
    fn label_map_requires_person() {
        assert!(LabelMap::new(vec!["helmet".into()]).is_err());
        assert!(LabelMap::new(vec![]).is_err());
        assert!(LabelMap::new(vec!["person".into(), " ".into()]).is_err());
    }

    #[test]
    fn resolve_drops_unmapped_ids() {
        let map = LabelMap::default();
        let raw = vec![
            RawDetection {
                class_id: 1,
                confidence: 0.9,
                bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            },
            RawDetection {
                class_id: 42,
                confidence: 0.9,
                bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            },
        ];
        let resolved = map.resolve(raw);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].label, "person");
    }
}
