use std::cmp::Ordering;

use super::result::RawDetection;

/// Class-aware non-maximum suppression.
///
/// Keeps the highest-confidence box of every overlapping same-class group;
/// boxes of different classes never suppress each other. Output is sorted by
/// descending confidence.
pub fn non_max_suppression(mut xs: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    xs.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<RawDetection> = Vec::with_capacity(xs.len());
    for candidate in xs {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;

    fn det(class_id: usize, confidence: f32, x: f32) -> RawDetection {
        RawDetection {
            class_id,
            confidence,
            bbox: BBox::new(x, 0.0, x + 10.0, 10.0),
        }
    }

    #[test]
    fn suppresses_same_class_overlap() {
        let out = non_max_suppression(vec![det(0, 0.5, 1.0), det(0, 0.9, 0.0)], 0.5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.9);
    }

    #[test]
    fn keeps_overlapping_boxes_of_other_classes() {
        let out = non_max_suppression(vec![det(0, 0.9, 0.0), det(1, 0.8, 0.0)], 0.5);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn keeps_disjoint_boxes() {
        let out = non_max_suppression(vec![det(0, 0.9, 0.0), det(0, 0.8, 50.0)], 0.5);
        assert_eq!(out.len(), 2);
    }
}
