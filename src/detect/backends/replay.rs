use std::path::Path;

use anyhow::{Context, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::labels::LabelMap;
use crate::detect::result::{Detection, RawDetection};
use crate::frame::Frame;

/// Replays scripted detector output, one scripted frame per captured frame.
///
/// The script cycles when it runs out. An empty script yields no detections.
/// Useful for exercising the monitor without a model.
pub struct ReplayBackend {
    frames: Vec<Vec<RawDetection>>,
    labels: LabelMap,
    cursor: usize,
}

impl ReplayBackend {
    pub fn new(frames: Vec<Vec<RawDetection>>, labels: LabelMap) -> Self {
        Self {
            frames,
            labels,
            cursor: 0,
        }
    }

    /// Load a script: a JSON array of frames, each an array of
    /// `{"class_id", "confidence", "bbox": [x1, y1, x2, y2]}`.
    pub fn from_path<P: AsRef<Path>>(path: P, labels: LabelMap) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read replay script {}", path.display()))?;
        let frames: Vec<Vec<RawDetection>> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid replay script {}", path.display()))?;
        log::info!(
            "ReplayBackend: loaded {} scripted frames from {}",
            frames.len(),
            path.display()
        );
        Ok(Self::new(frames, labels))
    }
}

impl DetectorBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        if self.frames.is_empty() {
            return Ok(Vec::new());
        }
        let scripted = self.frames[self.cursor % self.frames.len()].clone();
        self.cursor = self.cursor.wrapping_add(1);
        Ok(self.labels.resolve(scripted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;
    use image::RgbImage;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn blank() -> Frame {
        Frame::new(1, RgbImage::new(8, 8))
    }

    #[test]
    fn replay_backend_cycles_script() -> Result<()> {
        let frames = vec![
            vec![RawDetection {
                class_id: 1,
                confidence: 0.9,
                bbox: BBox::new(0.0, 0.0, 10.0, 20.0),
            }],
            vec![],
        ];
        let mut backend = ReplayBackend::new(frames, LabelMap::default());

        assert_eq!(backend.detect(&blank())?.len(), 1);
        assert!(backend.detect(&blank())?.is_empty());
        let third = backend.detect(&blank())?;
        assert_eq!(third[0].label, "person");
        Ok(())
    }

    #[test]
    fn empty_script_yields_nothing() -> Result<()> {
        let mut backend = ReplayBackend::new(Vec::new(), LabelMap::default());
        assert!(backend.detect(&blank())?.is_empty());
        Ok(())
    }

    #[test]
    fn loads_script_from_json() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(
            br#"[[{"class_id": 0, "confidence": 0.7, "bbox": [20, 10, 40, 30]}]]"#,
        )?;
        let mut backend = ReplayBackend::from_path(file.path(), LabelMap::default())?;
        let dets = backend.detect(&blank())?;
        assert_eq!(dets[0].label, "helmet");
        assert_eq!(dets[0].bbox, BBox::new(20.0, 10.0, 40.0, 30.0));
        Ok(())
    }
}
