use anyhow::Result;
use image::{Rgb, RgbImage};

use super::SourceStats;
use crate::config::SourceSettings;
use crate::frame::Frame;

/// Synthetic frame source (`stub://`).
///
/// Produces a flat background with a slowly drifting gradient band so
/// consecutive frames differ. Never ends.
pub struct SyntheticSource {
    settings: SourceSettings,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(settings: SourceSettings) -> Self {
        Self {
            settings,
            frame_count: 0,
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.settings.uri,
            self.settings.width,
            self.settings.height
        );
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let shift = (self.frame_count % 256) as u32;
        let image = RgbImage::from_fn(self.settings.width, self.settings.height, |x, y| {
            let band = ((x + shift) % 256) as u8;
            Rgb([band / 4 + 40, 64, ((y % 256) as u8) / 4 + 40])
        });
        Ok(Frame::new(self.frame_count, image))
    }

    pub fn is_healthy(&self) -> bool {
        true
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.settings.uri.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_frames_are_numbered_and_change() -> Result<()> {
        let mut source = SyntheticSource::new(SourceSettings {
            uri: "stub://test".to_string(),
            width: 16,
            height: 8,
            target_fps: 10,
        });
        source.connect()?;
        let a = source.next_frame()?;
        let b = source.next_frame()?;
        assert_eq!((a.index, b.index), (1, 2));
        assert_ne!(a.image().as_raw(), b.image().as_raw());
        Ok(())
    }
}
