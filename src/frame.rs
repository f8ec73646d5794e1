//! Captured frames.
//!
//! A `Frame` owns the RGB pixels of one capture plus its sequence number.
//! Frames are handed to the detector by reference and, after classification,
//! consumed by the renderer. Nothing keeps a frame once the next one arrives.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// One captured RGB frame.
pub struct Frame {
    /// Sequence number assigned by the source, starting at 1.
    pub index: u64,
    image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    /// Build a frame from a packed RGB24 buffer.
    pub fn from_rgb(index: u64, width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("RGB buffer does not match {}x{}", width, height))?;
        Ok(Self { index, image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Hand the pixels over for annotation.
    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
