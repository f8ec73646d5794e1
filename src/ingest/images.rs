//! Still-image directory source.
//!
//! Walks the image files of one directory (no recursion) in file-name order
//! and decodes each into a frame. Handy for replaying a downloaded dataset
//! split through the monitor.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::SourceStats;
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    frame_count: u64,
    last_error: Option<String>,
}

impl ImageDirSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(anyhow!("{} is not a directory", dir.display()));
        }
        Ok(Self {
            dir,
            files: Vec::new(),
            cursor: 0,
            frame_count: 0,
            last_error: None,
        })
    }

    /// List the directory. Fails when it holds no images.
    pub fn connect(&mut self) -> Result<()> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("read image directory {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(anyhow!("no images found in {}", self.dir.display()));
        }
        log::info!(
            "ImageDirSource: {} images in {}",
            files.len(),
            self.dir.display()
        );
        self.files = files;
        self.cursor = 0;
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        let image = image::open(path)
            .with_context(|| format!("decode {}", path.display()))
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                err
            })?
            .to_rgb8();
        self.frame_count += 1;
        log::debug!("ImageDirSource: frame {} <- {}", self.frame_count, path.display());
        Ok(Some(Frame::new(self.frame_count, image)))
    }

    pub fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.dir.display().to_string(),
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn yields_images_in_name_order_then_ends() -> Result<()> {
        let dir = tempfile::tempdir()?;
        RgbImage::new(4, 2).save(dir.path().join("b.png"))?;
        RgbImage::new(6, 3).save(dir.path().join("a.png"))?;
        std::fs::write(dir.path().join("labels.txt"), "ignored")?;

        let mut source = ImageDirSource::new(dir.path())?;
        source.connect()?;

        let first = source.next_frame()?.ok_or_else(|| anyhow!("missing frame"))?;
        assert_eq!(first.width(), 6);
        let second = source.next_frame()?.ok_or_else(|| anyhow!("missing frame"))?;
        assert_eq!(second.width(), 4);
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn empty_directory_fails_to_connect() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut source = ImageDirSource::new(dir.path())?;
        assert!(source.connect().is_err());
        Ok(())
    }
}
