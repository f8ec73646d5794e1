//! Frame capture sources.
//!
//! - Synthetic frames (`stub://...`) for tests and dry runs
//! - Directories of still images
//! - USB/V4L2 webcams (feature: ingest-v4l2)
//!
//! Every source yields `Frame`s one at a time on the caller's thread.
//! `next_frame` returns `Ok(None)` once a finite source is exhausted.

pub mod images;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::SourceSettings;
use crate::frame::Frame;

pub use images::ImageDirSource;
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

/// Statistics for a capture source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Capture source selected from a URI.
pub struct CaptureSource {
    backend: CaptureBackend,
}

enum CaptureBackend {
    Synthetic(SyntheticSource),
    Images(ImageDirSource),
    #[cfg(feature = "ingest-v4l2")]
    V4l2(V4l2Source),
}

impl CaptureSource {
    pub fn open(settings: &SourceSettings) -> Result<Self> {
        let uri = settings.uri.trim();
        let backend = if uri.starts_with("stub://") {
            CaptureBackend::Synthetic(SyntheticSource::new(settings.clone()))
        } else if Path::new(uri).is_dir() {
            CaptureBackend::Images(ImageDirSource::new(uri)?)
        } else if uri.starts_with("/dev/video") {
            open_v4l2(settings)?
        } else {
            return Err(anyhow!(
                "unsupported source '{}'; expected stub://, an image directory or /dev/videoN",
                uri
            ));
        };
        Ok(Self { backend })
    }

    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CaptureBackend::Synthetic(source) => source.connect(),
            CaptureBackend::Images(source) => source.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CaptureBackend::V4l2(source) => source.connect(),
        }
    }

    /// Capture the next frame, or `None` when the source has ended.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            CaptureBackend::Synthetic(source) => source.next_frame().map(Some),
            CaptureBackend::Images(source) => source.next_frame(),
            #[cfg(feature = "ingest-v4l2")]
            CaptureBackend::V4l2(source) => source.next_frame().map(Some),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CaptureBackend::Synthetic(source) => source.is_healthy(),
            CaptureBackend::Images(source) => source.is_healthy(),
            #[cfg(feature = "ingest-v4l2")]
            CaptureBackend::V4l2(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            CaptureBackend::Synthetic(source) => source.stats(),
            CaptureBackend::Images(source) => source.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CaptureBackend::V4l2(source) => source.stats(),
        }
    }
}

#[cfg(feature = "ingest-v4l2")]
fn open_v4l2(settings: &SourceSettings) -> Result<CaptureBackend> {
    Ok(CaptureBackend::V4l2(V4l2Source::new(settings.clone())))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_v4l2(_settings: &SourceSettings) -> Result<CaptureBackend> {
    Err(anyhow!("webcam capture requires the ingest-v4l2 feature"))
}
