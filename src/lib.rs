//! PPE compliance monitor.
//!
//! Watches a camera (or a synthetic / still-image source), runs an object
//! detector on every frame and decides for each person whether they wear
//! the three monitored items of personal protective equipment: a helmet,
//! safety goggles and ear protection.
//!
//! # Pipeline
//!
//! ```text
//! CaptureSource -> DetectorBackend -> ComplianceClassifier -> OverlayRenderer
//! ```
//!
//! A PPE item belongs to a person when the center of its box lies in the top
//! 40% of the person's box (the head region). All three items present is
//! `SAFE`, one or two is `PARTIAL`, none is `UNSAFE`. Safety vests are
//! detected and drawn but never change a verdict.
//!
//! # Module Structure
//!
//! - `compliance`: per-person verdicts and frame counts
//! - `config`: TOML + environment configuration
//! - `dataset`: training dataset download and extraction
//! - `detect`: detector backends, label mapping, NMS
//! - `frame`: captured RGB frames
//! - `ingest`: frame sources (synthetic, image directory, V4L2)
//! - `render`: annotated frame overlay
//! - `ui`: terminal progress output

pub mod compliance;
pub mod config;
pub mod dataset;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod render;
pub mod ui;

pub use compliance::{
    ComplianceClassifier, FrameCounts, FrameReport, PersonReport, PpePresence, Verdict,
    DEFAULT_HEAD_FRACTION,
};
pub use config::MonitorConfig;
pub use detect::{BBox, Category, Detection, DetectorBackend, LabelMap};
pub use frame::Frame;
pub use ingest::CaptureSource;
pub use render::OverlayRenderer;
