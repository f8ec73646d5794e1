use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::compliance::DEFAULT_HEAD_FRACTION;
use crate::detect::{LabelMap, DEFAULT_LABELS};

#[cfg(feature = "ingest-v4l2")]
const DEFAULT_SOURCE_URI: &str = "/dev/video0";
#[cfg(not(feature = "ingest-v4l2"))]
const DEFAULT_SOURCE_URI: &str = "stub://camera";
const DEFAULT_SOURCE_WIDTH: u32 = 1280;
const DEFAULT_SOURCE_HEIGHT: u32 = 720;
const DEFAULT_SOURCE_FPS: u32 = 30;
#[cfg(feature = "backend-tract")]
const DEFAULT_BACKEND: &str = "tract";
#[cfg(not(feature = "backend-tract"))]
const DEFAULT_BACKEND: &str = "replay";
const DEFAULT_MODEL_PATH: &str = "yolov8s-worldv2.onnx";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.20;
const DEFAULT_IOU: f32 = 0.7;
const DEFAULT_OUTPUT_PATH: &str = "ppe_monitor_latest.jpg";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MonitorConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    compliance: Option<ComplianceConfigFile>,
    render: Option<RenderConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    uri: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    replay_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence: Option<f32>,
    iou: Option<f32>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ComplianceConfigFile {
    head_fraction: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RenderConfigFile {
    font_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    pub compliance: ComplianceSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// `stub://name`, a directory of still images, or a V4L2 device path.
    pub uri: String,
    pub width: u32,
    pub height: u32,
    /// Frames per second to pace the loop at. 0 runs unpaced.
    pub target_fps: u32,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// `tract` or `replay`.
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub replay_path: Option<PathBuf>,
    pub input_size: u32,
    pub confidence: f32,
    pub iou: f32,
    /// Class-id ordered vocabulary.
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ComplianceSettings {
    pub head_fraction: f32,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// TTF/OTF font for captions. Without it only boxes and panels are drawn.
    pub font_path: Option<PathBuf>,
    /// Annotated frame destination, overwritten every frame.
    pub output_path: Option<PathBuf>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            uri: DEFAULT_SOURCE_URI.to_string(),
            width: DEFAULT_SOURCE_WIDTH,
            height: DEFAULT_SOURCE_HEIGHT,
            target_fps: DEFAULT_SOURCE_FPS,
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model_path: Some(PathBuf::from(DEFAULT_MODEL_PATH)),
            replay_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            confidence: DEFAULT_CONFIDENCE,
            iou: DEFAULT_IOU,
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl Default for ComplianceSettings {
    fn default() -> Self {
        Self {
            head_fraction: DEFAULT_HEAD_FRACTION,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            font_path: None,
            output_path: Some(PathBuf::from(DEFAULT_OUTPUT_PATH)),
        }
    }
}

impl MonitorConfig {
    /// File named by `PPE_CONFIG` (optional), then env overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PPE_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Same as `load` with an explicit config file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => MonitorConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Self {
        let source_defaults = SourceSettings::default();
        let source = match file.source {
            Some(source) => SourceSettings {
                uri: source.uri.unwrap_or(source_defaults.uri),
                width: source.width.unwrap_or(source_defaults.width),
                height: source.height.unwrap_or(source_defaults.height),
                target_fps: source.target_fps.unwrap_or(source_defaults.target_fps),
            },
            None => source_defaults,
        };

        let detector_defaults = DetectorSettings::default();
        let detector = match file.detector {
            Some(detector) => DetectorSettings {
                backend: detector.backend.unwrap_or(detector_defaults.backend),
                model_path: detector.model_path.or(detector_defaults.model_path),
                replay_path: detector.replay_path,
                input_size: detector.input_size.unwrap_or(detector_defaults.input_size),
                confidence: detector.confidence.unwrap_or(detector_defaults.confidence),
                iou: detector.iou.unwrap_or(detector_defaults.iou),
                labels: detector.labels.unwrap_or(detector_defaults.labels),
            },
            None => detector_defaults,
        };

        let compliance = ComplianceSettings {
            head_fraction: file
                .compliance
                .and_then(|c| c.head_fraction)
                .unwrap_or(DEFAULT_HEAD_FRACTION),
        };

        let render = match file.render {
            Some(render) => RenderSettings {
                font_path: render.font_path,
                output_path: match render.output_path {
                    Some(path) => enabled_output(path),
                    None => Some(PathBuf::from(DEFAULT_OUTPUT_PATH)),
                },
            },
            None => RenderSettings::default(),
        };

        Self {
            source,
            detector,
            compliance,
            render,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(uri) = non_empty_env("PPE_SOURCE") {
            self.source.uri = uri;
        }
        if let Some(backend) = non_empty_env("PPE_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(path) = non_empty_env("PPE_MODEL_PATH") {
            self.detector.model_path = Some(PathBuf::from(path));
        }
        if let Some(path) = non_empty_env("PPE_REPLAY_PATH") {
            self.detector.replay_path = Some(PathBuf::from(path));
        }
        if let Some(conf) = non_empty_env("PPE_CONFIDENCE") {
            self.detector.confidence = conf
                .parse()
                .map_err(|_| anyhow!("PPE_CONFIDENCE must be a number between 0 and 1"))?;
        }
        // Set but empty turns annotated output off.
        if let Ok(path) = std::env::var("PPE_OUTPUT") {
            self.render.output_path = enabled_output(PathBuf::from(path.trim()));
        }
        if let Some(path) = non_empty_env("PPE_FONT") {
            self.render.font_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&mut self) -> Result<()> {
        if self.source.uri.trim().is_empty() {
            return Err(anyhow!("source.uri must not be empty"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source width and height must be greater than zero"));
        }
        self.detector.backend = self.detector.backend.trim().to_lowercase();
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector.input_size must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence) {
            return Err(anyhow!("detector.confidence must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.detector.iou) {
            return Err(anyhow!("detector.iou must lie in [0, 1]"));
        }
        LabelMap::new(self.detector.labels.clone())?;
        let fraction = self.compliance.head_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(anyhow!("compliance.head_fraction must lie in (0, 1]"));
        }
        Ok(())
    }

    pub fn label_map(&self) -> Result<LabelMap> {
        LabelMap::new(self.detector.labels.clone())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source: SourceSettings::default(),
            detector: DetectorSettings::default(),
            compliance: ComplianceSettings::default(),
            render: RenderSettings::default(),
        }
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

/// An empty output path disables annotated frames.
fn enabled_output(path: PathBuf) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let mut cfg = MonitorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.detector.labels.len(), 7);
        assert!((cfg.compliance.head_fraction - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_head_fraction() {
        let mut cfg = MonitorConfig::default();
        cfg.compliance.head_fraction = 0.0;
        assert!(cfg.validate().is_err());
        cfg.compliance.head_fraction = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_labels_without_person() {
        let mut cfg = MonitorConfig::default();
        cfg.detector.labels = vec!["helmet".to_string()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file: MonitorConfigFile = toml::from_str(
            r#"
            [detector]
            confidence = 0.35
            "#,
        )
        .unwrap();
        let cfg = MonitorConfig::from_file(file);
        assert!((cfg.detector.confidence - 0.35).abs() < f32::EPSILON);
        assert_eq!(cfg.detector.backend, DEFAULT_BACKEND);
        assert_eq!(cfg.source.width, 1280);
        assert_eq!(
            cfg.render.output_path.as_deref(),
            Some(Path::new(DEFAULT_OUTPUT_PATH))
        );
    }

    #[test]
    fn empty_output_path_disables_annotation() {
        let file: MonitorConfigFile = toml::from_str("[render]\noutput_path = \"\"\n").unwrap();
        let cfg = MonitorConfig::from_file(file);
        assert_eq!(cfg.render.output_path, None);
    }

    #[test]
    fn defaults_follow_enabled_features() {
        let cfg = MonitorConfig::default();
        if cfg!(feature = "backend-tract") {
            assert_eq!(cfg.detector.backend, "tract");
        } else {
            assert_eq!(cfg.detector.backend, "replay");
        }
        if cfg!(feature = "ingest-v4l2") {
            assert_eq!(cfg.source.uri, "/dev/video0");
        } else {
            assert!(cfg.source.uri.starts_with("stub://"));
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<MonitorConfigFile, _> = toml::from_str("[source]\nurl = \"x\"\n");
        assert!(parsed.is_err());
    }
}
