pub mod replay;

#[cfg(feature = "backend-tract")]
pub mod tract;

use anyhow::{anyhow, Result};

pub use replay::ReplayBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

use crate::config::DetectorSettings;
use crate::detect::backend::DetectorBackend;
use crate::detect::labels::LabelMap;

/// Backend names accepted by `build_backend`.
pub const BACKEND_NAMES: [&str; 2] = ["replay", "tract"];

/// Construct the configured detector backend.
pub fn build_backend(
    settings: &DetectorSettings,
    labels: LabelMap,
) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend.as_str() {
        "replay" => {
            let backend = match &settings.replay_path {
                Some(path) => ReplayBackend::from_path(path, labels)?,
                None => {
                    log::warn!("replay backend has no script; every frame will be empty");
                    ReplayBackend::new(Vec::new(), labels)
                }
            };
            Ok(Box::new(backend))
        }
        "tract" => build_tract(settings, labels),
        other => Err(anyhow!(
            "unknown detector backend '{}'; expected one of {:?}",
            other,
            BACKEND_NAMES
        )),
    }
}

#[cfg(feature = "backend-tract")]
fn build_tract(settings: &DetectorSettings, labels: LabelMap) -> Result<Box<dyn DetectorBackend>> {
    let model_path = settings
        .model_path
        .as_ref()
        .ok_or_else(|| anyhow!("tract backend requires detector.model_path"))?;
    let backend = TractBackend::new(model_path, settings.input_size, labels)?
        .with_thresholds(settings.confidence, settings.iou);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract(_settings: &DetectorSettings, _labels: LabelMap) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!("tract backend requires the backend-tract feature"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_is_rejected() {
        let settings = DetectorSettings {
            backend: "opencv".to_string(),
            ..DetectorSettings::default()
        };
        let err = build_backend(&settings, LabelMap::default()).err();
        assert!(err.is_some_and(|e| e.to_string().contains("unknown detector backend")));
    }

    #[test]
    fn replay_backend_without_script_builds() -> Result<()> {
        let settings = DetectorSettings {
            backend: "replay".to_string(),
            replay_path: None,
            ..DetectorSettings::default()
        };
        let backend = build_backend(&settings, LabelMap::default())?;
        assert_eq!(backend.name(), "replay");
        Ok(())
    }
}
