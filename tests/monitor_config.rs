use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use ppe_monitor::config::MonitorConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PPE_CONFIG",
        "PPE_SOURCE",
        "PPE_BACKEND",
        "PPE_MODEL_PATH",
        "PPE_REPLAY_PATH",
        "PPE_CONFIDENCE",
        "PPE_OUTPUT",
        "PPE_FONT",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [source]
        uri = "stub://site_gate"
        width = 640
        height = 480
        target_fps = 5

        [detector]
        backend = "Replay"
        replay_path = "scripts/gate.json"
        confidence = 0.35
        labels = ["person", "hard hat", "goggles", "earmuffs"]

        [compliance]
        head_fraction = 0.3

        [render]
        output_path = "gate.jpg"
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    std::env::set_var("PPE_CONFIG", file.path());
    std::env::set_var("PPE_SOURCE", "stub://override");
    std::env::set_var("PPE_CONFIDENCE", "0.5");

    let cfg = MonitorConfig::load().expect("load config");
    clear_env();

    assert_eq!(cfg.source.uri, "stub://override");
    assert_eq!((cfg.source.width, cfg.source.height), (640, 480));
    assert_eq!(cfg.source.target_fps, 5);
    assert_eq!(cfg.detector.backend, "replay");
    assert_eq!(
        cfg.detector.replay_path,
        Some(PathBuf::from("scripts/gate.json"))
    );
    assert_eq!(cfg.detector.confidence, 0.5);
    assert_eq!(cfg.detector.labels.len(), 4);
    assert_eq!(cfg.compliance.head_fraction, 0.3);
    assert_eq!(cfg.render.output_path, Some(PathBuf::from("gate.jpg")));
    assert_eq!(cfg.render.font_path, None);
    assert_eq!(cfg.label_map().expect("label map").label(1), Some("hard hat"));
}

#[test]
fn defaults_apply_without_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = MonitorConfig::load().expect("load defaults");

    if cfg!(feature = "ingest-v4l2") {
        assert_eq!(cfg.source.uri, "/dev/video0");
    } else {
        assert_eq!(cfg.source.uri, "stub://camera");
    }
    if cfg!(feature = "backend-tract") {
        assert_eq!(cfg.detector.backend, "tract");
    } else {
        assert_eq!(cfg.detector.backend, "replay");
    }
    assert_eq!(
        cfg.render.output_path,
        Some(PathBuf::from("ppe_monitor_latest.jpg"))
    );
    assert_eq!(cfg.detector.confidence, 0.20);
    assert_eq!(cfg.detector.iou, 0.7);
    assert_eq!(cfg.compliance.head_fraction, 0.4);
    assert_eq!(cfg.detector.labels[1], "person");
}

#[test]
fn empty_output_env_disables_annotation() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"[render]\noutput_path = \"frames/latest.jpg\"\n")
        .expect("write config");

    std::env::set_var("PPE_OUTPUT", "");
    let cfg = MonitorConfig::load_from(Some(file.path())).expect("load config");
    clear_env();

    assert_eq!(cfg.render.output_path, None);
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PPE_CONFIDENCE", "high");
    assert!(MonitorConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"[detector]\nlabels = [\"helmet\", \"vest\"]\n")
        .expect("write config");
    assert!(MonitorConfig::load_from(Some(file.path())).is_err());

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"[compliance]\nhead_fraction = 0.0\n")
        .expect("write config");
    assert!(MonitorConfig::load_from(Some(file.path())).is_err());

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"[camera]\nuri = \"x\"\n").expect("write config");
    assert!(MonitorConfig::load_from(Some(file.path())).is_err());
}
