//! ppe_monitor - live PPE compliance monitor
//!
//! This daemon:
//! 1. Captures frames from the configured source (webcam, image directory, stub)
//! 2. Runs the configured detector on each frame
//! 3. Classifies every detected person as SAFE / PARTIAL / UNSAFE
//! 4. Writes the annotated frame to the output path (overwritten each frame)
//!
//! Stops on Ctrl-C, when a finite source runs out, or after `--max-frames`.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ppe_monitor::detect::build_backend;
use ppe_monitor::ui::Ui;
use ppe_monitor::{
    CaptureSource, Category, ComplianceClassifier, FrameReport, MonitorConfig, OverlayRenderer,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Per-person PPE compliance monitor",
    long_about = "Per-person PPE compliance monitor.\n\nWithout the backend-tract and ingest-v4l2 features the defaults are the replay detector and a synthetic stub:// source; build with those features for a webcam and an ONNX model."
)]
struct Args {
    /// TOML config file.
    #[arg(long, env = "PPE_CONFIG")]
    config: Option<PathBuf>,

    /// Stop after this many frames (0 = run until interrupted).
    #[arg(long, default_value_t = 0)]
    max_frames: u64,

    /// Log a frame summary every N frames.
    #[arg(long, default_value_t = 30)]
    log_every: u64,

    /// UI mode: auto, plain, or pretty.
    #[arg(long, default_value = "auto")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, false);

    let cfg = MonitorConfig::load_from(args.config.as_deref())?;
    let labels = cfg.label_map()?;

    let mut detector = {
        let _stage = ui.stage("Loading detector");
        let mut detector = build_backend(&cfg.detector, labels)?;
        detector.warm_up()?;
        detector
    };
    let classifier = ComplianceClassifier::new(cfg.compliance.head_fraction);
    let renderer = OverlayRenderer::from_settings(&cfg.render)?;

    let mut source = CaptureSource::open(&cfg.source)?;
    {
        let _stage = ui.stage("Connecting to source");
        source.connect()?;
    }

    log_banner(&cfg, detector.name());

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let frame_interval = if cfg.source.target_fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(1000 / cfg.source.target_fps as u64)
    };
    let log_every = args.log_every.max(1);
    let mut processed: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let started = Instant::now();
        let Some(frame) = source.next_frame()? else {
            log::info!("source exhausted after {} frames", processed);
            break;
        };

        let detections = detector.detect(&frame)?;
        let report = classifier.classify(&detections);
        processed += 1;

        if processed % log_every == 0 {
            log_summary(frame.index, &report);
            if !source.is_healthy() {
                log::warn!("source {} reports unhealthy", source.stats().source);
            }
        }

        if let Some(output) = &cfg.render.output_path {
            let mut image = frame.into_image();
            renderer.draw(&mut image, &detections, &report);
            if let Err(err) = image.save(output) {
                log::warn!("failed to write annotated frame {}: {}", output.display(), err);
            }
        }

        if args.max_frames > 0 && processed >= args.max_frames {
            log::info!("reached --max-frames {}", args.max_frames);
            break;
        }

        let elapsed = started.elapsed();
        if elapsed < frame_interval {
            std::thread::sleep(frame_interval - elapsed);
        }
    }

    let stats = source.stats();
    log::info!(
        "ppe_monitor stopped: {} frames processed, {} captured from {}",
        processed,
        stats.frames_captured,
        stats.source
    );
    Ok(())
}

fn log_banner(cfg: &MonitorConfig, backend: &str) {
    log::info!("ppe_monitor starting");
    log::info!(
        "  source: {} ({}x{} @ {} fps)",
        cfg.source.uri,
        cfg.source.width,
        cfg.source.height,
        cfg.source.target_fps
    );
    log::info!(
        "  detector: {} (confidence >= {:.2}, {} labels)",
        backend,
        cfg.detector.confidence,
        cfg.detector.labels.len()
    );
    log::info!(
        "  monitored PPE: {}, {}, {} (head region = top {:.0}% of person)",
        Category::Helmet.display_name(),
        Category::Goggles.display_name(),
        Category::EarProtection.display_name(),
        cfg.compliance.head_fraction * 100.0
    );
    log::info!("  SAFE = all 3 items, PARTIAL = 1-2 items, UNSAFE = none");
    match &cfg.render.output_path {
        Some(path) => log::info!("  annotated frames -> {}", path.display()),
        None => log::info!("  annotated frames disabled"),
    }
    log::info!("press Ctrl-C to stop");
}

fn log_summary(frame_index: u64, report: &FrameReport) {
    let (safe, partial, unsafe_count) = report.tally();
    let counts = &report.counts;
    log::info!(
        "frame {}: people={} safe={} partial={} unsafe={} | helmets={} goggles={} ear={} vests={}",
        frame_index,
        counts.persons,
        safe,
        partial,
        unsafe_count,
        counts.helmets,
        counts.goggles,
        counts.ear_protection,
        counts.vests
    );
}
