//! ppe_classify - classify one frame's detections offline
//!
//! Reads detections as JSON (a bare array or `{"detections": [...]}`) from a
//! file or stdin and prints the frame report as JSON. With `--image` and
//! `--annotate` the overlay is also drawn onto a still image.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;

use ppe_monitor::{ComplianceClassifier, Detection, OverlayRenderer, DEFAULT_HEAD_FRACTION};

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify PPE compliance for one frame of detections")]
struct Args {
    /// Detections JSON file ("-" or omitted reads stdin).
    input: Option<PathBuf>,

    /// Share of a person's height treated as the head region.
    #[arg(long, default_value_t = DEFAULT_HEAD_FRACTION)]
    head_fraction: f32,

    /// Still image the detections belong to.
    #[arg(long, requires = "annotate")]
    image: Option<PathBuf>,

    /// Where to write the annotated image.
    #[arg(long, requires = "image")]
    annotate: Option<PathBuf>,

    /// TTF/OTF font for overlay captions.
    #[arg(long, env = "PPE_FONT")]
    font: Option<PathBuf>,

    /// Pretty-print the report.
    #[arg(long)]
    pretty: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionsInput {
    Bare(Vec<Detection>),
    Wrapped { detections: Vec<Detection> },
}

impl DetectionsInput {
    fn into_detections(self) -> Vec<Detection> {
        match self {
            DetectionsInput::Bare(detections) => detections,
            DetectionsInput::Wrapped { detections } => detections,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if !(args.head_fraction > 0.0 && args.head_fraction <= 1.0) {
        return Err(anyhow!("--head-fraction must lie in (0, 1]"));
    }

    let raw = read_input(args.input.as_ref())?;
    let detections = serde_json::from_str::<DetectionsInput>(&raw)
        .context("parse detections JSON")?
        .into_detections();

    let report = ComplianceClassifier::new(args.head_fraction).classify(&detections);

    if let (Some(image_path), Some(out_path)) = (&args.image, &args.annotate) {
        let renderer = match &args.font {
            Some(font) => OverlayRenderer::with_font_file(font)?,
            None => OverlayRenderer::without_text(),
        };
        let mut image = image::open(image_path)
            .with_context(|| format!("open image {}", image_path.display()))?
            .to_rgb8();
        renderer.draw(&mut image, &detections, &report);
        image
            .save(out_path)
            .with_context(|| format!("write annotated image {}", out_path.display()))?;
        log::info!("annotated image written to {}", out_path.display());
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("read detections {}", path.display())),
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("read detections from stdin")?;
            Ok(raw)
        }
    }
}
