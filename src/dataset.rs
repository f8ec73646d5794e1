//! Training dataset acquisition.
//!
//! Two ways to get a PPE dataset onto disk: download a public zip archive
//! directly, or ask the Roboflow export API for a download link first. Both
//! end in the same place: the archive is extracted into an output directory.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ui::Ui;

pub const DEFAULT_ARCHIVE_URL: &str =
    "https://github.com/ultralytics/assets/releases/download/v0.0.0/construction-ppe.zip";
pub const DEFAULT_OUTPUT_DIR: &str = "dataset_ppe";

pub const ROBOFLOW_API: &str = "https://api.roboflow.com";
pub const DEFAULT_WORKSPACE: &str = "vamsi-q79ie";
pub const DEFAULT_PROJECT: &str = "construction-site-safety-f70v1";
pub const DEFAULT_VERSION: u32 = 1;
pub const DEFAULT_FORMAT: &str = "yolov8";

const EXPORT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const EXPORT_POLL_ATTEMPTS: u32 = 60;
const COPY_CHUNK: usize = 64 * 1024;

/// Direct archive download.
#[derive(Clone, Debug)]
pub struct DirectRequest {
    pub url: String,
    pub out_dir: PathBuf,
    pub keep_archive: bool,
}

impl Default for DirectRequest {
    fn default() -> Self {
        Self {
            url: DEFAULT_ARCHIVE_URL.to_string(),
            out_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            keep_archive: false,
        }
    }
}

/// Roboflow project export.
#[derive(Clone, Debug)]
pub struct RoboflowRequest {
    pub api_key: String,
    pub workspace: String,
    pub project: String,
    pub version: u32,
    pub format: String,
    pub out_dir: Option<PathBuf>,
}

impl RoboflowRequest {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            workspace: DEFAULT_WORKSPACE.to_string(),
            project: DEFAULT_PROJECT.to_string(),
            version: DEFAULT_VERSION,
            format: DEFAULT_FORMAT.to_string(),
            out_dir: None,
        }
    }

    /// `{project}-{version}` unless an output directory was given.
    pub fn output_dir(&self) -> PathBuf {
        self.out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}-{}", self.project, self.version)))
    }

    pub fn export_url(&self) -> Result<url::Url> {
        let mut url = url::Url::parse(ROBOFLOW_API).context("parse roboflow api url")?;
        let version = self.version.to_string();
        url.path_segments_mut()
            .map_err(|_| anyhow!("roboflow api url cannot take a path"))?
            .pop_if_empty()
            .extend([
                self.workspace.as_str(),
                self.project.as_str(),
                version.as_str(),
                self.format.as_str(),
            ]);
        url.query_pairs_mut().append_pair("api_key", &self.api_key);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct ExportResponse {
    export: Option<ExportLink>,
    progress: Option<f64>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ExportLink {
    link: String,
}

/// State of a Roboflow export request.
#[derive(Debug, PartialEq)]
pub enum ExportStatus {
    Ready(String),
    Pending(Option<f64>),
}

pub fn parse_export_response(body: &str) -> Result<ExportStatus> {
    let response: ExportResponse =
        serde_json::from_str(body).context("parse roboflow export response")?;
    if let Some(error) = response.error {
        return Err(anyhow!("roboflow export failed: {}", error));
    }
    match response.export {
        Some(export) if !export.link.trim().is_empty() => Ok(ExportStatus::Ready(export.link)),
        _ => Ok(ExportStatus::Pending(response.progress)),
    }
}

/// Download the archive and extract it. Returns the absolute output path.
pub fn fetch_direct(request: &DirectRequest, ui: &Ui) -> Result<PathBuf> {
    std::fs::create_dir_all(&request.out_dir)
        .with_context(|| format!("create {}", request.out_dir.display()))?;
    let archive = archive_path(&request.url, &request.out_dir)?;
    download(&request.url, &archive, ui)?;
    finish_archive(&archive, &request.out_dir, request.keep_archive, ui)
}

/// Resolve the export link, download and extract. Returns the absolute
/// output path.
pub fn fetch_roboflow(request: &RoboflowRequest, ui: &Ui) -> Result<PathBuf> {
    if request.api_key.trim().is_empty() {
        return Err(anyhow!("a Roboflow API key is required"));
    }
    let link = {
        let _stage = ui.stage("Requesting Roboflow export");
        resolve_export_link(request)?
    };
    let out_dir = request.output_dir();
    std::fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let archive = out_dir.join(format!("{}.zip", request.format));
    download(&link, &archive, ui)?;
    finish_archive(&archive, &out_dir, false, ui)
}

fn resolve_export_link(request: &RoboflowRequest) -> Result<String> {
    let url = request.export_url()?;
    for attempt in 1..=EXPORT_POLL_ATTEMPTS {
        let body = ureq::get(url.as_str())
            .call()
            .with_context(|| {
                format!(
                    "request roboflow export {}/{}/{}",
                    request.workspace, request.project, request.version
                )
            })?
            .into_string()
            .context("read roboflow export response")?;
        match parse_export_response(&body)? {
            ExportStatus::Ready(link) => return Ok(link),
            ExportStatus::Pending(progress) => {
                log::info!(
                    "roboflow export not ready (attempt {}/{}, progress {})",
                    attempt,
                    EXPORT_POLL_ATTEMPTS,
                    progress
                        .map(|p| format!("{:.0}%", p * 100.0))
                        .unwrap_or_else(|| "unknown".to_string())
                );
                std::thread::sleep(EXPORT_POLL_INTERVAL);
            }
        }
    }
    Err(anyhow!(
        "roboflow export still not ready after {} attempts",
        EXPORT_POLL_ATTEMPTS
    ))
}

fn finish_archive(archive: &Path, out_dir: &Path, keep_archive: bool, ui: &Ui) -> Result<PathBuf> {
    let entries = {
        let _stage = ui.stage("Extracting archive");
        extract_zip(archive, out_dir)?
    };
    log::info!("extracted {} entries into {}", entries, out_dir.display());
    if !keep_archive {
        std::fs::remove_file(archive)
            .with_context(|| format!("remove archive {}", archive.display()))?;
    }
    std::fs::canonicalize(out_dir).with_context(|| format!("resolve {}", out_dir.display()))
}

/// Archive location inside `out_dir`, named after the last URL segment.
pub fn archive_path(source_url: &str, out_dir: &Path) -> Result<PathBuf> {
    let url = url::Url::parse(source_url).with_context(|| format!("parse url {}", source_url))?;
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("dataset.zip");
    Ok(out_dir.join(name))
}

/// Stream `url` to `dest` with progress.
pub fn download(url: &str, dest: &Path, ui: &Ui) -> Result<u64> {
    let response = ureq::get(url)
        .call()
        .with_context(|| format!("download {}", url))?;
    let total = response
        .header("Content-Length")
        .and_then(|value| value.parse::<u64>().ok());
    let mut reader = response.into_reader();
    let file = File::create(dest).with_context(|| format!("create {}", dest.display()))?;
    let mut writer = BufWriter::new(file);

    let mut transfer = ui.transfer(&format!("Downloading {}", url), total);
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        let read = reader.read(&mut buf).context("read download stream")?;
        if read == 0 {
            break;
        }
        writer
            .write_all(&buf[..read])
            .with_context(|| format!("write {}", dest.display()))?;
        transfer.advance(read as u64);
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", dest.display()))?;

    if let Some(total) = total {
        if transfer.bytes() != total {
            return Err(anyhow!(
                "download truncated: expected {} bytes, got {}",
                total,
                transfer.bytes()
            ));
        }
    }
    Ok(transfer.bytes())
}

/// Extract every entry of a zip archive under `out_dir`. Entries whose
/// paths would land outside `out_dir` fail the whole extraction.
pub fn extract_zip(archive: &Path, out_dir: &Path) -> Result<usize> {
    let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("read zip archive {}", archive.display()))?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .with_context(|| format!("read zip entry {}", index))?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| anyhow!("zip entry '{}' escapes the output directory", entry.name()))?;
        let target = out_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("create {}", target.display()))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let mut output =
            File::create(&target).with_context(|| format!("create {}", target.display()))?;
        std::io::copy(&mut entry, &mut output)
            .with_context(|| format!("extract {}", target.display()))?;
    }
    Ok(zip.len())
}
