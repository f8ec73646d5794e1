//! fetch_dataset - download a PPE training dataset
//!
//! `direct` pulls a public zip archive; `roboflow` resolves a project export
//! through the Roboflow API first. Both extract into an output directory and
//! print its absolute path on stdout.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

use ppe_monitor::dataset::{self, DirectRequest, RoboflowRequest};
use ppe_monitor::ui::Ui;

#[derive(Parser, Debug)]
#[command(author, version, about = "Download and extract a PPE training dataset")]
struct Args {
    /// UI mode: auto, plain, or pretty.
    #[arg(long, default_value = "auto", global = true)]
    ui: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a dataset zip archive directly.
    Direct {
        #[arg(long, default_value = dataset::DEFAULT_ARCHIVE_URL)]
        url: String,

        #[arg(long, default_value = dataset::DEFAULT_OUTPUT_DIR)]
        out: PathBuf,

        /// Keep the downloaded archive next to the extracted files.
        #[arg(long)]
        keep_archive: bool,
    },
    /// Export a Roboflow project version and download it.
    Roboflow {
        #[arg(long, env = "ROBOFLOW_API_KEY", hide_env_values = true)]
        api_key: String,

        #[arg(long, default_value = dataset::DEFAULT_WORKSPACE)]
        workspace: String,

        #[arg(long, default_value = dataset::DEFAULT_PROJECT)]
        project: String,

        #[arg(long, default_value_t = dataset::DEFAULT_VERSION)]
        version: u32,

        #[arg(long, default_value = dataset::DEFAULT_FORMAT)]
        format: String,

        /// Output directory (default: {project}-{version}).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let location = match args.command {
        Command::Direct {
            url,
            out,
            keep_archive,
        } => dataset::fetch_direct(
            &DirectRequest {
                url,
                out_dir: out,
                keep_archive,
            },
            &ui,
        )?,
        Command::Roboflow {
            api_key,
            workspace,
            project,
            version,
            format,
            out,
        } => dataset::fetch_roboflow(
            &RoboflowRequest {
                api_key,
                workspace,
                project,
                version,
                format,
                out_dir: out,
            },
            &ui,
        )?,
    };

    log::info!("dataset ready");
    println!("{}", location.display());
    Ok(())
}
