use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use holdout::config::{check_distinct_outputs, Config};
use holdout::manifest::{write_manifest_csv, write_report_json};
use holdout::split_log::TracingLog;
use holdout::splitter::create_test_folders;

#[derive(Parser, Debug)]
#[command(
    name = "holdout",
    version,
    about = "Creates test folders from a train folder by moving a random fraction of each class"
)]
struct Args {
    /// Path to the main train folder (one subfolder per class). Also accepted as `-tr`.
    #[arg(long = "train_folder")]
    train_folder: PathBuf,

    /// Path to the destination test folder. Also accepted as `-te`.
    #[arg(long = "test_folder")]
    test_folder: PathBuf,

    /// Ratio of images to be moved to test folders (default: 0.2).
    #[arg(short = 'r', long = "test_ratio", allow_negative_numbers = true)]
    test_ratio: Option<f64>,

    /// Optional TOML config (ratio, extensions, output files).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a CSV listing every attempted move.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Write the split report as JSON.
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse_from(normalize_args(std::env::args_os()));
    let cfg = match &args.config {
        Some(p) => Config::load(p).context("load config")?,
        None => Config::default(),
    };

    let ratio = args.test_ratio.unwrap_or(cfg.split.test_ratio);
    if !(0.0..=1.0).contains(&ratio) {
        warn!(ratio, "test_ratio outside [0, 1]; per-class sample sizes are clamped");
    }
    let image_filter = cfg.image_filter()?;
    let (manifest_csv, report_json) = resolve_outputs(&args, &cfg)?;

    info!(
        train_folder = %args.train_folder.display(),
        test_folder = %args.test_folder.display(),
        ratio,
        "splitting"
    );

    let mut rng = rand::thread_rng();
    let report = match create_test_folders(
        &args.train_folder,
        &args.test_folder,
        ratio,
        &image_filter,
        &mut rng,
        &TracingLog,
    ) {
        Ok(r) => r,
        // Already logged with its path by the split itself.
        Err(_) => return Ok(ExitCode::FAILURE),
    };

    if let Some(path) = manifest_csv {
        write_manifest_csv(&path, &report).context("write manifest")?;
        println!("manifest_csv={}", path.display());
    }
    if let Some(path) = report_json {
        write_report_json(&path, &report).context("write report json")?;
        println!("report_json={}", path.display());
    }

    println!("classes={}", report.classes.len());
    println!("created_dirs={}", report.created_dirs.len());
    println!("requested={}", report.total_requested());
    println!("moved={}", report.total_moved());
    println!("failed={}", report.total_failed());
    println!("outcome={}", report.outcome());
    println!("{} image moved.", report.total_moved());
    Ok(ExitCode::SUCCESS)
}

/// CLI paths win over the config file. Checked before anything on disk changes.
fn resolve_outputs(
    args: &Args,
    cfg: &Config,
) -> anyhow::Result<(Option<PathBuf>, Option<PathBuf>)> {
    let manifest_csv = args
        .manifest
        .clone()
        .or_else(|| cfg.output.manifest_csv.clone());
    let report_json = args
        .report_json
        .clone()
        .or_else(|| cfg.output.report_json.clone());
    check_distinct_outputs(manifest_csv.as_deref(), report_json.as_deref())?;
    Ok((manifest_csv, report_json))
}

/// clap has no multi-character short flags, so the two-letter spellings are rewritten to
/// their long forms before parsing.
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|a| match a.to_str() {
            Some("-tr") => OsString::from("--train_folder"),
            Some("-te") => OsString::from("--test_folder"),
            Some(s) if s.starts_with("-tr=") => {
                OsString::from(format!("--train_folder={}", &s["-tr=".len()..]))
            }
            Some(s) if s.starts_with("-te=") => {
                OsString::from(format!("--test_folder={}", &s["-te=".len()..]))
            }
            _ => a,
        })
        .collect()
}
