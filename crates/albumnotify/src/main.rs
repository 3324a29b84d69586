//! `albumnotify` — render the daily watchlist report and open it in the browser.

use std::path::PathBuf;

use albumnotify::config::ReportConfig;
use albumnotify::{generate_report, report, run_date, watchlist};
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "albumnotify", version = VERSION)]
struct Args {
    /// Watchlist file, one artist per line
    #[arg(default_value = "bands.txt")]
    watchlist: PathBuf,

    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the dated response cache (overrides config)
    #[arg(long)]
    cache_root: Option<PathBuf>,

    /// Directory the report is written to (overrides config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write the report without opening it
    #[arg(long)]
    no_open: bool,
}

fn main() -> Result<()> {
    // Resolve the local offset before anything could spawn a thread.
    let today = run_date();
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,albumnotify=info")
        }))
        .init();

    let cfg = match args.config.as_ref() {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    let mut settings = cfg.resolve();
    if let Some(root) = args.cache_root {
        settings.cache_root = root;
    }
    if let Some(dir) = args.output_dir {
        settings.output_dir = dir;
    }

    let entries = watchlist::load(&args.watchlist)?;
    tracing::info!(
        watchlist = %args.watchlist.display(),
        artists = entries.len(),
        "watchlist loaded"
    );

    let html = generate_report(&settings, &entries, today)?;

    std::fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("create output dir {:?}", settings.output_dir))?;
    let report_path = settings.output_dir.join(report::report_file_name(today));
    std::fs::write(&report_path, html)
        .with_context(|| format!("write report {:?}", report_path))?;
    tracing::info!(path = %report_path.display(), "report written");

    if !args.no_open {
        let target = std::path::absolute(&report_path).unwrap_or_else(|_| report_path.clone());
        if let Err(err) = webbrowser::open(&target.to_string_lossy()) {
            tracing::warn!(error = %err, "failed to open report in browser");
        }
    }
    Ok(())
}
