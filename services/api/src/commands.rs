use crate::infra::{load_awards, open_store};
use clap::Args;
use deadline_tracker::awards::{
    extract_deadline, shared_awards, AwardsSnapshot, DeadlineRefresher, HttpPageFetcher,
};
use deadline_tracker::config::AppConfig;
use deadline_tracker::error::AppError;
use deadline_tracker::telemetry;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct SnapshotArgs {
    /// Snapshot file to use instead of AWARDS_SNAPSHOT_PATH
    #[arg(long)]
    pub(crate) snapshot: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ExtractArgs {
    /// Saved page to scan, or `-` for stdin
    pub(crate) input: PathBuf,
}

fn tracker_config(args: SnapshotArgs) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(snapshot) = args.snapshot {
        config.tracker.snapshot_path = snapshot;
    }
    telemetry::init_stderr(&config.telemetry)?;
    Ok(config)
}

pub(crate) async fn run_refresh(args: SnapshotArgs) -> Result<(), AppError> {
    let config = tracker_config(args)?;

    let store = open_store(&config.tracker.snapshot_path);
    let awards = shared_awards(load_awards(&store));
    let fetcher = Arc::new(HttpPageFetcher::from_config(&config.tracker)?);
    let refresher = DeadlineRefresher::new(fetcher, store, awards)
        .with_staleness(config.tracker.staleness);

    let report = refresher.refresh().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) fn run_show(args: SnapshotArgs) -> Result<(), AppError> {
    let config = tracker_config(args)?;

    let store = open_store(&config.tracker.snapshot_path);
    let snapshot = AwardsSnapshot {
        awards: load_awards(&store),
        last_updated: None,
    };
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub(crate) fn run_extract(args: ExtractArgs) -> Result<(), AppError> {
    let text = read_input(&args.input)?;
    println!("{}", describe_extraction(&text));
    Ok(())
}

fn read_input(input: &std::path::Path) -> Result<String, AppError> {
    if input.as_os_str() == "-" {
        let mut buffer = Vec::new();
        std::io::stdin().read_to_end(&mut buffer)?;
        return Ok(String::from_utf8_lossy(&buffer).into_owned());
    }
    let bytes = std::fs::read(input)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn describe_extraction(text: &str) -> String {
    extract_deadline(text).unwrap_or_else(|| "no date found".to_string())
}
