use crate::commands::{run_extract, run_refresh, run_show, ExtractArgs, SnapshotArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use deadline_tracker::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Award Deadline Tracker",
    about = "Keep award submission deadlines current and serve them over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and the background refresh schedule (default command)
    Serve(ServeArgs),
    /// Run a single refresh cycle against the snapshot and print the report
    Refresh(SnapshotArgs),
    /// Print the deadline the tracker would extract from a saved page
    Extract(ExtractArgs),
    /// Print the snapshot the way the awards endpoint returns it
    Show(SnapshotArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured snapshot file
    #[arg(long)]
    pub(crate) snapshot: Option<std::path::PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Refresh(args) => run_refresh(args).await,
        Command::Extract(args) => run_extract(args),
        Command::Show(args) => run_show(args),
    }
}
