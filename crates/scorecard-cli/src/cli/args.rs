use clap::{Args, Parser, Subcommand};
use scorecard_core::config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "scorecard",
    version,
    about = "Upload test sets, run them against an answering service and score the answers"
)]
pub struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// overrides `db` from the config file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample config file
    Init(InitArgs),
    /// Import a CSV/XLSX file as a new test set
    Upload(UploadArgs),
    /// List test sets, newest first
    Sets(SetsArgs),
    /// Show one test set with its cases
    Show(SetIdArgs),
    /// Execute every case of a test set
    Run(SetIdArgs),
    /// List the runs of a test set, newest first
    Runs(SetIdArgs),
    /// Show one run
    RunInfo(RunIdArgs),
    /// Print the result rows of a run
    Rows(RunIdArgs),
    /// Write the result rows of a run to a CSV or XLSX file
    Download(DownloadArgs),
    Version,
}

#[derive(Args, Clone)]
pub struct InitArgs {
    /// overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Clone)]
pub struct UploadArgs {
    pub file: PathBuf,

    /// display name (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Args, Clone)]
pub struct SetsArgs {
    /// substring matched against name, filename and project
    #[arg(long)]
    pub keywords: Option<String>,

    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Clone)]
pub struct SetIdArgs {
    pub set_id: i64,
}

#[derive(Args, Clone)]
pub struct RunIdArgs {
    pub run_id: i64,
}

#[derive(Args, Clone)]
pub struct DownloadArgs {
    pub run_id: i64,

    /// csv | xlsx (anything else falls back to xlsx)
    #[arg(long, default_value = "xlsx")]
    pub format: String,

    /// output path (defaults to test-run-<id>-results.<ext> in the current directory)
    #[arg(long)]
    pub out: Option<PathBuf>,
}
