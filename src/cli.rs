use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "kira-deadlineqc",
    version,
    about = "Regulatory document deadline monitor"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Run(RunArgs),
    Validate(ValidateArgs),
    Recover(RecoverArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(long, help = "Compressed export (.csv.gz) listing contract identifiers")]
    pub input: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, help = "JSON file overlaid on the built-in configuration")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "WebDriver endpoint (overrides session.webdriver_url)")]
    pub webdriver_url: Option<String>,

    #[arg(long, help = "System of record login URL (overrides session.system_url)")]
    pub system_url: Option<String>,

    #[arg(long)]
    pub day_threshold: Option<i64>,

    #[arg(long)]
    pub checkpoint_interval: Option<usize>,

    #[arg(long, help = "Reference date YYYY-MM-DD (default: today)")]
    pub reference_date: Option<NaiveDate>,

    #[arg(long, help = "Answer lookups from a JSON fixture instead of a browser")]
    pub replay: Option<PathBuf>,

    #[arg(long, default_value_t = false, help = "Continue from the last checkpoint")]
    pub resume: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[arg(long, default_value_t = false)]
    pub tsv: bool,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RecoverArgs {
    #[arg(long, help = "Output directory of the interrupted run")]
    pub out: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    Show(ConfigShowArgs),
}

#[derive(Debug, Args)]
pub struct ConfigShowArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
}
