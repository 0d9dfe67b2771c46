use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flowcapture")]
#[command(about = "Turn a short task prompt into a browser action plan and capture every step")]
#[command(
    long_about = "flowcapture compiles prompts like \"create a project named Apollo in Linear\" into steps.yaml, replays the steps in Chrome, and records a screenshot, URL and content fingerprint after each one."
)]
pub struct Cli {
    /// Directory holding intents.yaml, app_names.yaml and flowcapture.yaml
    #[clap(long, global = true, env = "FLOWCAPTURE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a prompt and write steps.yaml
    Plan(PlanArgs),
    /// Replay an existing run folder's steps.yaml
    Execute(ExecuteArgs),
    /// Create a run folder, plan the prompt and execute it
    Run(RunArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct BrowserArgs {
    /// Run Chrome without a window (FLOWCAPTURE_HEADLESS accepts 1/0, true/false, yes/no)
    #[clap(
        long,
        env = "FLOWCAPTURE_HEADLESS",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub headless: bool,

    /// Attach to a running browser instead of launching one (e.g. http://127.0.0.1:9222)
    #[clap(long)]
    pub endpoint: Option<String>,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Task description, e.g. create a project named Apollo in Linear
    #[clap(required = true, num_args = 1..)]
    pub prompt: Vec<String>,

    /// Write steps.yaml into this folder
    #[clap(long)]
    pub run_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExecuteArgs {
    /// Run folder containing steps.yaml
    pub run_dir: PathBuf,

    #[command(flatten)]
    pub browser: BrowserArgs,

    /// Print the state log as JSON
    #[clap(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[clap(required = true, num_args = 1..)]
    pub prompt: Vec<String>,

    /// Parent directory for new run folders
    #[clap(long, env = "RUNS_DIR", default_value = "runs")]
    pub runs_dir: PathBuf,

    #[command(flatten)]
    pub browser: BrowserArgs,

    /// Print the state log as JSON
    #[clap(long)]
    pub json: bool,
}
