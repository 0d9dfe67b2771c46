use anyhow::{Context, Result};
use clap::Parser;

mod cli;
mod command;
mod utils;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_dir = cli.config_dir.clone();

    match cli.command {
        Commands::Plan(args) => {
            let _guard = utils::init_logging(None);
            command::handle_plan(args, config_dir.as_deref())
        }
        Commands::Execute(args) => {
            let _guard = utils::init_logging(args.run_dir.is_dir().then_some(args.run_dir.as_path()));
            command::handle_execute(args, config_dir.as_deref()).await
        }
        Commands::Run(args) => {
            let run_dir = utils::new_run_dir(&args.runs_dir);
            std::fs::create_dir_all(&run_dir)
                .with_context(|| format!("Failed to create {}", run_dir.display()))?;
            let _guard = utils::init_logging(Some(&run_dir));
            command::handle_run(args, run_dir, config_dir.as_deref()).await
        }
    }
}
