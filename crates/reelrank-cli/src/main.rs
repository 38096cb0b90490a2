mod run;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::run::RunArgs;

#[derive(Debug, Parser)]
#[command(name = "reelrank")]
#[command(about = "Find each creator's most-liked video and export its metrics")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process every creator in the input file (the default).
    Run(RunArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = reelrank_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = match cli.command {
        Some(Commands::Run(args)) => args,
        None => cli.run,
    };
    run::run(config, &args).await
}
