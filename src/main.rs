mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    rucheck::logger::init_logger(if cli.verbose { "debug" } else { "warn" });

    let success = match cli.command {
        Commands::Run(args) => cli::run(args, cli.verbose).await?,
        Commands::List { suites } => cli::list(&suites)?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
