pub mod handlers;

use anyhow::Result;
use clap::Parser;

use crate::config::Config;
use crate::presentation::cli::{Cli, Commands};

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(handlers::handle_serve(config))
        }
        Commands::Reconcile => handlers::handle_reconcile(config),
        Commands::List => handlers::handle_list(config),
    }
}
