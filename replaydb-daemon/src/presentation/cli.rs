use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "replaydb: watches, indexes and reclaims space for a game-replay directory", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the watcher, worker and reclaimer tasks until the process is stopped.
    Serve,
    /// Run one reconciliation pass against the replay folder and exit.
    Reconcile,
    /// Print the persisted index, ordered by finished_at.
    List,
}
