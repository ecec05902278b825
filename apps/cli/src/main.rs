//! halopub: publish posts to a Halo blog, with generated tags and categories.
//!
//! Runs a stdio tool server by default; the other subcommands drive the same
//! workflow from the shell.

mod commands;
mod server;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
