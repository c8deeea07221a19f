use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Team task and work-package manager with RACI roles.
/// Storage defaults to ~/.wpm/team.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "wpm", version, about = "Team task and work-package management CLI")]
pub struct Cli {
    /// Path to the JSON store file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Act as this person (id or name). Defaults to the only person on file.
    #[arg(long = "as", global = true, value_name = "PERSON")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
