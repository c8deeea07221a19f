//! # WPM - Team task and work-package manager
//!
//! A command-line manager for team work organised into work packages with
//! RACI role assignment (Responsible / Accountable / Consulted / Informed)
//! and per-user visibility.
//!
//! ## Key Features
//!
//! - **Work packages with RACI roles**: one accountable person, sets of
//!   responsible, consulted and informed people per work package
//! - **Per-user visibility**: every listing and mutation is checked against
//!   the acting person; informed members see but never edit
//! - **Hierarchies**: work packages nest under work packages, tasks nest
//!   under tasks; subtasks always follow their parent's work package
//! - **Inbox capture**: tasks added without a work package land in your
//!   personal Inbox, created on first use
//! - **Cascade deletes**: deleting an item removes its whole subtree and,
//!   for work packages, every task filed under them
//! - **Audit log**: one entry per mutation, with actor and target
//! - **Local file storage**: a single JSON document per team
//!
//! ## Quick Start
//!
//! ```bash
//! # Add yourself and a colleague
//! wpm person add "Alice" --email alice@example.com
//! wpm person add "Bob" --as alice
//!
//! # Create a work package with roles
//! wpm --as alice wp add "Phase 1: Research" --accountable alice --responsible bob
//!
//! # File a task under it
//! wpm --as alice task add "Analyze competitor apps" --wp "Phase 1: Research" --assignee bob --due "in 3d"
//!
//! # Bob sees it; informed members would too, but could not edit it
//! wpm --as bob task list
//!
//! # Capture to your inbox
//! wpm --as alice task add "Book team offsite"
//! wpm --as alice inbox
//! ```
//!
//! Data is stored in `~/.wpm/team.json`. Use `--db` to point somewhere
//! else (e.g. a per-repo store you source control).

use std::path::PathBuf;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod db;
pub mod fields;
pub mod graph;
pub mod item;
pub mod permissions;

use cli::Cli;
use cmd::*;
use db::Database;

fn main() {
    let cli = Cli::parse();

    // Completions never touch the store.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let db_path = cli.db.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let wpm_dir = PathBuf::from(home).join(".wpm");
        if let Err(e) = std::fs::create_dir_all(&wpm_dir) {
            eprintln!("Failed to create wpm directory {}: {}", wpm_dir.display(), e);
            std::process::exit(1);
        }
        wpm_dir.join("team.json")
    });

    let mut db = Database::load(&db_path);

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),
        Commands::Person { action } => cmd_person(&mut db, &db_path, cli.actor, action),
        Commands::Wp { action } => cmd_wp(&mut db, &db_path, cli.actor, action),
        Commands::Task { action } => cmd_task(&mut db, &db_path, cli.actor, action),
        Commands::Project { action } => cmd_project(&mut db, &db_path, cli.actor, action),
        Commands::Tag { action } => cmd_tag(&mut db, &db_path, cli.actor, action),
        Commands::Inbox => cmd_inbox(&db, cli.actor),
        Commands::Flagged => cmd_flagged(&db, cli.actor),
        Commands::Log { limit } => cmd_log(&db, limit),
    }
}
