//! Command implementations for the CLI interface.
//!
//! Every handler follows the same shape: resolve the actor and any
//! id-or-name arguments, pre-check permissions through the evaluator,
//! hand the mutation to the store layer, save, and print a one-line
//! confirmation or a table. Handlers never mutate items directly.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use chrono::{Local, TimeZone, Utc};

use crate::db::*;
use crate::fields::*;
use crate::graph::compute_cascade_delete_set;
use crate::item::{Item, Person, Task, WorkPackage};
use crate::permissions::{can_view_item, visible_items_for_user};

#[derive(Subcommand)]
pub enum Commands {
    /// Manage people.
    Person {
        #[command(subcommand)]
        action: PersonAction,
    },

    /// Manage work packages.
    Wp {
        #[command(subcommand)]
        action: WpAction,
    },

    /// Manage tasks.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage tags.
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Show your inbox: unfiled tasks and tasks in your Inbox work package.
    Inbox,

    /// Show every flagged item you can see.
    Flagged,

    /// Show recent audit log entries.
    Log {
        /// Number of entries to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum PersonAction {
    /// Add a person to the team.
    Add {
        /// Display name.
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        mobile: Option<String>,
    },
    /// List everyone on file.
    List,
    /// Remove a person; their role assignments are scrubbed everywhere.
    Remove {
        /// Person ID or name.
        person: String,
    },
}

#[derive(Subcommand)]
pub enum WpAction {
    /// Add a new work package.
    Add {
        /// Short title.
        title: String,
        /// Optional longer note.
        #[arg(long)]
        note: Option<String>,
        /// Parent work package ID or title.
        #[arg(long)]
        parent: Option<String>,
        /// Accountable person (ID or name, at most one).
        #[arg(long)]
        accountable: Option<String>,
        /// Responsible person. May be repeated.
        #[arg(long = "responsible")]
        responsible: Vec<String>,
        /// Consulted person. May be repeated.
        #[arg(long = "consulted")]
        consulted: Vec<String>,
        /// Informed person (read-only role). May be repeated.
        #[arg(long = "informed")]
        informed: Vec<String>,
        /// Planned deadline: YYYY-MM-DD, "today", "in 2w", ...
        #[arg(long)]
        deadline: Option<String>,
        /// Project ID or name to file under.
        #[arg(long)]
        project: Option<String>,
    },

    /// List work packages visible to you.
    List {
        /// Include completed and dropped work packages.
        #[arg(long)]
        all: bool,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<WorkPackageStatus>,
        /// Filter by project ID or name.
        #[arg(long)]
        project: Option<String>,
        /// Only work packages where this person is accountable.
        #[arg(long)]
        accountable: Option<String>,
        /// Only work packages where this person is responsible.
        #[arg(long)]
        responsible: Option<String>,
        /// Render as a tree across parent-child relationships.
        #[arg(long)]
        tree: bool,
    },

    /// View a single work package.
    View {
        /// Work package ID or title.
        id: String,
    },

    /// Update fields on a work package.
    Update {
        /// Work package ID or title.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        note: Option<String>,
        /// Parent work package ID or title.
        #[arg(long)]
        parent: Option<String>,
        /// Detach from the parent work package.
        #[arg(long)]
        clear_parent: bool,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        clear_deadline: bool,
        /// Project ID or name.
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        clear_project: bool,
        #[arg(long, value_enum)]
        status: Option<WorkPackageStatus>,
    },

    /// Change RACI role assignments.
    Roles {
        /// Work package ID or title.
        id: String,
        /// Set the accountable person (ID or name).
        #[arg(long)]
        accountable: Option<String>,
        /// Clear the accountable person.
        #[arg(long)]
        clear_accountable: bool,
        #[arg(long = "add-responsible")]
        add_responsible: Vec<String>,
        #[arg(long = "rm-responsible")]
        rm_responsible: Vec<String>,
        #[arg(long = "add-consulted")]
        add_consulted: Vec<String>,
        #[arg(long = "rm-consulted")]
        rm_consulted: Vec<String>,
        #[arg(long = "add-informed")]
        add_informed: Vec<String>,
        #[arg(long = "rm-informed")]
        rm_informed: Vec<String>,
    },

    /// Toggle the flag on a work package.
    Flag {
        /// Work package ID or title.
        id: String,
    },

    /// Mark a work package completed.
    Complete {
        /// Work package ID or title.
        id: String,
    },

    /// Reopen a completed or dropped work package.
    Reopen {
        /// Work package ID or title.
        id: String,
    },

    /// Drop a work package without completing it.
    Drop {
        /// Work package ID or title.
        id: String,
    },

    /// Delete a work package and everything that depends on it.
    Delete {
        /// Work package ID or title.
        id: String,
        /// Confirm cascading into descendants and member tasks.
        #[arg(long)]
        cascade: bool,
    },
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a new task.
    Add {
        /// Short title.
        title: String,
        /// Optional longer note.
        #[arg(long)]
        note: Option<String>,
        /// Work package ID or title. Defaults to your Inbox.
        #[arg(long)]
        wp: Option<String>,
        /// Parent task ID or title (makes this a subtask).
        #[arg(long)]
        parent: Option<String>,
        /// Assignee (person ID or name).
        #[arg(long)]
        assignee: Option<String>,
        /// Collaborator. May be repeated.
        #[arg(long = "collab")]
        collabs: Vec<String>,
        /// Tag name. May be repeated.
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "in 3d", ...
        #[arg(long)]
        due: Option<String>,
        /// Defer date: park the task until then.
        #[arg(long)]
        defer: Option<String>,
        /// Estimate in minutes.
        #[arg(long)]
        estimate: Option<u32>,
    },

    /// List tasks visible to you.
    List {
        /// Include completed and dropped tasks.
        #[arg(long)]
        all: bool,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,
        /// Filter by work package ID or title.
        #[arg(long)]
        wp: Option<String>,
        /// Filter by assignee (person ID or name).
        #[arg(long)]
        assignee: Option<String>,
        /// Filter by tag name.
        #[arg(long)]
        tag: Option<String>,
        /// Due filter: today | this-week | overdue | none.
        #[arg(long, value_enum)]
        due: Option<DueFilter>,
        /// Render as a tree across parent-child relationships.
        #[arg(long)]
        tree: bool,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Due)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task.
    View {
        /// Task ID or title.
        id: String,
        /// Show child subtree.
        #[arg(long)]
        children: bool,
        /// Show ancestor chain.
        #[arg(long)]
        parents: bool,
    },

    /// Update fields on a task.
    Update {
        /// Task ID or title.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        note: Option<String>,
        /// Refile under a work package (ID or title).
        #[arg(long)]
        wp: Option<String>,
        /// Parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        /// Detach from the parent task.
        #[arg(long)]
        clear_parent: bool,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        clear_assignee: bool,
        #[arg(long = "add-collab")]
        add_collabs: Vec<String>,
        #[arg(long = "rm-collab")]
        rm_collabs: Vec<String>,
        #[arg(long = "add-tag")]
        add_tags: Vec<String>,
        #[arg(long = "rm-tag")]
        rm_tags: Vec<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        defer: Option<String>,
        #[arg(long)]
        clear_defer: bool,
        #[arg(long)]
        estimate: Option<u32>,
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,
    },

    /// Toggle the flag on a task.
    Flag {
        /// Task ID or title.
        id: String,
    },

    /// Mark a task completed.
    Complete {
        /// Task ID or title.
        id: String,
        /// Also mark all descendant tasks completed.
        #[arg(long)]
        recurse: bool,
    },

    /// Reopen a completed or dropped task.
    Reopen {
        /// Task ID or title.
        id: String,
    },

    /// Drop a task without completing it.
    Drop {
        /// Task ID or title.
        id: String,
    },

    /// Mark a task blocked.
    Block {
        /// Task ID or title.
        id: String,
        /// Why the task is blocked.
        #[arg(long)]
        reason: String,
    },

    /// Clear a task's blocked state.
    Unblock {
        /// Task ID or title.
        id: String,
    },

    /// Start the timer on a task.
    Start {
        /// Task ID or title.
        id: String,
    },

    /// Stop the timer and bank the elapsed time.
    Stop {
        /// Task ID or title.
        id: String,
    },

    /// Delete a task and its subtasks.
    Delete {
        /// Task ID or title.
        id: String,
        /// Confirm cascading into descendants.
        #[arg(long)]
        cascade: bool,
    },
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Add a project record.
    Add {
        /// Project name.
        name: String,
        /// Short project code, e.g. MAR-2026.
        #[arg(long)]
        code: Option<String>,
        /// Free-form status label.
        #[arg(long)]
        status: Option<String>,
    },
    /// List projects.
    List,
    /// Remove a project; its work packages become unfiled.
    Remove {
        /// Project ID or name.
        project: String,
    },
}

#[derive(Subcommand)]
pub enum TagAction {
    /// Add a tag.
    Add {
        /// Tag name.
        name: String,
    },
    /// List tags with usage counts.
    List,
    /// Remove a tag; it is scrubbed from every task.
    Remove {
        /// Tag ID or name.
        tag: String,
    },
}

// ---------------------------------------------------------------------------
// Resolution helpers
// ---------------------------------------------------------------------------

fn resolve_or_exit<T>(result: Result<T, String>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn save_or_exit(db: &Database, path: &Path) {
    if let Err(e) = db.save(path) {
        eprintln!("Failed to save store: {e}");
        std::process::exit(1);
    }
}

/// Work out who is acting. With no --as flag, a one-person store acts as
/// that person; anything else needs the flag.
pub fn resolve_actor(db: &Database, actor: &Option<String>) -> Result<u64, String> {
    match actor {
        Some(spec) => resolve_person_identifier(spec, db),
        None => match db.persons.len() {
            0 => Err("No people on file. Add yourself first: wpm person add <name>".into()),
            1 => Ok(db.persons[0].id),
            _ => Err("Several people on file. Pick one with --as <id-or-name>.".into()),
        },
    }
}

/// Resolve a person by ID or (case-insensitive) name.
pub fn resolve_person_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        return match db.person(id) {
            Some(_) => Ok(id),
            None => Err(format!("Person with ID {id} not found")),
        };
    }
    let matches: Vec<&Person> = db
        .persons
        .iter()
        .filter(|p| p.name.to_lowercase() == identifier.to_lowercase())
        .collect();
    match matches.len() {
        0 => Err(format!("No person found with name '{identifier}'")),
        1 => Ok(matches[0].id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|p| p.id.to_string()).collect();
            Err(format!(
                "Multiple people named '{identifier}' (IDs {}). Please use the specific ID instead.",
                ids.join(", ")
            ))
        }
    }
}

/// Resolve a task by ID or (case-insensitive) title.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        return match db.task(id) {
            Some(_) => Ok(id),
            None => Err(format!("Task with ID {id} not found")),
        };
    }
    let matches: Vec<&Task> = db
        .items
        .iter()
        .filter_map(|i| i.as_task())
        .filter(|t| t.title.to_lowercase() == identifier.to_lowercase())
        .collect();
    match matches.len() {
        0 => Err(format!("No task found with title '{identifier}'")),
        1 => Ok(matches[0].id),
        _ => {
            let mut msg = format!("Multiple tasks found with title '{identifier}':\n");
            for t in matches {
                msg.push_str(&format!("  ID {}: {}\n", t.id, t.title));
            }
            msg.push_str("Please use the specific ID instead.");
            Err(msg)
        }
    }
}

/// Resolve a work package by ID or (case-insensitive) title.
pub fn resolve_wp_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        return match db.work_package(id) {
            Some(_) => Ok(id),
            None => Err(format!("Work package with ID {id} not found")),
        };
    }
    let matches: Vec<&WorkPackage> = db
        .items
        .iter()
        .filter_map(|i| i.as_work_package())
        .filter(|wp| wp.title.to_lowercase() == identifier.to_lowercase())
        .collect();
    match matches.len() {
        0 => Err(format!("No work package found with title '{identifier}'")),
        1 => Ok(matches[0].id),
        _ => {
            let mut msg = format!("Multiple work packages found with title '{identifier}':\n");
            for wp in matches {
                msg.push_str(&format!("  ID {}: {}\n", wp.id, wp.title));
            }
            msg.push_str("Please use the specific ID instead.");
            Err(msg)
        }
    }
}

fn resolve_tag_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        if db.tags.iter().any(|t| t.id == id) {
            return Ok(id);
        }
    }
    db.tags
        .iter()
        .find(|t| t.name.to_lowercase() == identifier.to_lowercase())
        .map(|t| t.id)
        .ok_or_else(|| format!("Tag '{identifier}' not found. Create it with: wpm tag add {identifier}"))
}

fn resolve_project_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        if db.projects.iter().any(|p| p.id == id) {
            return Ok(id);
        }
    }
    db.projects
        .iter()
        .find(|p| p.name.to_lowercase() == identifier.to_lowercase())
        .map(|p| p.id)
        .ok_or_else(|| format!("Project '{identifier}' not found"))
}

fn resolve_person_set(specs: &[String], db: &Database) -> Result<BTreeSet<u64>, String> {
    let mut out = BTreeSet::new();
    for spec in specs {
        out.insert(resolve_person_identifier(spec, db)?);
    }
    Ok(out)
}

fn parse_date_or_exit(input: &str) -> chrono::NaiveDate {
    match parse_date_input(input) {
        Some(d) => d,
        None => {
            eprintln!("Unrecognised date '{input}'. Use YYYY-MM-DD, 'today', 'tomorrow', or 'in Nd'.");
            std::process::exit(1);
        }
    }
}

fn task_or_exit(db: &Database, id: u64) -> Task {
    match db.task(id) {
        Some(t) => t.clone(),
        None => {
            eprintln!("Task {id} not found.");
            std::process::exit(1);
        }
    }
}

fn wp_or_exit(db: &Database, id: u64) -> WorkPackage {
    match db.work_package(id) {
        Some(wp) => wp.clone(),
        None => {
            eprintln!("Work package {id} not found.");
            std::process::exit(1);
        }
    }
}

/// Ancestor chain of an item, closest first, bounded against corrupt cycles.
fn collect_ancestors(mut id: u64, db: &Database) -> Vec<u64> {
    let mut chain = Vec::new();
    while let Some(item) = db.item(id) {
        match item.parent_id() {
            Some(p) => {
                chain.push(p);
                id = p;
                if chain.len() > 64 {
                    break;
                }
            }
            None => break,
        }
    }
    chain
}

/// Depth of each listed item below its tree root, for indentation.
fn depth_map(db: &Database, ids: &[u64]) -> HashMap<u64, usize> {
    let mut map = HashMap::new();
    for &id in ids {
        let mut depth = 0usize;
        let mut cur = db.item(id).and_then(|i| i.parent_id());
        while let Some(pid) = cur {
            depth += 1;
            cur = db.item(pid).and_then(|p| p.parent_id());
            if depth > 64 {
                break; // cycle guard
            }
        }
        map.insert(id, depth);
    }
    map
}

// ---------------------------------------------------------------------------
// Person commands
// ---------------------------------------------------------------------------

pub fn cmd_person(db: &mut Database, db_path: &Path, actor: Option<String>, action: PersonAction) {
    match action {
        PersonAction::Add { name, email, mobile } => {
            let id = db.next_person_id();
            // The very first person bootstraps themselves into the log.
            let actor_id = resolve_actor(db, &actor).unwrap_or(id);
            db.upsert_person(
                Person {
                    id,
                    name,
                    email: email.unwrap_or_default(),
                    mobile: mobile.unwrap_or_default(),
                },
                actor_id,
            );
            save_or_exit(db, db_path);
            println!("Added person {id}");
        }
        PersonAction::List => {
            println!("{:<5} {:<20} {:<24} {}", "ID", "Name", "Email", "Mobile");
            for p in &db.persons {
                println!(
                    "{:<5} {:<20} {:<24} {}",
                    p.id,
                    truncate(&p.name, 20),
                    truncate(&p.email, 24),
                    p.mobile
                );
            }
        }
        PersonAction::Remove { person } => {
            let actor_id = resolve_or_exit(resolve_actor(db, &actor));
            let person_id = resolve_or_exit(resolve_person_identifier(&person, db));
            resolve_or_exit(db.delete_person(person_id, actor_id));
            save_or_exit(db, db_path);
            println!("Removed person {person_id} and scrubbed their role assignments.");
        }
    }
}

// ---------------------------------------------------------------------------
// Work package commands
// ---------------------------------------------------------------------------

pub fn cmd_wp(db: &mut Database, db_path: &Path, actor: Option<String>, action: WpAction) {
    let actor_id = resolve_or_exit(resolve_actor(db, &actor));
    match action {
        WpAction::Add {
            title,
            note,
            parent,
            accountable,
            responsible,
            consulted,
            informed,
            deadline,
            project,
        } => {
            let parent_id = parent.map(|p| resolve_or_exit(resolve_wp_identifier(&p, db)));
            let accountable_id = accountable.map(|p| resolve_or_exit(resolve_person_identifier(&p, db)));
            let responsible_ids = resolve_or_exit(resolve_person_set(&responsible, db));
            let consulted_ids = resolve_or_exit(resolve_person_set(&consulted, db));
            let informed_ids = resolve_or_exit(resolve_person_set(&informed, db));
            let project_id = project.map(|p| resolve_or_exit(resolve_project_identifier(&p, db)));
            let deadline_date = deadline.as_deref().map(parse_date_or_exit);

            let id = db.next_item_id();
            let mut wp = WorkPackage::new(id, actor_id, title, Utc::now().timestamp());
            wp.note = note.unwrap_or_default();
            wp.parent_id = parent_id;
            wp.accountable = accountable_id;
            wp.responsible = responsible_ids;
            wp.consulted = consulted_ids;
            wp.informed = informed_ids;
            wp.planned_deadline = deadline_date;
            wp.project_id = project_id;

            resolve_or_exit(db.upsert_item(Item::WorkPackage(wp), actor_id));
            save_or_exit(db, db_path);
            println!("Added work package {id}");
        }

        WpAction::List { all, status, project, accountable, responsible, tree } => {
            let project_id = project.map(|p| resolve_or_exit(resolve_project_identifier(&p, db)));
            let accountable_id = accountable.map(|p| resolve_or_exit(resolve_person_identifier(&p, db)));
            let responsible_id = responsible.map(|p| resolve_or_exit(resolve_person_identifier(&p, db)));

            let visible = visible_items_for_user(actor_id, &db.items);
            let wps: Vec<&WorkPackage> = visible
                .iter()
                .filter_map(|i| i.as_work_package())
                // Inboxes never show up in work-package listings.
                .filter(|wp| wp.title != "Inbox")
                .filter(|wp| {
                    if !all && status.is_none() && wp.status != WorkPackageStatus::Active {
                        return false;
                    }
                    if let Some(s) = status {
                        if wp.status != s {
                            return false;
                        }
                    }
                    if let Some(pid) = project_id {
                        if wp.project_id != Some(pid) {
                            return false;
                        }
                    }
                    if let Some(a) = accountable_id {
                        if !wp.is_accountable(a) {
                            return false;
                        }
                    }
                    if let Some(r) = responsible_id {
                        if !wp.is_responsible(r) {
                            return false;
                        }
                    }
                    true
                })
                .collect();

            let depths = if tree {
                let ids: Vec<u64> = wps.iter().map(|wp| wp.id).collect();
                Some(depth_map(db, &ids))
            } else {
                None
            };
            print_wp_table(db, &wps, depths.as_ref());
        }

        WpAction::View { id } => {
            let wp_id = resolve_or_exit(resolve_wp_identifier(&id, db));
            let Some(item) = db.item(wp_id) else {
                eprintln!("Work package {wp_id} not found.");
                std::process::exit(1);
            };
            if !can_view_item(item, actor_id, &db.items) {
                eprintln!("You don't have permission to view work package {wp_id}.");
                std::process::exit(1);
            }
            let Some(wp) = item.as_work_package() else {
                eprintln!("Item {wp_id} is not a work package.");
                std::process::exit(1);
            };
            let today = Local::now().date_naive();
            let member_tasks = db
                .items
                .iter()
                .filter_map(|i| i.as_task())
                .filter(|t| t.work_package_id == Some(wp.id))
                .count();
            println!("ID:           {}", wp.id);
            println!("Title:        {}", wp.title);
            println!("Status:       {}", format_wp_status(wp.status));
            println!("Creator:      {}", db.person_name(Some(wp.creator_id)));
            println!("Parent:       {}", wp.parent_id.map(|p| p.to_string()).unwrap_or_else(|| "-".into()));
            println!("Accountable:  {}", db.person_name(wp.accountable));
            println!("Responsible:  {}", person_list(db, &wp.responsible));
            println!("Consulted:    {}", person_list(db, &wp.consulted));
            println!("Informed:     {}", person_list(db, &wp.informed));
            println!(
                "Deadline:     {}",
                match wp.planned_deadline {
                    Some(d) => format!("{d} ({})", format_date_relative(Some(d), today)),
                    None => "-".into(),
                }
            );
            println!(
                "Project:      {}",
                wp.project_id
                    .and_then(|pid| db.projects.iter().find(|p| p.id == pid))
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| "-".into())
            );
            println!("Flagged:      {}", if wp.flagged { "yes" } else { "no" });
            println!("Tasks:        {member_tasks}");
            println!("Created UTC:  {}", Utc.timestamp_opt(wp.created_at_utc, 0).single().unwrap().to_rfc3339());
            println!("Updated UTC:  {}", Utc.timestamp_opt(wp.updated_at_utc, 0).single().unwrap().to_rfc3339());
            if !wp.note.is_empty() {
                println!("Note:\n{}", wp.note);
            }
        }

        WpAction::Update {
            id,
            title,
            note,
            parent,
            clear_parent,
            deadline,
            clear_deadline,
            project,
            clear_project,
            status,
        } => {
            let wp_id = resolve_or_exit(resolve_wp_identifier(&id, db));
            let parent_id = parent.map(|p| resolve_or_exit(resolve_wp_identifier(&p, db)));
            let project_id = project.map(|p| resolve_or_exit(resolve_project_identifier(&p, db)));
            let deadline_date = deadline.as_deref().map(parse_date_or_exit);

            let mut wp = wp_or_exit(db, wp_id);
            if let Some(s) = title {
                wp.title = s;
            }
            if let Some(n) = note {
                wp.note = n;
            }
            if clear_parent {
                wp.parent_id = None;
            }
            if let Some(pid) = parent_id {
                wp.parent_id = Some(pid);
            }
            if clear_deadline {
                wp.planned_deadline = None;
            }
            if let Some(d) = deadline_date {
                wp.planned_deadline = Some(d);
            }
            if clear_project {
                wp.project_id = None;
            }
            if let Some(pid) = project_id {
                wp.project_id = Some(pid);
            }
            if let Some(s) = status {
                wp.status = s;
                wp.completed_at_utc = match s {
                    WorkPackageStatus::Completed => Some(Utc::now().timestamp()),
                    _ => None,
                };
            }

            resolve_or_exit(db.upsert_item(Item::WorkPackage(wp), actor_id));
            save_or_exit(db, db_path);
            println!("Updated work package {wp_id}");
        }

        WpAction::Roles {
            id,
            accountable,
            clear_accountable,
            add_responsible,
            rm_responsible,
            add_consulted,
            rm_consulted,
            add_informed,
            rm_informed,
        } => {
            let wp_id = resolve_or_exit(resolve_wp_identifier(&id, db));
            let accountable_id = accountable.map(|p| resolve_or_exit(resolve_person_identifier(&p, db)));
            let add_r = resolve_or_exit(resolve_person_set(&add_responsible, db));
            let rm_r = resolve_or_exit(resolve_person_set(&rm_responsible, db));
            let add_c = resolve_or_exit(resolve_person_set(&add_consulted, db));
            let rm_c = resolve_or_exit(resolve_person_set(&rm_consulted, db));
            let add_i = resolve_or_exit(resolve_person_set(&add_informed, db));
            let rm_i = resolve_or_exit(resolve_person_set(&rm_informed, db));

            let mut wp = wp_or_exit(db, wp_id);
            if clear_accountable {
                wp.accountable = None;
            }
            if let Some(a) = accountable_id {
                wp.accountable = Some(a);
            }
            wp.responsible.extend(add_r);
            wp.responsible.retain(|p| !rm_r.contains(p));
            wp.consulted.extend(add_c);
            wp.consulted.retain(|p| !rm_c.contains(p));
            wp.informed.extend(add_i);
            wp.informed.retain(|p| !rm_i.contains(p));

            resolve_or_exit(db.upsert_item(Item::WorkPackage(wp), actor_id));
            save_or_exit(db, db_path);
            println!("Updated roles on work package {wp_id}");
        }

        WpAction::Flag { id } => {
            let wp_id = resolve_or_exit(resolve_wp_identifier(&id, db));
            let mut wp = wp_or_exit(db, wp_id);
            wp.flagged = !wp.flagged;
            let flagged = wp.flagged;
            resolve_or_exit(db.upsert_item(Item::WorkPackage(wp), actor_id));
            save_or_exit(db, db_path);
            println!("{} work package {wp_id}", if flagged { "Flagged" } else { "Unflagged" });
        }

        WpAction::Complete { id } => {
            set_wp_status(db, db_path, actor_id, &id, WorkPackageStatus::Completed, "Completed");
        }
        WpAction::Reopen { id } => {
            set_wp_status(db, db_path, actor_id, &id, WorkPackageStatus::Active, "Reopened");
        }
        WpAction::Drop { id } => {
            set_wp_status(db, db_path, actor_id, &id, WorkPackageStatus::Dropped, "Dropped");
        }

        WpAction::Delete { id, cascade } => {
            let wp_id = resolve_or_exit(resolve_wp_identifier(&id, db));
            let doomed = compute_cascade_delete_set(wp_id, &db.items);
            if doomed.len() > 1 && !cascade {
                eprintln!(
                    "Work package {wp_id} has {} dependent item(s). Use --cascade to delete all.",
                    doomed.len() - 1
                );
                std::process::exit(1);
            }
            let removed = resolve_or_exit(db.delete_item(wp_id, actor_id));
            save_or_exit(db, db_path);
            println!("Deleted {removed} item(s).");
        }
    }
}

fn set_wp_status(
    db: &mut Database,
    db_path: &Path,
    actor_id: u64,
    id: &str,
    status: WorkPackageStatus,
    verb: &str,
) {
    let wp_id = resolve_or_exit(resolve_wp_identifier(id, db));
    let mut wp = wp_or_exit(db, wp_id);
    wp.status = status;
    wp.completed_at_utc = match status {
        WorkPackageStatus::Completed => Some(Utc::now().timestamp()),
        _ => None,
    };
    resolve_or_exit(db.upsert_item(Item::WorkPackage(wp), actor_id));
    save_or_exit(db, db_path);
    println!("{verb} work package {wp_id}");
}

// ---------------------------------------------------------------------------
// Task commands
// ---------------------------------------------------------------------------

pub fn cmd_task(db: &mut Database, db_path: &Path, actor: Option<String>, action: TaskAction) {
    let actor_id = resolve_or_exit(resolve_actor(db, &actor));
    match action {
        TaskAction::Add {
            title,
            note,
            wp,
            parent,
            assignee,
            collabs,
            tags,
            due,
            defer,
            estimate,
        } => {
            let parent_id = parent.map(|p| resolve_or_exit(resolve_task_identifier(&p, db)));
            let assignee_id = assignee.map(|p| resolve_or_exit(resolve_person_identifier(&p, db)));
            let collab_ids = resolve_or_exit(resolve_person_set(&collabs, db));
            let mut tag_ids = BTreeSet::new();
            for tag in &tags {
                tag_ids.insert(resolve_or_exit(resolve_tag_identifier(tag, db)));
            }
            let due_date = due.as_deref().map(parse_date_or_exit);
            let defer_date = defer.as_deref().map(parse_date_or_exit);

            // Explicit work package wins; a subtask inherits its parent's
            // via propagation; anything else lands in the actor's Inbox.
            let wp_id = match (&wp, parent_id) {
                (Some(spec), _) => Some(resolve_or_exit(resolve_wp_identifier(spec, db))),
                (None, Some(_)) => None,
                (None, None) => Some(db.ensure_inbox(actor_id)),
            };

            let id = db.next_item_id();
            let mut task = Task::new(id, actor_id, title, Utc::now().timestamp());
            task.note = note.unwrap_or_default();
            task.work_package_id = wp_id;
            task.parent_id = parent_id;
            task.assignee_id = assignee_id;
            task.collaborator_ids = collab_ids;
            task.tag_ids = tag_ids;
            task.due = due_date;
            task.defer = defer_date;
            task.estimate_minutes = estimate;

            resolve_or_exit(db.upsert_item(Item::Task(task), actor_id));
            save_or_exit(db, db_path);
            println!("Added task {id}");
        }

        TaskAction::List { all, status, wp, assignee, tag, due, tree, sort, limit } => {
            let wp_id = wp.map(|w| resolve_or_exit(resolve_wp_identifier(&w, db)));
            let assignee_id = assignee.map(|p| resolve_or_exit(resolve_person_identifier(&p, db)));
            let tag_id = tag.map(|t| resolve_or_exit(resolve_tag_identifier(&t, db)));
            let today = Local::now().date_naive();
            let (week_start, week_end) = start_end_of_this_week(today);

            let visible = visible_items_for_user(actor_id, &db.items);
            let mut tasks: Vec<&Task> = visible
                .iter()
                .filter_map(|i| i.as_task())
                .filter(|t| {
                    if !all
                        && status.is_none()
                        && matches!(t.status, TaskStatus::Completed | TaskStatus::Dropped)
                    {
                        return false;
                    }
                    if let Some(s) = status {
                        if t.status != s {
                            return false;
                        }
                    }
                    if let Some(w) = wp_id {
                        if t.work_package_id != Some(w) {
                            return false;
                        }
                    }
                    if let Some(a) = assignee_id {
                        if t.assignee_id != Some(a) {
                            return false;
                        }
                    }
                    if let Some(tg) = tag_id {
                        if !t.tag_ids.contains(&tg) {
                            return false;
                        }
                    }
                    if let Some(df) = due {
                        match df {
                            DueFilter::Today => {
                                if t.due != Some(today) {
                                    return false;
                                }
                            }
                            DueFilter::ThisWeek => {
                                if let Some(d) = t.due {
                                    if d < week_start || d > week_end {
                                        return false;
                                    }
                                } else {
                                    return false;
                                }
                            }
                            DueFilter::Overdue => {
                                if let Some(d) = t.due {
                                    if d >= today {
                                        return false;
                                    }
                                } else {
                                    return false;
                                }
                            }
                            DueFilter::None => {
                                if t.due.is_some() {
                                    return false;
                                }
                            }
                        }
                    }
                    true
                })
                .collect();

            match sort {
                SortKey::Due => tasks.sort_by_key(|t| (t.due.unwrap_or(chrono::NaiveDate::MAX), t.id)),
                SortKey::Id => tasks.sort_by_key(|t| t.id),
                SortKey::Updated => tasks.sort_by_key(|t| (std::cmp::Reverse(t.updated_at_utc), t.id)),
            }
            if let Some(n) = limit {
                tasks.truncate(n);
            }

            let depths = if tree {
                let ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
                Some(depth_map(db, &ids))
            } else {
                None
            };
            print_task_table(db, &tasks, depths.as_ref());
        }

        TaskAction::View { id, children, parents } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            let Some(item) = db.item(task_id) else {
                eprintln!("Task {task_id} not found.");
                std::process::exit(1);
            };
            if !can_view_item(item, actor_id, &db.items) {
                eprintln!("You don't have permission to view task {task_id}.");
                std::process::exit(1);
            }
            let Some(task) = item.as_task() else {
                eprintln!("Item {task_id} is not a task.");
                std::process::exit(1);
            };
            let today = Local::now().date_naive();
            println!("ID:           {}", task.id);
            println!("Title:        {}", task.title);
            println!("Status:       {}", format_task_status(task.status));
            println!("Creator:      {}", db.person_name(Some(task.creator_id)));
            println!(
                "Work package: {}",
                task.work_package_id
                    .and_then(|w| db.work_package(w))
                    .map(|w| format!("{} (#{})", w.title, w.id))
                    .unwrap_or_else(|| "-".into())
            );
            println!("Parent:       {}", task.parent_id.map(|p| p.to_string()).unwrap_or_else(|| "-".into()));
            println!("Assignee:     {}", db.person_name(task.assignee_id));
            println!("Collabs:      {}", person_list(db, &task.collaborator_ids));
            println!("Tags:         {}", tag_list(db, &task.tag_ids));
            println!(
                "Due:          {}",
                match task.due {
                    Some(d) => format!("{d} ({})", format_date_relative(Some(d), today)),
                    None => "-".into(),
                }
            );
            println!("Defer:        {}", task.defer.map(|d| d.to_string()).unwrap_or_else(|| "-".into()));
            println!(
                "Estimate:     {}",
                task.estimate_minutes.map(|m| format!("{m}m")).unwrap_or_else(|| "-".into())
            );
            println!("Tracked:      {}", format_tracked(task.accumulated_seconds));
            if let Some(started) = task.timer_started_at_utc {
                println!(
                    "Timer:        running since {}",
                    Utc.timestamp_opt(started, 0).single().unwrap().to_rfc3339()
                );
            }
            if let Some(ref blockage) = task.blockage {
                println!(
                    "Blocked:      {} (reported by {})",
                    blockage.details,
                    db.person_name(Some(blockage.reporter_id))
                );
            }
            println!("Flagged:      {}", if task.flagged { "yes" } else { "no" });
            println!("Created UTC:  {}", Utc.timestamp_opt(task.created_at_utc, 0).single().unwrap().to_rfc3339());
            println!("Updated UTC:  {}", Utc.timestamp_opt(task.updated_at_utc, 0).single().unwrap().to_rfc3339());
            if !task.note.is_empty() {
                println!("Note:\n{}", task.note);
            }

            if parents {
                let chain = collect_ancestors(task_id, db);
                if chain.is_empty() {
                    println!("Ancestors: -");
                } else {
                    println!(
                        "Ancestors (closest first): {}",
                        chain.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" -> ")
                    );
                }
            }

            if children {
                println!("Children:");
                let child_map = task_children_map(db);
                if child_map.get(&task_id).is_some() {
                    fn dfs(id: u64, child_map: &BTreeMap<u64, Vec<u64>>, db: &Database, depth: usize) {
                        if let Some(children) = child_map.get(&id) {
                            for &c in children {
                                if let Some(t) = db.task(c) {
                                    println!(
                                        "{}- {} [{}] (#{})",
                                        "  ".repeat(depth),
                                        t.title,
                                        format_task_status(t.status),
                                        t.id
                                    );
                                    dfs(c, child_map, db, depth + 1);
                                }
                            }
                        }
                    }
                    dfs(task_id, &child_map, db, 1);
                } else {
                    println!("  -");
                }
            }
        }

        TaskAction::Update {
            id,
            title,
            note,
            wp,
            parent,
            clear_parent,
            assignee,
            clear_assignee,
            add_collabs,
            rm_collabs,
            add_tags,
            rm_tags,
            due,
            clear_due,
            defer,
            clear_defer,
            estimate,
            status,
        } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            let wp_id = wp.map(|w| resolve_or_exit(resolve_wp_identifier(&w, db)));
            let parent_id = parent.map(|p| resolve_or_exit(resolve_task_identifier(&p, db)));
            let assignee_id = assignee.map(|p| resolve_or_exit(resolve_person_identifier(&p, db)));
            let add_c = resolve_or_exit(resolve_person_set(&add_collabs, db));
            let rm_c = resolve_or_exit(resolve_person_set(&rm_collabs, db));
            let mut add_t = BTreeSet::new();
            for tag in &add_tags {
                add_t.insert(resolve_or_exit(resolve_tag_identifier(tag, db)));
            }
            let mut rm_t = BTreeSet::new();
            for tag in &rm_tags {
                rm_t.insert(resolve_or_exit(resolve_tag_identifier(tag, db)));
            }
            let due_date = due.as_deref().map(parse_date_or_exit);
            let defer_date = defer.as_deref().map(parse_date_or_exit);

            let mut task = task_or_exit(db, task_id);
            if let Some(s) = title {
                task.title = s;
            }
            if let Some(n) = note {
                task.note = n;
            }
            if let Some(w) = wp_id {
                task.work_package_id = Some(w);
            }
            if clear_parent {
                task.parent_id = None;
            }
            if let Some(p) = parent_id {
                task.parent_id = Some(p);
            }
            if clear_assignee {
                task.assignee_id = None;
            }
            if let Some(a) = assignee_id {
                task.assignee_id = Some(a);
            }
            task.collaborator_ids.extend(add_c);
            task.collaborator_ids.retain(|p| !rm_c.contains(p));
            task.tag_ids.extend(add_t);
            task.tag_ids.retain(|t| !rm_t.contains(t));
            if clear_due {
                task.due = None;
            }
            if let Some(d) = due_date {
                task.due = Some(d);
            }
            if clear_defer {
                task.defer = None;
            }
            if let Some(d) = defer_date {
                task.defer = Some(d);
            }
            if let Some(e) = estimate {
                task.estimate_minutes = Some(e);
            }
            if let Some(s) = status {
                task.status = s;
                task.completed_at_utc = match s {
                    TaskStatus::Completed => Some(Utc::now().timestamp()),
                    _ => None,
                };
            }

            resolve_or_exit(db.upsert_item(Item::Task(task), actor_id));
            save_or_exit(db, db_path);
            println!("Updated task {task_id}");
        }

        TaskAction::Flag { id } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            let mut task = task_or_exit(db, task_id);
            task.flagged = !task.flagged;
            let flagged = task.flagged;
            resolve_or_exit(db.upsert_item(Item::Task(task), actor_id));
            save_or_exit(db, db_path);
            println!("{} task {task_id}", if flagged { "Flagged" } else { "Unflagged" });
        }

        TaskAction::Complete { id, recurse } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            let mut to_mark = vec![task_id];
            if recurse {
                let descendants = crate::graph::get_descendants(task_id, &db.items);
                to_mark.extend(
                    db.items
                        .iter()
                        .filter_map(|i| i.as_task())
                        .filter(|t| descendants.contains(&t.id))
                        .map(|t| t.id),
                );
            }
            let now_utc = Utc::now().timestamp();
            for tid in to_mark {
                let mut task = task_or_exit(db, tid);
                task.status = TaskStatus::Completed;
                task.completed_at_utc = Some(now_utc);
                if let Err(e) = db.upsert_item(Item::Task(task), actor_id) {
                    eprintln!("Skipped task {tid}: {e}");
                }
            }
            save_or_exit(db, db_path);
            println!("Marked done.");
        }

        TaskAction::Reopen { id } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            let mut task = task_or_exit(db, task_id);
            task.status = TaskStatus::Active;
            task.completed_at_utc = None;
            resolve_or_exit(db.upsert_item(Item::Task(task), actor_id));
            save_or_exit(db, db_path);
            println!("Reopened {task_id}");
        }

        TaskAction::Drop { id } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            let mut task = task_or_exit(db, task_id);
            task.status = TaskStatus::Dropped;
            task.completed_at_utc = None;
            resolve_or_exit(db.upsert_item(Item::Task(task), actor_id));
            save_or_exit(db, db_path);
            println!("Dropped {task_id}");
        }

        TaskAction::Block { id, reason } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            resolve_or_exit(db.block_task(task_id, actor_id, reason));
            save_or_exit(db, db_path);
            println!("Blocked task {task_id}");
        }

        TaskAction::Unblock { id } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            let mut task = task_or_exit(db, task_id);
            task.status = TaskStatus::Active;
            task.blockage = None;
            resolve_or_exit(db.upsert_item(Item::Task(task), actor_id));
            save_or_exit(db, db_path);
            println!("Unblocked task {task_id}");
        }

        TaskAction::Start { id } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            let mut task = task_or_exit(db, task_id);
            if task.timer_started_at_utc.is_some() {
                eprintln!("Timer already running on task {task_id}.");
                std::process::exit(1);
            }
            task.timer_started_at_utc = Some(Utc::now().timestamp());
            resolve_or_exit(db.upsert_item(Item::Task(task), actor_id));
            save_or_exit(db, db_path);
            println!("Started timer on task {task_id}");
        }

        TaskAction::Stop { id } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            let mut task = task_or_exit(db, task_id);
            let Some(started) = task.timer_started_at_utc else {
                eprintln!("No timer running on task {task_id}.");
                std::process::exit(1);
            };
            let elapsed = (Utc::now().timestamp() - started).max(0) as u64;
            task.accumulated_seconds += elapsed;
            task.timer_started_at_utc = None;
            let total = task.accumulated_seconds;
            resolve_or_exit(db.upsert_item(Item::Task(task), actor_id));
            save_or_exit(db, db_path);
            println!("Stopped timer on task {task_id} ({} tracked)", format_tracked(total));
        }

        TaskAction::Delete { id, cascade } => {
            let task_id = resolve_or_exit(resolve_task_identifier(&id, db));
            let doomed = compute_cascade_delete_set(task_id, &db.items);
            if doomed.len() > 1 && !cascade {
                eprintln!(
                    "Task {task_id} has {} descendant(s). Use --cascade to delete all.",
                    doomed.len() - 1
                );
                std::process::exit(1);
            }
            let removed = resolve_or_exit(db.delete_item(task_id, actor_id));
            save_or_exit(db, db_path);
            println!("Deleted {removed} item(s).");
        }
    }
}

// ---------------------------------------------------------------------------
// Project and tag commands
// ---------------------------------------------------------------------------

pub fn cmd_project(db: &mut Database, db_path: &Path, actor: Option<String>, action: ProjectAction) {
    let actor_id = resolve_or_exit(resolve_actor(db, &actor));
    match action {
        ProjectAction::Add { name, code, status } => {
            let id = resolve_or_exit(db.add_project(
                &name,
                code.as_deref().unwrap_or(""),
                status.as_deref().unwrap_or(""),
                actor_id,
            ));
            save_or_exit(db, db_path);
            println!("Added project {id}");
        }
        ProjectAction::List => {
            println!("{:<5} {:<24} {:<12} {:<12} {}", "ID", "Name", "Code", "Status", "WPs");
            for p in &db.projects {
                let wp_count = db
                    .items
                    .iter()
                    .filter_map(|i| i.as_work_package())
                    .filter(|wp| wp.project_id == Some(p.id))
                    .count();
                println!(
                    "{:<5} {:<24} {:<12} {:<12} {}",
                    p.id,
                    truncate(&p.name, 24),
                    truncate(&p.code, 12),
                    truncate(&p.status, 12),
                    wp_count
                );
            }
        }
        ProjectAction::Remove { project } => {
            let project_id = resolve_or_exit(resolve_project_identifier(&project, db));
            resolve_or_exit(db.delete_project(project_id, actor_id));
            save_or_exit(db, db_path);
            println!("Removed project {project_id}");
        }
    }
}

pub fn cmd_tag(db: &mut Database, db_path: &Path, actor: Option<String>, action: TagAction) {
    let actor_id = resolve_or_exit(resolve_actor(db, &actor));
    match action {
        TagAction::Add { name } => {
            let id = resolve_or_exit(db.add_tag(&name, actor_id));
            save_or_exit(db, db_path);
            println!("Added tag {id}");
        }
        TagAction::List => {
            println!("{:<5} {:<16} {}", "ID", "Tag", "Count");
            for tag in &db.tags {
                let count = db
                    .items
                    .iter()
                    .filter_map(|i| i.as_task())
                    .filter(|t| t.tag_ids.contains(&tag.id))
                    .count();
                println!("{:<5} {:<16} {}", tag.id, truncate(&tag.name, 16), count);
            }
        }
        TagAction::Remove { tag } => {
            let tag_id = resolve_or_exit(resolve_tag_identifier(&tag, db));
            resolve_or_exit(db.delete_tag(tag_id, actor_id));
            save_or_exit(db, db_path);
            println!("Removed tag {tag_id}");
        }
    }
}

// ---------------------------------------------------------------------------
// Perspectives
// ---------------------------------------------------------------------------

/// The actor's inbox: their unfiled tasks plus everything in their Inbox
/// work package.
pub fn cmd_inbox(db: &Database, actor: Option<String>) {
    let actor_id = resolve_or_exit(resolve_actor(db, &actor));
    let inbox_wp = db.inbox_id(actor_id);
    let visible = visible_items_for_user(actor_id, &db.items);
    let tasks: Vec<&Task> = visible
        .iter()
        .filter_map(|i| i.as_task())
        .filter(|t| {
            if matches!(t.status, TaskStatus::Completed | TaskStatus::Dropped) {
                return false;
            }
            match t.work_package_id {
                None => t.creator_id == actor_id,
                Some(w) => Some(w) == inbox_wp,
            }
        })
        .collect();
    print_task_table(db, &tasks, None);
}

/// Every flagged item the actor can see, both kinds mixed.
pub fn cmd_flagged(db: &Database, actor: Option<String>) {
    let actor_id = resolve_or_exit(resolve_actor(db, &actor));
    let visible = visible_items_for_user(actor_id, &db.items);
    println!("{:<5} {:<12} {:<11} {}", "ID", "Kind", "Status", "Title");
    for item in visible.iter().filter(|i| i.flagged()) {
        let status = match item {
            Item::Task(t) => format_task_status(t.status),
            Item::WorkPackage(wp) => format_wp_status(wp.status),
        };
        println!("{:<5} {:<12} {:<11} {}", item.id(), item.kind_name(), status, item.title());
    }
}

/// Recent audit entries, newest first.
pub fn cmd_log(db: &Database, limit: usize) {
    println!("{:<21} {:<7} {:<14} {}", "Timestamp", "Action", "By", "Details");
    for entry in db.logs.iter().rev().take(limit) {
        let ts = Utc
            .timestamp_opt(entry.timestamp_utc, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<21} {:<7} {:<14} {}",
            ts,
            format_log_action(entry.action),
            truncate(&db.person_name(Some(entry.user_id)), 14),
            entry.details
        );
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;

    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

// ---------------------------------------------------------------------------
// Table printing
// ---------------------------------------------------------------------------

fn person_list(db: &Database, ids: &BTreeSet<u64>) -> String {
    if ids.is_empty() {
        return "-".into();
    }
    ids.iter()
        .map(|&id| db.person_name(Some(id)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn tag_list(db: &Database, ids: &BTreeSet<u64>) -> String {
    if ids.is_empty() {
        return "-".into();
    }
    ids.iter()
        .map(|id| {
            db.tags
                .iter()
                .find(|t| t.id == *id)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| format!("#{id}"))
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Print tasks in a formatted table with optional tree indentation.
pub fn print_task_table(db: &Database, tasks: &[&Task], id_to_depth: Option<&HashMap<u64, usize>>) {
    println!(
        "{:<5} {:<11} {:<10} {:<14} {:<12} {}",
        "ID", "Status", "Due", "WP", "Assignee", "Title [tags]"
    );
    let today = Local::now().date_naive();
    for t in tasks {
        let indent = id_to_depth.and_then(|m| m.get(&t.id).copied()).unwrap_or(0);
        let indent_str = "  ".repeat(indent);
        let tags = if t.tag_ids.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tag_list(db, &t.tag_ids))
        };
        let wp_title = t
            .work_package_id
            .and_then(|w| db.work_package(w))
            .map(|w| w.title.clone())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<5} {:<11} {:<10} {:<14} {:<12} {}{}{}",
            t.id,
            format_task_status(t.status),
            format_date_relative(t.due, today),
            truncate(&wp_title, 14),
            truncate(&db.person_name(t.assignee_id), 12),
            indent_str,
            t.title,
            tags
        );
    }
}

/// Print work packages in a formatted table with optional tree indentation.
pub fn print_wp_table(db: &Database, wps: &[&WorkPackage], id_to_depth: Option<&HashMap<u64, usize>>) {
    println!(
        "{:<5} {:<11} {:<14} {:<10} {:<14} {}",
        "ID", "Status", "Accountable", "Deadline", "Project", "Title"
    );
    let today = Local::now().date_naive();
    for wp in wps {
        let indent = id_to_depth.and_then(|m| m.get(&wp.id).copied()).unwrap_or(0);
        let indent_str = "  ".repeat(indent);
        let project = wp
            .project_id
            .and_then(|pid| db.projects.iter().find(|p| p.id == pid))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<5} {:<11} {:<14} {:<10} {:<14} {}{}",
            wp.id,
            format_wp_status(wp.status),
            truncate(&db.person_name(wp.accountable), 14),
            format_date_relative(wp.planned_deadline, today),
            truncate(&project, 14),
            indent_str,
            wp.title
        );
    }
}

/// Map of parent task IDs to their children's IDs.
fn task_children_map(db: &Database) -> BTreeMap<u64, Vec<u64>> {
    let mut map: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for t in db.items.iter().filter_map(|i| i.as_task()) {
        if let Some(p) = t.parent_id {
            map.entry(p).or_default().push(t.id);
        }
    }
    for v in map.values_mut() {
        v.sort_unstable();
    }
    map
}
