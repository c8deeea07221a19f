//! The document store and its mutation layer.
//!
//! `Database` owns the full team snapshot (items, persons, tags, projects,
//! audit log) and is the sole mutator. Every mutation goes through one of
//! the methods here, which pre-check edit rights, reject cycle-creating
//! reparents, keep derived fields consistent (work-package propagation,
//! cascade deletes, role scrubbing) and write exactly one audit entry.
//!
//! Pure computations never happen mid-mutation against a shifting list:
//! id sets are built first over the current snapshot, then applied in a
//! single pass.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{LogAction, TaskStatus};
use crate::graph::{compute_cascade_delete_set, creates_cycle, propagate_work_package_id};
use crate::item::{BlockageDetails, Item, LogEntry, Person, Project, Tag, Task, WorkPackage};
use crate::permissions::can_edit_item;

/// In-memory image of the whole store, serialized as one JSON document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl Database {
    /// Load the store from a JSON file, starting fresh if it is missing
    /// or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Database::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("Error parsing store, starting fresh: {e}");
                    Database::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading store, starting fresh: {e}");
                Database::default()
            }
        }
    }

    /// Save the store to a JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).unwrap();
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    pub fn next_item_id(&self) -> u64 {
        self.items.iter().map(Item::id).max().unwrap_or(0) + 1
    }

    pub fn next_person_id(&self) -> u64 {
        self.persons.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    pub fn next_tag_id(&self) -> u64 {
        self.tags.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    pub fn next_project_id(&self) -> u64 {
        self.projects.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    fn next_log_id(&self) -> u64 {
        self.logs.iter().map(|l| l.id).max().unwrap_or(0) + 1
    }

    pub fn item(&self, id: u64) -> Option<&Item> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn item_mut(&mut self, id: u64) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id() == id)
    }

    pub fn task(&self, id: u64) -> Option<&Task> {
        self.item(id).and_then(|i| i.as_task())
    }

    pub fn work_package(&self, id: u64) -> Option<&WorkPackage> {
        self.item(id).and_then(|i| i.as_work_package())
    }

    pub fn person(&self, id: u64) -> Option<&Person> {
        self.persons.iter().find(|p| p.id == id)
    }

    /// Display name for an optional person reference.
    pub fn person_name(&self, id: Option<u64>) -> String {
        match id {
            None => "-".into(),
            Some(id) => match self.person(id) {
                Some(p) => p.name.clone(),
                None => format!("#{id}"),
            },
        }
    }

    fn log(&mut self, user_id: u64, action: LogAction, details: String, target_id: Option<u64>, target_type: &str) {
        let entry = LogEntry {
            id: self.next_log_id(),
            timestamp_utc: Utc::now().timestamp(),
            user_id,
            action,
            details,
            target_id,
            target_type: Some(target_type.to_string()),
        };
        self.logs.push(entry);
    }

    /// Insert or replace an item on behalf of `actor_id`.
    ///
    /// Refuses when the actor lacks edit rights on the existing item or
    /// when the item's parent lies in its own descendant set. On success
    /// the item is stamped, task work-package ids are re-propagated, and
    /// one audit entry is written.
    pub fn upsert_item(&mut self, mut item: Item, actor_id: u64) -> Result<u64, String> {
        let now_utc = Utc::now().timestamp();
        let id = item.id();

        let is_update = match self.item(id) {
            Some(existing) => {
                if !can_edit_item(existing, actor_id, &self.items) {
                    return Err(format!(
                        "You don't have permission to edit {} {}.",
                        existing.kind_name(),
                        id
                    ));
                }
                true
            }
            None => false,
        };

        if let Some(parent_id) = item.parent_id() {
            if creates_cycle(id, parent_id, &self.items) {
                return Err(format!(
                    "Cannot make item {id} a child of {parent_id}: it would become its own ancestor."
                ));
            }
        }

        item.set_updated_at(now_utc);
        let title = item.title().to_string();
        let kind = item.kind_name();
        let is_task = item.as_task().is_some();

        if is_update {
            if let Some(slot) = self.item_mut(id) {
                *slot = item;
            }
        } else {
            self.items.push(item);
        }

        // Subtask trees inherit the work package of their root ancestor;
        // compute the patch set against the settled snapshot, then apply.
        if is_task {
            let patches = propagate_work_package_id(id, &self.items);
            for patch in patches {
                let patch_id = patch.id();
                if let Some(slot) = self.item_mut(patch_id) {
                    *slot = patch;
                }
            }
        }

        let (action, verb) = if is_update {
            (LogAction::Update, "Updated")
        } else {
            (LogAction::Create, "Created")
        };
        self.log(actor_id, action, format!("{verb} {kind}: \"{title}\""), Some(id), kind);
        Ok(id)
    }

    /// Delete an item together with its full cascade set, atomically.
    /// Returns how many items were removed.
    pub fn delete_item(&mut self, id: u64, actor_id: u64) -> Result<usize, String> {
        let Some(item) = self.item(id) else {
            return Err(format!("Item {id} not found."));
        };
        if !can_edit_item(item, actor_id, &self.items) {
            return Err(format!(
                "You don't have permission to delete {} {}.",
                item.kind_name(),
                id
            ));
        }
        let title = item.title().to_string();
        let kind = item.kind_name();

        // Build the full id set first, then filter once.
        let doomed = compute_cascade_delete_set(id, &self.items);
        self.items.retain(|i| !doomed.contains(&i.id()));

        self.log(
            actor_id,
            LogAction::Delete,
            format!("Deleted {kind}: \"{title}\" and {} descendant(s)", doomed.len() - 1),
            Some(id),
            kind,
        );
        Ok(doomed.len())
    }

    /// Mark a task blocked, recording who reported it and why.
    pub fn block_task(&mut self, task_id: u64, reporter_id: u64, details: String) -> Result<(), String> {
        let Some(item) = self.item(task_id) else {
            return Err(format!("Item {task_id} not found."));
        };
        if item.as_task().is_none() {
            return Err(format!("Item {task_id} is not a task."));
        }
        if !can_edit_item(item, reporter_id, &self.items) {
            return Err(format!("You don't have permission to edit Task {task_id}."));
        }
        let now_utc = Utc::now().timestamp();
        let title = item.title().to_string();
        if let Some(Item::Task(task)) = self.item_mut(task_id) {
            task.status = TaskStatus::Blocked;
            task.blockage = Some(BlockageDetails {
                reporter_id,
                details: details.clone(),
                created_at_utc: now_utc,
            });
            task.updated_at_utc = now_utc;
        }
        self.log(
            reporter_id,
            LogAction::Block,
            format!("Blocked Task: \"{title}\" ({details})"),
            Some(task_id),
            "Task",
        );
        Ok(())
    }

    /// The id of `user_id`'s Inbox work package, if it exists yet.
    pub fn inbox_id(&self, user_id: u64) -> Option<u64> {
        self.items.iter().find_map(|i| match i {
            Item::WorkPackage(wp) if wp.title == "Inbox" && wp.creator_id == user_id => Some(wp.id),
            _ => None,
        })
    }

    /// Each person gets exactly one "Inbox" work package, created on
    /// first use. It carries no roles and never shows up in pickers.
    pub fn ensure_inbox(&mut self, user_id: u64) -> u64 {
        if let Some(id) = self.inbox_id(user_id) {
            return id;
        }
        let now_utc = Utc::now().timestamp();
        let id = self.next_item_id();
        let mut wp = WorkPackage::new(id, user_id, "Inbox", now_utc);
        wp.note = "Captured tasks live here until they are filed.".into();
        self.items.push(Item::WorkPackage(wp));
        self.log(
            user_id,
            LogAction::Create,
            "Created WorkPackage: \"Inbox\"".into(),
            Some(id),
            "WorkPackage",
        );
        id
    }

    /// Insert or replace a person record.
    pub fn upsert_person(&mut self, person: Person, actor_id: u64) -> u64 {
        let id = person.id;
        let name = person.name.clone();
        let is_update = match self.persons.iter_mut().find(|p| p.id == id) {
            Some(slot) => {
                *slot = person;
                true
            }
            None => {
                self.persons.push(person);
                false
            }
        };
        let (action, verb) = if is_update {
            (LogAction::Update, "Updated")
        } else {
            (LogAction::Create, "Created")
        };
        self.log(actor_id, action, format!("{verb} Person: \"{name}\""), Some(id), "Person");
        id
    }

    /// Remove a person and scrub every role reference so no item keeps
    /// pointing at them. Creator ids are history and stay.
    pub fn delete_person(&mut self, person_id: u64, actor_id: u64) -> Result<(), String> {
        let Some(pos) = self.persons.iter().position(|p| p.id == person_id) else {
            return Err(format!("Person {person_id} not found."));
        };
        let name = self.persons.remove(pos).name;

        for item in self.items.iter_mut() {
            match item {
                Item::WorkPackage(wp) => {
                    if wp.accountable == Some(person_id) {
                        wp.accountable = None;
                    }
                    wp.responsible.remove(&person_id);
                    wp.consulted.remove(&person_id);
                    wp.informed.remove(&person_id);
                }
                Item::Task(task) => {
                    if task.assignee_id == Some(person_id) {
                        task.assignee_id = None;
                    }
                    task.collaborator_ids.remove(&person_id);
                }
            }
        }

        self.log(
            actor_id,
            LogAction::Delete,
            format!("Deleted Person: \"{name}\""),
            Some(person_id),
            "Person",
        );
        Ok(())
    }

    /// Create a tag, refusing duplicates by name.
    pub fn add_tag(&mut self, name: &str, actor_id: u64) -> Result<u64, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Tag name cannot be empty.".into());
        }
        if self.tags.iter().any(|t| t.name == name) {
            return Err(format!("Tag '{name}' already exists."));
        }
        let id = self.next_tag_id();
        self.tags.push(Tag { id, name: name.to_string() });
        self.log(actor_id, LogAction::Create, format!("Created Tag: \"{name}\""), Some(id), "Tag");
        Ok(id)
    }

    /// Remove a tag and scrub it from every task.
    pub fn delete_tag(&mut self, tag_id: u64, actor_id: u64) -> Result<(), String> {
        let Some(pos) = self.tags.iter().position(|t| t.id == tag_id) else {
            return Err(format!("Tag {tag_id} not found."));
        };
        let name = self.tags.remove(pos).name;
        for item in self.items.iter_mut() {
            if let Item::Task(task) = item {
                task.tag_ids.remove(&tag_id);
            }
        }
        self.log(actor_id, LogAction::Delete, format!("Deleted Tag: \"{name}\""), Some(tag_id), "Tag");
        Ok(())
    }

    /// Create a project record.
    pub fn add_project(&mut self, name: &str, code: &str, status: &str, actor_id: u64) -> Result<u64, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Project name cannot be empty.".into());
        }
        if self.projects.iter().any(|p| p.name == name) {
            return Err(format!("Project '{name}' already exists."));
        }
        let id = self.next_project_id();
        self.projects.push(Project {
            id,
            creator_id: actor_id,
            name: name.to_string(),
            code: code.to_string(),
            status: status.to_string(),
        });
        self.log(actor_id, LogAction::Create, format!("Created Project: \"{name}\""), Some(id), "Project");
        Ok(id)
    }

    /// Remove a project; work packages filed under it become unfiled.
    pub fn delete_project(&mut self, project_id: u64, actor_id: u64) -> Result<(), String> {
        let Some(pos) = self.projects.iter().position(|p| p.id == project_id) else {
            return Err(format!("Project {project_id} not found."));
        };
        let name = self.projects.remove(pos).name;
        for item in self.items.iter_mut() {
            if let Item::WorkPackage(wp) = item {
                if wp.project_id == Some(project_id) {
                    wp.project_id = None;
                }
            }
        }
        self.log(
            actor_id,
            LogAction::Delete,
            format!("Deleted Project: \"{name}\""),
            Some(project_id),
            "Project",
        );
        Ok(())
    }
}

/// Parse human-readable date input.
///
/// Supports "today", "tomorrow", "eow"/"end of week", "in Nd"/"in Nw",
/// bare or "next"-prefixed weekday names, and YYYY-MM-DD.
pub fn parse_date_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_this_week(today);
            return Some(end);
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(n) = rest.strip_suffix('d') {
            if let Ok(days) = n.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(n) = rest.strip_suffix('w') {
            if let Ok(weeks) = n.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
    ];
    for (day_name, target_day) in weekdays {
        let current_day = today.weekday().num_days_from_monday() as i32;
        let days_ahead = (target_day + 7 - current_day) % 7;
        if s == day_name {
            return Some(today + Duration::days(days_ahead as i64));
        }
        if s == format!("next {day_name}") {
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add as i64));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Calculate the start and end dates of the current ISO week (Monday to Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    let end = start + Duration::days(6);
    (start, end)
}

/// Format a date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_date_relative(date: Option<NaiveDate>, today: NaiveDate) -> String {
    match date {
        None => "-".into(),
        Some(d) => {
            let delta = (d - today).num_days();
            if delta == 0 {
                "today".into()
            } else if delta == 1 {
                "tomorrow".into()
            } else if delta > 1 {
                format!("in {delta}d")
            } else {
                format!("{}d late", -delta)
            }
        }
    }
}

/// Format a task status for display.
pub fn format_task_status(s: TaskStatus) -> &'static str {
    match s {
        TaskStatus::Active => "Active",
        TaskStatus::Completed => "Completed",
        TaskStatus::Dropped => "Dropped",
        TaskStatus::OnGoing => "On-going",
        TaskStatus::Blocked => "Blocked",
    }
}

/// Format a work-package status for display.
pub fn format_wp_status(s: crate::fields::WorkPackageStatus) -> &'static str {
    use crate::fields::WorkPackageStatus::*;
    match s {
        Active => "Active",
        Completed => "Completed",
        Dropped => "Dropped",
    }
}

/// Format a log action for display.
pub fn format_log_action(a: LogAction) -> &'static str {
    match a {
        LogAction::Create => "CREATE",
        LogAction::Update => "UPDATE",
        LogAction::Delete => "DELETE",
        LogAction::Block => "BLOCK",
    }
}

/// Format accumulated tracked time as "1h 05m".
pub fn format_tracked(seconds: u64) -> String {
    if seconds == 0 {
        return "-".into();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::WorkPackageStatus;

    const ALICE: u64 = 1;
    const BOB: u64 = 2;
    const CAROL: u64 = 3;

    fn db_with_people() -> Database {
        let mut db = Database::default();
        for (id, name) in [(ALICE, "Alice"), (BOB, "Bob"), (CAROL, "Carol")] {
            db.persons.push(Person {
                id,
                name: name.into(),
                email: String::new(),
                mobile: String::new(),
            });
        }
        db
    }

    fn add_wp(db: &mut Database, creator: u64, title: &str) -> u64 {
        let id = db.next_item_id();
        db.upsert_item(Item::WorkPackage(WorkPackage::new(id, creator, title, 0)), creator)
            .unwrap();
        id
    }

    fn add_task(db: &mut Database, creator: u64, title: &str, wp: Option<u64>, parent: Option<u64>) -> u64 {
        let id = db.next_item_id();
        let mut t = Task::new(id, creator, title, 0);
        t.work_package_id = wp;
        t.parent_id = parent;
        db.upsert_item(Item::Task(t), creator).unwrap();
        id
    }

    #[test]
    fn upsert_stamps_updated_at_and_logs_once() {
        let mut db = db_with_people();
        let id = add_wp(&mut db, ALICE, "Phase 1");
        let before = db.item(id).unwrap().updated_at_utc();
        assert!(before > 0);
        assert_eq!(db.logs.len(), 1);
        assert_eq!(db.logs[0].action, LogAction::Create);
        assert_eq!(db.logs[0].target_id, Some(id));

        let mut wp = db.work_package(id).unwrap().clone();
        wp.note = "updated".into();
        db.upsert_item(Item::WorkPackage(wp), ALICE).unwrap();
        assert_eq!(db.logs.len(), 2);
        assert_eq!(db.logs[1].action, LogAction::Update);
    }

    #[test]
    fn upsert_refuses_actors_without_edit_rights() {
        let mut db = db_with_people();
        let id = add_wp(&mut db, ALICE, "Private");
        let mut wp = db.work_package(id).unwrap().clone();
        wp.title = "Hijacked".into();
        let err = db.upsert_item(Item::WorkPackage(wp), BOB).unwrap_err();
        assert!(err.contains("permission"));
        assert_eq!(db.work_package(id).unwrap().title, "Private");
    }

    #[test]
    fn informed_actor_cannot_edit_but_consulted_can() {
        let mut db = db_with_people();
        let id = add_wp(&mut db, ALICE, "Phase 1");
        let mut wp = db.work_package(id).unwrap().clone();
        wp.informed.insert(BOB);
        wp.consulted.insert(CAROL);
        db.upsert_item(Item::WorkPackage(wp), ALICE).unwrap();

        let mut attempt = db.work_package(id).unwrap().clone();
        attempt.note = "bob was here".into();
        assert!(db.upsert_item(Item::WorkPackage(attempt), BOB).is_err());

        let mut attempt = db.work_package(id).unwrap().clone();
        attempt.note = "carol was here".into();
        assert!(db.upsert_item(Item::WorkPackage(attempt), CAROL).is_ok());
    }

    #[test]
    fn reparent_into_own_subtree_is_rejected() {
        let mut db = db_with_people();
        let a = add_task(&mut db, ALICE, "a", None, None);
        let b = add_task(&mut db, ALICE, "b", None, Some(a));

        let mut t = db.task(a).unwrap().clone();
        t.parent_id = Some(b);
        let err = db.upsert_item(Item::Task(t), ALICE).unwrap_err();
        assert!(err.contains("ancestor"));
        assert_eq!(db.task(a).unwrap().parent_id, None);
    }

    #[test]
    fn upsert_propagates_work_package_to_descendants() {
        let mut db = db_with_people();
        let w1 = add_wp(&mut db, ALICE, "W1");
        let w2 = add_wp(&mut db, ALICE, "W2");
        let root = add_task(&mut db, ALICE, "root", Some(w1), None);
        let child = add_task(&mut db, ALICE, "child", Some(w1), Some(root));
        let grandchild = add_task(&mut db, ALICE, "grandchild", Some(w1), Some(child));

        // Refile the root task; the whole subtree follows.
        let mut t = db.task(root).unwrap().clone();
        t.work_package_id = Some(w2);
        db.upsert_item(Item::Task(t), ALICE).unwrap();

        assert_eq!(db.task(root).unwrap().work_package_id, Some(w2));
        assert_eq!(db.task(child).unwrap().work_package_id, Some(w2));
        assert_eq!(db.task(grandchild).unwrap().work_package_id, Some(w2));
    }

    #[test]
    fn upsert_forces_subtask_onto_parents_work_package() {
        let mut db = db_with_people();
        let w1 = add_wp(&mut db, ALICE, "W1");
        let w2 = add_wp(&mut db, ALICE, "W2");
        let parent = add_task(&mut db, ALICE, "parent", Some(w1), None);

        // Try to file a subtask under a different work package.
        let id = db.next_item_id();
        let mut t = Task::new(id, ALICE, "sub", 0);
        t.work_package_id = Some(w2);
        t.parent_id = Some(parent);
        db.upsert_item(Item::Task(t), ALICE).unwrap();
        assert_eq!(db.task(id).unwrap().work_package_id, Some(w1));
    }

    #[test]
    fn delete_cascades_across_both_edge_kinds_in_one_operation() {
        let mut db = db_with_people();
        let w1 = add_wp(&mut db, ALICE, "W1");
        let w2 = {
            let id = db.next_item_id();
            let mut wp = WorkPackage::new(id, ALICE, "W2", 0);
            wp.parent_id = Some(w1);
            db.upsert_item(Item::WorkPackage(wp), ALICE).unwrap();
            id
        };
        let t2 = add_task(&mut db, ALICE, "T2", Some(w2), None);
        let survivor = add_task(&mut db, ALICE, "elsewhere", None, None);
        let logs_before = db.logs.len();

        let removed = db.delete_item(w1, ALICE).unwrap();
        assert_eq!(removed, 3);
        assert!(db.item(w1).is_none());
        assert!(db.item(w2).is_none());
        assert!(db.item(t2).is_none());
        assert!(db.item(survivor).is_some());

        // Exactly one audit entry, naming the root and the cascade size.
        assert_eq!(db.logs.len(), logs_before + 1);
        let entry = db.logs.last().unwrap();
        assert_eq!(entry.action, LogAction::Delete);
        assert_eq!(entry.target_id, Some(w1));
        assert!(entry.details.contains("2 descendant(s)"));
    }

    #[test]
    fn delete_refuses_without_edit_rights() {
        let mut db = db_with_people();
        let id = add_wp(&mut db, ALICE, "Keep out");
        assert!(db.delete_item(id, BOB).is_err());
        assert!(db.item(id).is_some());
    }

    #[test]
    fn deleting_a_person_scrubs_all_role_references() {
        let mut db = db_with_people();
        let w = add_wp(&mut db, ALICE, "W");
        let mut wp = db.work_package(w).unwrap().clone();
        wp.accountable = Some(BOB);
        wp.responsible.insert(BOB);
        wp.consulted.insert(BOB);
        wp.informed.insert(BOB);
        db.upsert_item(Item::WorkPackage(wp), ALICE).unwrap();

        let t = add_task(&mut db, ALICE, "T", Some(w), None);
        let mut task = db.task(t).unwrap().clone();
        task.assignee_id = Some(BOB);
        task.collaborator_ids.insert(BOB);
        db.upsert_item(Item::Task(task), ALICE).unwrap();

        db.delete_person(BOB, ALICE).unwrap();

        let wp = db.work_package(w).unwrap();
        assert_eq!(wp.accountable, None);
        assert!(!wp.responsible.contains(&BOB));
        assert!(!wp.consulted.contains(&BOB));
        assert!(!wp.informed.contains(&BOB));
        let task = db.task(t).unwrap();
        assert_eq!(task.assignee_id, None);
        assert!(!task.collaborator_ids.contains(&BOB));
        // Creator ids are history and stay.
        assert_eq!(db.work_package(w).unwrap().creator_id, ALICE);
    }

    #[test]
    fn deleting_a_tag_scrubs_task_references() {
        let mut db = db_with_people();
        let tag = db.add_tag("design", ALICE).unwrap();
        let t = add_task(&mut db, ALICE, "T", None, None);
        let mut task = db.task(t).unwrap().clone();
        task.tag_ids.insert(tag);
        db.upsert_item(Item::Task(task), ALICE).unwrap();

        db.delete_tag(tag, ALICE).unwrap();
        assert!(db.task(t).unwrap().tag_ids.is_empty());
        assert!(db.tags.is_empty());
    }

    #[test]
    fn deleting_a_project_unfiles_its_work_packages() {
        let mut db = db_with_people();
        let project = db.add_project("Redesign", "MAR", "active", ALICE).unwrap();
        let w = add_wp(&mut db, ALICE, "W");
        let mut wp = db.work_package(w).unwrap().clone();
        wp.project_id = Some(project);
        db.upsert_item(Item::WorkPackage(wp), ALICE).unwrap();

        db.delete_project(project, ALICE).unwrap();
        assert_eq!(db.work_package(w).unwrap().project_id, None);
    }

    #[test]
    fn inbox_is_created_lazily_and_only_once_per_person() {
        let mut db = db_with_people();
        assert_eq!(db.inbox_id(ALICE), None);
        let first = db.ensure_inbox(ALICE);
        let second = db.ensure_inbox(ALICE);
        assert_eq!(first, second);
        assert_eq!(db.inbox_id(ALICE), Some(first));

        // A second person gets their own.
        let bobs = db.ensure_inbox(BOB);
        assert_ne!(bobs, first);
        let wp = db.work_package(bobs).unwrap();
        assert_eq!(wp.title, "Inbox");
        assert_eq!(wp.creator_id, BOB);
    }

    #[test]
    fn block_task_sets_status_details_and_audit_action() {
        let mut db = db_with_people();
        let t = add_task(&mut db, ALICE, "T", None, None);
        db.block_task(t, ALICE, "waiting on hardware".into()).unwrap();

        let task = db.task(t).unwrap();
        assert_eq!(task.status, TaskStatus::Blocked);
        let blockage = task.blockage.as_ref().unwrap();
        assert_eq!(blockage.reporter_id, ALICE);
        assert_eq!(blockage.details, "waiting on hardware");
        assert_eq!(db.logs.last().unwrap().action, LogAction::Block);
    }

    #[test]
    fn block_task_refuses_outsiders() {
        let mut db = db_with_people();
        let t = add_task(&mut db, ALICE, "T", None, None);
        assert!(db.block_task(t, CAROL, "nope".into()).is_err());
        assert_eq!(db.task(t).unwrap().status, TaskStatus::Active);
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut db = db_with_people();
        let w = add_wp(&mut db, ALICE, "W");
        add_task(&mut db, ALICE, "T", Some(w), None);

        let dir = std::env::temp_dir().join("wpm-db-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("team.json");
        db.save(&path).unwrap();

        let reloaded = Database::load(&path);
        assert_eq!(reloaded.items.len(), db.items.len());
        assert_eq!(reloaded.persons.len(), 3);
        assert_eq!(reloaded.logs.len(), db.logs.len());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn status_enums_serialize_kebab_case() {
        // WorkPackageStatus is a strict subset of TaskStatus on purpose.
        let wp_json = serde_json::to_string(&WorkPackageStatus::Dropped).unwrap();
        assert_eq!(wp_json, "\"dropped\"");
        let task_json = serde_json::to_string(&TaskStatus::OnGoing).unwrap();
        assert_eq!(task_json, "\"on-going\"");
    }
}
