//! Item data structures and the people they involve.
//!
//! The central type is [`Item`], a closed two-variant union of [`Task`] and
//! [`WorkPackage`]. Both variants share a base shape (id, creator, title,
//! note, flag, timestamps); everything role- or schedule-specific lives in
//! the variant payload, so no field-presence checks are ever needed.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fields::{LogAction, TaskStatus, WorkPackageStatus};

/// A member of the team. Identity unit for every role and assignment field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
}

/// A named label tasks can carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

/// A lightweight project record work packages can be filed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub creator_id: u64,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub status: String,
}

/// Why a task is blocked and who reported it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockageDetails {
    pub reporter_id: u64,
    pub details: String,
    pub created_at_utc: i64,
}

/// An actionable unit of work, filed under a work package or unfiled.
///
/// Subtask nesting runs through `parent_id` and is independent of the
/// work-package tree; a subtask's `work_package_id` always follows its
/// parent task's (kept consistent by propagation, not by construction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub creator_id: u64,
    pub title: String,
    #[serde(default)]
    pub note: String,
    pub work_package_id: Option<u64>,
    pub parent_id: Option<u64>,
    pub status: TaskStatus,
    pub assignee_id: Option<u64>,
    #[serde(default)]
    pub collaborator_ids: BTreeSet<u64>,
    #[serde(default)]
    pub tag_ids: BTreeSet<u64>,
    pub due: Option<NaiveDate>,
    pub defer: Option<NaiveDate>,
    pub estimate_minutes: Option<u32>,
    pub completed_at_utc: Option<i64>,
    #[serde(default)]
    pub blockage: Option<BlockageDetails>,
    #[serde(default)]
    pub timer_started_at_utc: Option<i64>,
    #[serde(default)]
    pub accumulated_seconds: u64,
    #[serde(default)]
    pub flagged: bool,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl Task {
    /// Create an unfiled, unassigned active task.
    pub fn new(id: u64, creator_id: u64, title: impl Into<String>, now_utc: i64) -> Self {
        Task {
            id,
            creator_id,
            title: title.into(),
            note: String::new(),
            work_package_id: None,
            parent_id: None,
            status: TaskStatus::Active,
            assignee_id: None,
            collaborator_ids: BTreeSet::new(),
            tag_ids: BTreeSet::new(),
            due: None,
            defer: None,
            estimate_minutes: None,
            completed_at_utc: None,
            blockage: None,
            timer_started_at_utc: None,
            accumulated_seconds: 0,
            flagged: false,
            created_at_utc: now_utc,
            updated_at_utc: now_utc,
        }
    }
}

/// A project/initiative container carrying the RACI role matrix,
/// optionally nested under another work package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkPackage {
    pub id: u64,
    pub creator_id: u64,
    pub title: String,
    #[serde(default)]
    pub note: String,
    pub parent_id: Option<u64>,
    pub status: WorkPackageStatus,
    pub completed_at_utc: Option<i64>,
    #[serde(default)]
    pub responsible: BTreeSet<u64>,
    pub accountable: Option<u64>,
    #[serde(default)]
    pub consulted: BTreeSet<u64>,
    #[serde(default)]
    pub informed: BTreeSet<u64>,
    pub planned_deadline: Option<NaiveDate>,
    pub project_id: Option<u64>,
    #[serde(default)]
    pub flagged: bool,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

impl WorkPackage {
    /// Create an active work package with no roles assigned.
    pub fn new(id: u64, creator_id: u64, title: impl Into<String>, now_utc: i64) -> Self {
        WorkPackage {
            id,
            creator_id,
            title: title.into(),
            note: String::new(),
            parent_id: None,
            status: WorkPackageStatus::Active,
            completed_at_utc: None,
            responsible: BTreeSet::new(),
            accountable: None,
            consulted: BTreeSet::new(),
            informed: BTreeSet::new(),
            planned_deadline: None,
            project_id: None,
            flagged: false,
            created_at_utc: now_utc,
            updated_at_utc: now_utc,
        }
    }

    // RACI membership predicates. The permission evaluator's correctness
    // depends on reading exactly these four fields, so they are the only
    // role accessors anything else goes through.

    pub fn is_accountable(&self, person_id: u64) -> bool {
        self.accountable == Some(person_id)
    }

    pub fn is_responsible(&self, person_id: u64) -> bool {
        self.responsible.contains(&person_id)
    }

    pub fn is_consulted(&self, person_id: u64) -> bool {
        self.consulted.contains(&person_id)
    }

    pub fn is_informed(&self, person_id: u64) -> bool {
        self.informed.contains(&person_id)
    }
}

/// A task or a work package. The discriminant is serialized as `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Item {
    Task(Task),
    WorkPackage(WorkPackage),
}

impl Item {
    pub fn id(&self) -> u64 {
        match self {
            Item::Task(t) => t.id,
            Item::WorkPackage(wp) => wp.id,
        }
    }

    pub fn creator_id(&self) -> u64 {
        match self {
            Item::Task(t) => t.creator_id,
            Item::WorkPackage(wp) => wp.creator_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Item::Task(t) => &t.title,
            Item::WorkPackage(wp) => &wp.title,
        }
    }

    /// Parent edge inside the item's own tree (task tree or work-package tree).
    pub fn parent_id(&self) -> Option<u64> {
        match self {
            Item::Task(t) => t.parent_id,
            Item::WorkPackage(wp) => wp.parent_id,
        }
    }

    pub fn flagged(&self) -> bool {
        match self {
            Item::Task(t) => t.flagged,
            Item::WorkPackage(wp) => wp.flagged,
        }
    }

    pub fn updated_at_utc(&self) -> i64 {
        match self {
            Item::Task(t) => t.updated_at_utc,
            Item::WorkPackage(wp) => wp.updated_at_utc,
        }
    }

    pub fn set_updated_at(&mut self, now_utc: i64) {
        match self {
            Item::Task(t) => t.updated_at_utc = now_utc,
            Item::WorkPackage(wp) => wp.updated_at_utc = now_utc,
        }
    }

    pub fn as_task(&self) -> Option<&Task> {
        match self {
            Item::Task(t) => Some(t),
            Item::WorkPackage(_) => None,
        }
    }

    pub fn as_work_package(&self) -> Option<&WorkPackage> {
        match self {
            Item::Task(_) => None,
            Item::WorkPackage(wp) => Some(wp),
        }
    }

    /// Discriminant name used in tables and audit entries.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Item::Task(_) => "Task",
            Item::WorkPackage(_) => "WorkPackage",
        }
    }
}

/// One audit record. Every mutation the store applies writes exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp_utc: i64,
    pub user_id: u64,
    pub action: LogAction,
    pub details: String,
    pub target_id: Option<u64>,
    pub target_type: Option<String>,
}
