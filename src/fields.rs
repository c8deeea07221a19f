//! Enumerations and field types for the item model.
//!
//! This module defines the structured value types shared across tasks,
//! work packages and the audit log.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Active,
    Completed,
    Dropped,
    OnGoing,
    Blocked,
}

/// Lifecycle status of a work package.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WorkPackageStatus {
    Active,
    Completed,
    Dropped,
}

/// Kind of mutation recorded in the audit log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogAction {
    Create,
    Update,
    Delete,
    Block,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Due,
    Id,
    Updated,
}

/// Filtering options for tasks based on due dates.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DueFilter {
    Today,
    ThisWeek,
    Overdue,
    None,
}
