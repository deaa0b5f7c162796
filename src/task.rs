/*
 *  Copyright 2026 Sluice Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! In-memory task domain types. The Task Store persists these through
//! [`crate::models::task_row::TaskRow`]; this module holds the shapes that
//! the runner and executor actually reason about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::Operation;
use crate::ref_key::Ref;

/// Task lifecycle state. Transitions are monotonic except `pending<->running`
/// (claim / fail-rollback) and `new->pending` when a blocking task completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    New,
    Pending,
    Running,
    AwaitingChildren,
    Completed,
    Failed,
    Paused,
    Cancelled,
}

impl TaskState {
    /// String vocabulary stored in the `tasks.state` column. Kept in one
    /// place so no other code constructs the DB string literal directly.
    pub fn as_db_str(self) -> &'static str {
        match self {
            TaskState::New => "new",
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::AwaitingChildren => "awaiting_children",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Paused => "paused",
            TaskState::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "new" => TaskState::New,
            "pending" => TaskState::Pending,
            "running" => TaskState::Running,
            "awaiting_children" => TaskState::AwaitingChildren,
            "completed" => TaskState::Completed,
            "failed" => TaskState::Failed,
            "paused" => TaskState::Paused,
            "cancelled" => TaskState::Cancelled,
            other => panic!("unknown task state in storage: {other}"),
        }
    }

    /// `completed`, `failed`, and `cancelled` are terminal for the purposes
    /// of parent-completeness and `hasActiveTasks` accounting.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }

    pub fn is_active(self) -> bool {
        matches!(
            self,
            TaskState::New | TaskState::Pending | TaskState::Running | TaskState::AwaitingChildren
        )
    }
}

/// What a task actually does when dispatched. Represented as a tagged
/// union with a single discriminator (the enum variant) rather than
/// per-payload virtual dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskPayload {
    /// One plan step, targeting a concrete ref or an entity type.
    SyncStep {
        target: SyncStepTarget,
        op: Operation,
        /// Set only on a continuation task re-querying the next page.
        cursor: Option<String>,
    },
    /// Synthetic: owns children, never executes itself.
    SyncGroup,
    /// Directly load fields for a concrete list of refs (no re-query).
    LoadFields { refs: Vec<Ref>, fields: Vec<String> },
    /// Load one page of a collection field for a single parent ref.
    LoadCollection {
        parent: Ref,
        field: String,
        cursor: Option<String>,
    },
}

/// What a `sync-step` targets: a concrete ref, or every entity of a type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncStepTarget {
    Ref(Ref),
    AllOfType(String),
}

/// A fully materialised task as the runner/executor see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub sync_id: String,
    pub state: TaskState,
    pub payload: TaskPayload,
    pub parent_id: Option<String>,
    pub blocked_by: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// A reference to another task within (or outside) the batch being
/// enqueued: either a temp id assigned to a sibling template in the same
/// call, or the real, already-persisted id of a task created earlier (e.g.
/// the parent a runner loop is attaching fresh children to).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskRef {
    Temp(String),
    Real(String),
}

/// A not-yet-persisted task, referencing siblings by a caller-chosen
/// temporary id rather than a real store-assigned one. Used by
/// `enqueueGraph` to insert a whole task graph atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub temp_id: String,
    pub state: TaskState,
    pub payload: TaskPayload,
    pub parent: Option<TaskRef>,
    pub blocked_by: Option<TaskRef>,
    pub not_before: Option<DateTime<Utc>>,
}

impl TaskTemplate {
    pub fn new(temp_id: impl Into<String>, state: TaskState, payload: TaskPayload) -> Self {
        Self {
            temp_id: temp_id.into(),
            state,
            payload,
            parent: None,
            blocked_by: None,
            not_before: None,
        }
    }

    pub fn with_parent(mut self, parent: TaskRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_blocked_by(mut self, blocked_by: TaskRef) -> Self {
        self.blocked_by = Some(blocked_by);
        self
    }

    pub fn with_not_before(mut self, at: DateTime<Utc>) -> Self {
        self.not_before = Some(at);
        self
    }
}

/// Result of running one task: zero-or-more child templates to enqueue
/// under the task once it's moved to `awaiting_children` (or none, in
/// which case the task completes immediately).
#[derive(Debug, Clone, Default)]
pub struct TaskRunResult {
    pub children: Vec<TaskTemplate>,
}

impl TaskRunResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_children(children: Vec<TaskTemplate>) -> Self {
        Self { children }
    }
}
