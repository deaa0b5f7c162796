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

//! Sync Executor: converts a `SyncPlan` into a task graph, drives
//! concurrent claim/execute loops, cascades completion up parent chains,
//! and publishes a `SyncHandle`.

use std::collections::HashMap;
use std::pin::Pin;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::dal::TaskStore;
use crate::error::StoreError;
use crate::executor::sync_handle::SyncHandle;
use crate::plan::{Step, SyncPlan};
use crate::runner::TaskRunner;
use crate::task::{SyncStepTarget, Task, TaskPayload, TaskRef, TaskState, TaskTemplate};

pub struct SyncExecutor {
    task_store: Arc<dyn TaskStore>,
    runner: Arc<TaskRunner>,
    config: EngineConfig,
    handles: Mutex<HashMap<String, Arc<SyncHandle>>>,
}

impl SyncExecutor {
    pub fn new(task_store: Arc<dyn TaskStore>, runner: Arc<TaskRunner>, config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            task_store,
            runner,
            config,
            handles: Mutex::new(HashMap::new()),
        })
    }

    pub fn list(&self) -> Vec<Arc<SyncHandle>> {
        self.handles.lock().values().cloned().collect()
    }

    pub fn get(&self, sync_id: &str) -> Option<Arc<SyncHandle>> {
        self.handles.lock().get(sync_id).cloned()
    }

    /// Materialises `plan` as a task graph, enqueues it atomically, and
    /// spawns `config.runner_loops` concurrent claim/execute loops.
    pub async fn execute(self: &Arc<Self>, plan: SyncPlan) -> Result<Arc<SyncHandle>, StoreError> {
        let sync_id = Uuid::new_v4().to_string();
        let templates = materialize_plan(&plan);
        info!(sync_id = %sync_id, tasks = templates.len(), "materialised sync plan");
        self.task_store.enqueue_graph(&sync_id, templates).await?;

        let handle = SyncHandle::new(sync_id.clone(), plan, self.task_store.clone());
        self.handles.lock().insert(sync_id.clone(), handle.clone());

        let executor = self.clone();
        let driven_handle = handle.clone();
        tokio::spawn(async move {
            executor.drive(driven_handle).await;
        });

        Ok(handle)
    }

    async fn drive(self: Arc<Self>, handle: Arc<SyncHandle>) {
        let mut loops = Vec::with_capacity(self.config.runner_loops);
        for i in 0..self.config.runner_loops {
            let task_store = self.task_store.clone();
            let runner = self.runner.clone();
            let handle = handle.clone();
            let claim_backoff = self.config.claim_backoff;
            loops.push(tokio::spawn(async move {
                runner_loop(i, task_store, runner, handle, claim_backoff).await;
            }));
        }
        for jh in loops {
            let _ = jh.await;
        }

        let (completed, failed) = self.task_store.sync_stats(&handle.id).await.unwrap_or((0, 0));
        info!(sync_id = %handle.id, completed, failed, "sync complete");
        handle.resolve(completed, failed);
    }
}

async fn runner_loop(
    loop_id: usize,
    task_store: Arc<dyn TaskStore>,
    runner: Arc<TaskRunner>,
    handle: Arc<SyncHandle>,
    claim_backoff: std::time::Duration,
) {
    loop {
        if handle.is_cancel_requested() || handle.is_pause_requested() {
            debug!(loop_id, sync_id = %handle.id, "runner loop stopping on pause/cancel");
            return;
        }

        match task_store.claim(&handle.id).await {
            Ok(Some(task)) => {
                dispatch_and_cascade(&task_store, &runner, task).await;
            }
            Ok(None) => match task_store.has_active_tasks(&handle.id).await {
                Ok(true) => {
                    tokio::time::sleep(claim_backoff).await;
                }
                _ => return,
            },
            Err(e) => {
                error!(loop_id, error = %e, "claim failed");
                tokio::time::sleep(claim_backoff).await;
            }
        }
    }
}

async fn dispatch_and_cascade(task_store: &Arc<dyn TaskStore>, runner: &Arc<TaskRunner>, task: Task) {
    match runner.run(&task).await {
        Ok(result) if !result.children.is_empty() => {
            if let Err(e) = task_store.set_awaiting_children(&task.id).await {
                error!(task_id = %task.id, error = %e, "failed to mark task awaiting children");
                return;
            }
            let children: Vec<TaskTemplate> = result
                .children
                .into_iter()
                .map(|mut t| {
                    t.parent = Some(TaskRef::Real(task.id.clone()));
                    t
                })
                .collect();
            if let Err(e) = task_store.enqueue_graph(&task.sync_id, children).await {
                error!(task_id = %task.id, error = %e, "failed to enqueue child tasks");
            }
        }
        Ok(_) => {
            match task_store.complete(&task.id).await {
                Ok(completed) => cascade(task_store, completed).await,
                Err(e) => error!(task_id = %task.id, error = %e, "failed to mark task completed"),
            }
        }
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "task failed");
            if let Err(store_err) = task_store.fail(&task.id, &e.to_string()).await {
                error!(task_id = %task.id, error = %store_err, "failed to record task failure");
                return;
            }
            if let Ok(Some(failed_task)) = task_store.get(&task.id).await {
                cascade(task_store, failed_task).await;
            }
        }
    }
}

/// Unblocks dependents and, if this task's parent now has every child in a
/// terminal state, completes the parent and recurses up the chain. Failed
/// tasks cascade exactly like completed ones — they still count as
/// terminal for parent completeness, so a sync can never hang on a failed
/// subtree.
fn cascade<'a>(
    task_store: &'a Arc<dyn TaskStore>,
    task: Task,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        if let Err(e) = task_store.unblock_dependents(&task.id).await {
            error!(task_id = %task.id, error = %e, "failed to unblock dependents");
        }

        let Some(parent_id) = task.parent_id.clone() else {
            return;
        };

        match task_store.all_children_complete(&parent_id).await {
            Ok(true) => match task_store.complete(&parent_id).await {
                Ok(parent) => cascade(task_store, parent).await,
                Err(e) => error!(task_id = %parent_id, error = %e, "failed to complete parent"),
            },
            Ok(false) => {}
            Err(e) => error!(task_id = %parent_id, error = %e, "failed to check child completeness"),
        }
    })
}

/// Walks a plan into `TaskTemplate`s with local temp ids, matching the
/// `execute(plan)` step-2 algorithm: sequential steps chain `blocked_by` to
/// the previous sibling; `concurrent` groups become a `sync-group` plus
/// unordered children parented to the group.
fn materialize_plan(plan: &SyncPlan) -> Vec<TaskTemplate> {
    let mut templates = Vec::new();
    let mut previous: Option<TaskRef> = None;
    for step in &plan.steps {
        let temp_id = build_step(step, previous.take(), None, &mut templates);
        previous = Some(TaskRef::Temp(temp_id));
    }
    templates
}

fn build_step(
    step: &Step,
    blocked_by: Option<TaskRef>,
    parent: Option<TaskRef>,
    templates: &mut Vec<TaskTemplate>,
) -> String {
    match step {
        Step::ForRoot { entity_ref, op } | Step::ForOne { entity_ref, op } => {
            let temp_id = Uuid::new_v4().to_string();
            let state = if blocked_by.is_some() { TaskState::New } else { TaskState::Pending };
            let payload = TaskPayload::SyncStep {
                target: SyncStepTarget::Ref(entity_ref.clone()),
                op: op.clone(),
                cursor: None,
            };
            push_step(templates, temp_id.clone(), state, payload, parent, blocked_by);
            temp_id
        }
        Step::ForAll { entity_type, op } => {
            let temp_id = Uuid::new_v4().to_string();
            let state = if blocked_by.is_some() { TaskState::New } else { TaskState::Pending };
            let payload = TaskPayload::SyncStep {
                target: SyncStepTarget::AllOfType(entity_type.clone()),
                op: op.clone(),
                cursor: None,
            };
            push_step(templates, temp_id.clone(), state, payload, parent, blocked_by);
            temp_id
        }
        Step::Concurrent { steps } => {
            let group_temp_id = Uuid::new_v4().to_string();
            push_step(
                templates,
                group_temp_id.clone(),
                TaskState::AwaitingChildren,
                TaskPayload::SyncGroup,
                parent,
                blocked_by,
            );
            for child in steps {
                build_step(child, None, Some(TaskRef::Temp(group_temp_id.clone())), templates);
            }
            group_temp_id
        }
    }
}

fn push_step(
    templates: &mut Vec<TaskTemplate>,
    temp_id: String,
    state: TaskState,
    payload: TaskPayload,
    parent: Option<TaskRef>,
    blocked_by: Option<TaskRef>,
) {
    let mut t = TaskTemplate::new(temp_id, state, payload);
    if let Some(p) = parent {
        t = t.with_parent(p);
    }
    if let Some(b) = blocked_by {
        t = t.with_blocked_by(b);
    }
    templates.push(t);
}
