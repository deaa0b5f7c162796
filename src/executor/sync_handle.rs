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

//! Observable handle to a running (or finished) sync.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::dal::TaskStore;
use crate::error::StoreError;
use crate::plan::SyncPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

/// Fired exactly once, when every task in the sync has reached a terminal
/// state (or the sync was cancelled).
#[derive(Debug, Clone)]
pub struct SyncCompletion {
    pub status: SyncStatus,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    pub duration: Duration,
}

pub struct SyncHandle {
    pub id: String,
    pub plan: SyncPlan,
    pub started_at: DateTime<Utc>,
    status: Mutex<SyncStatus>,
    completion: Mutex<Option<SyncCompletion>>,
    notify: Notify,
    pause_requested: AtomicBool,
    cancel_requested: AtomicBool,
    task_store: Arc<dyn TaskStore>,
}

impl SyncHandle {
    pub fn new(id: String, plan: SyncPlan, task_store: Arc<dyn TaskStore>) -> Arc<Self> {
        Arc::new(Self {
            id,
            plan,
            started_at: Utc::now(),
            status: Mutex::new(SyncStatus::Running),
            completion: Mutex::new(None),
            notify: Notify::new(),
            pause_requested: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            task_store,
        })
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.lock()
    }

    pub fn is_pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::SeqCst)
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Stops claiming but lets in-flight work finish. Resume is not
    /// supported in v1.
    pub fn pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
        *self.status.lock() = SyncStatus::Paused;
    }

    /// Marks all non-terminal tasks cancelled and signals runner loops to
    /// stop claiming. Returns promptly; in-flight work is best-effort
    /// interrupted only, per the concurrency model.
    pub async fn cancel(&self) -> Result<(), StoreError> {
        self.cancel_requested.store(true, Ordering::SeqCst);
        *self.status.lock() = SyncStatus::Cancelled;
        self.task_store.cancel_sync(&self.id).await
    }

    /// Awaits the single completion event. Safe to call from multiple
    /// tasks; all awaiters observe the same summary.
    pub async fn completion(&self) -> SyncCompletion {
        loop {
            // Register interest before checking, so a `resolve()` that
            // races in between the check and the await is never missed.
            let notified = self.notify.notified();
            if let Some(summary) = self.completion.lock().clone() {
                return summary;
            }
            notified.await;
        }
    }

    pub(crate) fn resolve(&self, tasks_completed: usize, tasks_failed: usize) {
        let status = if self.cancel_requested.load(Ordering::SeqCst) {
            SyncStatus::Cancelled
        } else if tasks_completed > 0 {
            SyncStatus::Completed
        } else {
            SyncStatus::Failed
        };
        *self.status.lock() = status;
        *self.completion.lock() = Some(SyncCompletion {
            status,
            tasks_completed,
            tasks_failed,
            duration: (Utc::now() - self.started_at)
                .to_std()
                .unwrap_or(Duration::ZERO),
        });
        self.notify.notify_waiters();
    }
}
