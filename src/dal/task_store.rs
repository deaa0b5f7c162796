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

//! Task Store: the durable collection of tasks, with atomic claim,
//! whole-graph insertion, and the aggregate queries the executor's
//! completion cascade depends on. Claims use a select-then-conditional-
//! update pattern inside a single transaction, the sqlite analogue of a
//! row-level compare-and-swap.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use crate::database::schema::tasks;
use crate::database::Database;
use crate::error::StoreError;
use crate::models::task_row::{NewTaskRow, TaskRow};
use crate::task::{Task, TaskPayload, TaskRef, TaskState, TaskTemplate};

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn enqueue(&self, sync_id: &str, template: TaskTemplate) -> Result<String, StoreError>;

    /// Atomically inserts every template, rewriting `parent_temp_id` /
    /// `blocked_by_temp_id` references into real ids. Returns the
    /// temp-id -> real-id map.
    async fn enqueue_graph(
        &self,
        sync_id: &str,
        templates: Vec<TaskTemplate>,
    ) -> Result<HashMap<String, String>, StoreError>;

    async fn claim(&self, sync_id: &str) -> Result<Option<Task>, StoreError>;

    async fn complete(&self, id: &str) -> Result<Task, StoreError>;

    async fn set_awaiting_children(&self, id: &str) -> Result<(), StoreError>;

    async fn fail(&self, id: &str, error: &str) -> Result<(), StoreError>;

    async fn unblock_dependents(&self, id: &str) -> Result<usize, StoreError>;

    async fn all_children_complete(&self, parent_id: &str) -> Result<bool, StoreError>;

    async fn has_active_tasks(&self, sync_id: &str) -> Result<bool, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Task>, StoreError>;

    async fn pause(&self, id: &str) -> Result<(), StoreError>;

    async fn cancel(&self, id: &str) -> Result<(), StoreError>;

    /// Marks every non-terminal task in the sync as cancelled, used by
    /// `SyncHandle::cancel`.
    async fn cancel_sync(&self, sync_id: &str) -> Result<(), StoreError>;

    /// Counts completed/failed terminal tasks for a finished sync, used to
    /// build the handle's completion summary.
    async fn sync_stats(&self, sync_id: &str) -> Result<(usize, usize), StoreError>;
}

pub struct SqliteTaskStore {
    db: Database,
}

impl SqliteTaskStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_task(row: TaskRow) -> Result<Task, StoreError> {
        let payload: TaskPayload = serde_json::from_str(&row.payload)?;
        Ok(Task {
            id: row.id,
            sync_id: row.sync_id,
            state: TaskState::from_db_str(&row.state),
            payload,
            parent_id: row.parent_id,
            blocked_by: row.blocked_by,
            not_before: row.not_before.and_then(ts_to_datetime),
            created_at: ts_to_datetime(row.created_at).unwrap_or_else(Utc::now),
            completed_at: row.completed_at.and_then(ts_to_datetime),
            error: row.error,
        })
    }
}

fn ts_to_datetime(secs: i64) -> Option<chrono::DateTime<Utc>> {
    chrono::DateTime::from_timestamp(secs, 0)
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn enqueue(&self, sync_id: &str, template: TaskTemplate) -> Result<String, StoreError> {
        let map = self.enqueue_graph(sync_id, vec![template]).await?;
        Ok(map.into_values().next().expect("single template inserted"))
    }

    async fn enqueue_graph(
        &self,
        sync_id: &str,
        templates: Vec<TaskTemplate>,
    ) -> Result<HashMap<String, String>, StoreError> {
        let mut temp_to_real = HashMap::new();
        let mut new_rows = Vec::with_capacity(templates.len());
        let now = Utc::now().timestamp();

        for t in &templates {
            let real_id = self.db.next_task_id();
            temp_to_real.insert(t.temp_id.clone(), real_id);
        }

        let resolve = |r: &TaskRef| match r {
            TaskRef::Temp(tid) => temp_to_real[tid].clone(),
            TaskRef::Real(id) => id.clone(),
        };

        for t in templates {
            let real_id = temp_to_real[&t.temp_id].clone();
            let parent_id = t.parent.as_ref().map(&resolve);
            let blocked_by = t.blocked_by.as_ref().map(&resolve);
            let payload = serde_json::to_string(&t.payload)?;
            new_rows.push(NewTaskRow {
                id: real_id,
                sync_id: sync_id.to_string(),
                state: t.state.as_db_str().to_string(),
                payload,
                parent_id,
                blocked_by,
                not_before: t.not_before.map(|dt| dt.timestamp()),
                created_at: now,
            });
        }

        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                diesel::insert_into(tasks::table).values(&new_rows).execute(conn)?;
                Ok(())
            })
        })
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?
        .map_err(StoreError::Query)?;

        Ok(temp_to_real)
    }

    async fn claim(&self, sync_id: &str) -> Result<Option<Task>, StoreError> {
        let sync_id = sync_id.to_string();
        let now = Utc::now().timestamp();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;

        let row: Option<TaskRow> = conn
            .interact(move |conn| {
                conn.transaction::<_, diesel::result::Error, _>(|conn| {
                    let candidate: Option<TaskRow> = tasks::table
                        .filter(tasks::sync_id.eq(&sync_id))
                        .filter(tasks::state.eq(TaskState::Pending.as_db_str()))
                        .filter(tasks::not_before.is_null().or(tasks::not_before.le(now)))
                        .order(diesel::dsl::sql::<diesel::sql_types::BigInt>("CAST(id AS INTEGER)"))
                        .first(conn)
                        .optional()?;

                    let Some(candidate) = candidate else {
                        return Ok(None);
                    };

                    let updated = diesel::update(
                        tasks::table
                            .filter(tasks::id.eq(&candidate.id))
                            .filter(tasks::state.eq(TaskState::Pending.as_db_str())),
                    )
                    .set(tasks::state.eq(TaskState::Running.as_db_str()))
                    .execute(conn)?;

                    if updated == 0 {
                        // Lost the race (single-writer sqlite makes this
                        // unreachable in practice, but the check documents
                        // the invariant for any future multi-writer backend).
                        return Ok(None);
                    }

                    tasks::table.filter(tasks::id.eq(&candidate.id)).first(conn).optional()
                })
            })
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?
            .map_err(StoreError::Query)?;

        row.map(Self::row_to_task).transpose()
    }

    async fn complete(&self, id: &str) -> Result<Task, StoreError> {
        let id = id.to_string();
        let now = Utc::now().timestamp();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        let row: TaskRow = conn
            .interact(move |conn| {
                diesel::update(tasks::table.filter(tasks::id.eq(&id)))
                    .set((
                        tasks::state.eq(TaskState::Completed.as_db_str()),
                        tasks::completed_at.eq(Some(now)),
                    ))
                    .execute(conn)?;
                tasks::table.filter(tasks::id.eq(&id)).first(conn)
            })
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?
            .map_err(StoreError::Query)?;
        Self::row_to_task(row)
    }

    async fn set_awaiting_children(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(move |conn| {
            diesel::update(tasks::table.filter(tasks::id.eq(&id)))
                .set(tasks::state.eq(TaskState::AwaitingChildren.as_db_str()))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?
        .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn fail(&self, id: &str, error: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        let error = error.to_string();
        let now = Utc::now().timestamp();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(move |conn| {
            diesel::update(tasks::table.filter(tasks::id.eq(&id)))
                .set((
                    tasks::state.eq(TaskState::Failed.as_db_str()),
                    tasks::error.eq(Some(error)),
                    tasks::completed_at.eq(Some(now)),
                ))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?
        .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn unblock_dependents(&self, id: &str) -> Result<usize, StoreError> {
        let id = id.to_string();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        let count = conn
            .interact(move |conn| {
                diesel::update(
                    tasks::table
                        .filter(tasks::blocked_by.eq(&id))
                        .filter(tasks::state.eq(TaskState::New.as_db_str())),
                )
                .set(tasks::state.eq(TaskState::Pending.as_db_str()))
                .execute(conn)
            })
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?
            .map_err(StoreError::Query)?;
        Ok(count)
    }

    async fn all_children_complete(&self, parent_id: &str) -> Result<bool, StoreError> {
        let parent_id = parent_id.to_string();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        let (total, non_terminal): (i64, i64) = conn
            .interact(move |conn| {
                let total = tasks::table
                    .filter(tasks::parent_id.eq(&parent_id))
                    .count()
                    .get_result::<i64>(conn)?;
                let non_terminal = tasks::table
                    .filter(tasks::parent_id.eq(&parent_id))
                    .filter(
                        tasks::state
                            .ne(TaskState::Completed.as_db_str())
                            .and(tasks::state.ne(TaskState::Failed.as_db_str()))
                            .and(tasks::state.ne(TaskState::Cancelled.as_db_str())),
                    )
                    .count()
                    .get_result::<i64>(conn)?;
                Ok::<_, diesel::result::Error>((total, non_terminal))
            })
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?
            .map_err(StoreError::Query)?;
        Ok(total > 0 && non_terminal == 0)
    }

    async fn has_active_tasks(&self, sync_id: &str) -> Result<bool, StoreError> {
        let sync_id = sync_id.to_string();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        let active: i64 = conn
            .interact(move |conn| {
                tasks::table
                    .filter(tasks::sync_id.eq(&sync_id))
                    .filter(
                        tasks::state
                            .eq(TaskState::New.as_db_str())
                            .or(tasks::state.eq(TaskState::Pending.as_db_str()))
                            .or(tasks::state.eq(TaskState::Running.as_db_str()))
                            .or(tasks::state.eq(TaskState::AwaitingChildren.as_db_str())),
                    )
                    .count()
                    .get_result(conn)
            })
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?
            .map_err(StoreError::Query)?;
        Ok(active > 0)
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let id = id.to_string();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        let row: Option<TaskRow> = conn
            .interact(move |conn| tasks::table.filter(tasks::id.eq(&id)).first(conn).optional())
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?
            .map_err(StoreError::Query)?;
        row.map(Self::row_to_task).transpose()
    }

    async fn pause(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(move |conn| {
            diesel::update(tasks::table.filter(tasks::id.eq(&id)))
                .set(tasks::state.eq(TaskState::Paused.as_db_str()))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?
        .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(move |conn| {
            diesel::update(tasks::table.filter(tasks::id.eq(&id)))
                .set(tasks::state.eq(TaskState::Cancelled.as_db_str()))
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?
        .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn cancel_sync(&self, sync_id: &str) -> Result<(), StoreError> {
        let sync_id = sync_id.to_string();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(move |conn| {
            diesel::update(
                tasks::table
                    .filter(tasks::sync_id.eq(&sync_id))
                    .filter(
                        tasks::state
                            .eq(TaskState::New.as_db_str())
                            .or(tasks::state.eq(TaskState::Pending.as_db_str()))
                            .or(tasks::state.eq(TaskState::Running.as_db_str()))
                            .or(tasks::state.eq(TaskState::AwaitingChildren.as_db_str())),
                    ),
            )
            .set(tasks::state.eq(TaskState::Cancelled.as_db_str()))
            .execute(conn)
        })
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?
        .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn sync_stats(&self, sync_id: &str) -> Result<(usize, usize), StoreError> {
        let sync_id = sync_id.to_string();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        let (completed, failed): (i64, i64) = conn
            .interact(move |conn| {
                let completed = tasks::table
                    .filter(tasks::sync_id.eq(&sync_id))
                    .filter(tasks::state.eq(TaskState::Completed.as_db_str()))
                    .count()
                    .get_result::<i64>(conn)?;
                let failed = tasks::table
                    .filter(tasks::sync_id.eq(&sync_id))
                    .filter(tasks::state.eq(TaskState::Failed.as_db_str()))
                    .count()
                    .get_result::<i64>(conn)?;
                Ok::<_, diesel::result::Error>((completed, failed))
            })
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?
            .map_err(StoreError::Query)?;
        Ok((completed as usize, failed as usize))
    }
}
