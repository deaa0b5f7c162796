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

//! Connection pool + migrations.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use deadpool_diesel::sqlite::{Manager, Pool, Runtime};
use diesel::prelude::*;
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::StoreError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Owns the connection pool and the monotonic task-id counter. Cloning is
/// cheap: the pool and counter are both reference-counted.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
    next_task_id: Arc<AtomicI64>,
}

impl Database {
    /// Opens (or creates) the sqlite file at `path`, runs migrations, and
    /// seeds the task-id counter from the current max id so a fresh store
    /// bound to the same file resumes id generation above any existing rows.
    pub async fn connect(path: &str, pool_size: usize) -> Result<Self, StoreError> {
        let manager = Manager::new(path, Runtime::Tokio1);
        let pool = Pool::builder(manager)
            .max_size(pool_size.max(1))
            .build()
            .map_err(|e| StoreError::Pool(e.to_string()))?;

        let conn = pool.get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(|conn| conn.run_pending_migrations(MIGRATIONS).map(|_| ()))
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        let max_id: i64 = conn
            .interact(|conn| {
                #[derive(QueryableByName)]
                struct MaxId {
                    #[diesel(sql_type = diesel::sql_types::BigInt)]
                    max_id: i64,
                }
                sql_query(
                    "SELECT COALESCE(MAX(CAST(id AS INTEGER)), 0) AS max_id FROM tasks",
                )
                .get_result::<MaxId>(conn)
                .map(|r| r.max_id)
            })
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?
            .map_err(StoreError::Query)?;

        Ok(Self {
            pool,
            next_task_id: Arc::new(AtomicI64::new(max_id)),
        })
    }

    /// In-memory sqlite database, used by tests and by the example harness.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        Self::connect(":memory:", 1).await
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Allocates the next monotonic task id and renders it in the stable
    /// string form the store persists.
    pub fn next_task_id(&self) -> String {
        let n = self.next_task_id.fetch_add(1, Ordering::SeqCst) + 1;
        n.to_string()
    }
}
