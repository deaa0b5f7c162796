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

//! Sync Metadata Store: per-`(refKey, field)` last-synced timestamps and
//! staleness queries. Upserts are idempotent and concurrent-safe.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;

use crate::database::schema::sync_meta;
use crate::database::Database;
use crate::error::StoreError;
use crate::models::sync_meta_row::NewSyncMetaRow;

#[async_trait]
pub trait SyncMetaStore: Send + Sync {
    async fn record_synced(&self, ref_key: &str, field: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn last_synced_at(&self, ref_key: &str, field: &str) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Staleness = `now - lastSyncedAt > max_age`; never-synced is stale.
    async fn is_stale(&self, ref_key: &str, field: &str, max_age: Duration) -> Result<bool, StoreError> {
        match self.last_synced_at(ref_key, field).await? {
            None => Ok(true),
            Some(last) => Ok(Utc::now() - last > max_age),
        }
    }
}

pub struct SqliteSyncMetaStore {
    db: Database,
}

impl SqliteSyncMetaStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SyncMetaStore for SqliteSyncMetaStore {
    async fn record_synced(&self, ref_key: &str, field: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let row = NewSyncMetaRow {
            ref_key: ref_key.to_string(),
            field: field.to_string(),
            synced_at: at.timestamp(),
        };
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        conn.interact(move |conn| {
            diesel::insert_into(sync_meta::table)
                .values(&row)
                .on_conflict((sync_meta::ref_key, sync_meta::field))
                .do_update()
                .set(&row)
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::Pool(e.to_string()))?
        .map_err(StoreError::Query)?;
        Ok(())
    }

    async fn last_synced_at(&self, ref_key: &str, field: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let ref_key = ref_key.to_string();
        let field = field.to_string();
        let conn = self.db.pool().get().await.map_err(|e| StoreError::Pool(e.to_string()))?;
        let synced_at: Option<i64> = conn
            .interact(move |conn| {
                sync_meta::table
                    .filter(sync_meta::ref_key.eq(&ref_key))
                    .filter(sync_meta::field.eq(&field))
                    .select(sync_meta::synced_at)
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?
            .map_err(StoreError::Query)?;
        Ok(synced_at.and_then(|secs| DateTime::from_timestamp(secs, 0)))
    }
}
