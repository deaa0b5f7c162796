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

use diesel::prelude::*;

use crate::database::schema::sync_meta;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = sync_meta, primary_key(ref_key, field))]
pub struct SyncMetaRow {
    pub ref_key: String,
    pub field: String,
    pub synced_at: i64,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = sync_meta)]
pub struct NewSyncMetaRow {
    pub ref_key: String,
    pub field: String,
    pub synced_at: i64,
}
