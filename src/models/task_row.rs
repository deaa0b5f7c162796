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

//! Diesel-mapped row types for `tasks`, split into `TaskRow` (what's on
//! disk) and `NewTaskRow` (what's inserted).

use diesel::prelude::*;

use crate::database::schema::tasks;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = tasks)]
pub struct TaskRow {
    pub id: String,
    pub sync_id: String,
    pub state: String,
    pub payload: String,
    pub parent_id: Option<String>,
    pub blocked_by: Option<String>,
    pub not_before: Option<i64>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    pub id: String,
    pub sync_id: String,
    pub state: String,
    pub payload: String,
    pub parent_id: Option<String>,
    pub blocked_by: Option<String>,
    pub not_before: Option<i64>,
    pub created_at: i64,
}
