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

// Diesel table definitions for the task and sync-metadata row schemas.

diesel::table! {
    tasks (id) {
        id -> Text,
        sync_id -> Text,
        state -> Text,
        payload -> Text,
        parent_id -> Nullable<Text>,
        blocked_by -> Nullable<Text>,
        not_before -> Nullable<BigInt>,
        created_at -> BigInt,
        completed_at -> Nullable<BigInt>,
        error -> Nullable<Text>,
    }
}

diesel::table! {
    sync_meta (ref_key, field) {
        ref_key -> Text,
        field -> Text,
        synced_at -> BigInt,
    }
}
