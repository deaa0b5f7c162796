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

//! The declarative `SyncPlan` tree a caller hands to the executor. Kept as
//! a plain serde-able tree (not a runtime task graph) so it can be produced
//! by a [`crate::seeder::Seeder`] or sent over RPC.

use serde::{Deserialize, Serialize};

use crate::ref_key::Ref;

/// What a leaf step does once it's reached a concrete ref.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    /// Load a fixed set of scalar fields for the target entity/entities.
    LoadFields { fields: Vec<String> },
    /// Load one field that is itself a paginated collection of refs.
    LoadCollection { field: String },
}

/// One node of a sync plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Step {
    /// A single root entity known up-front by the caller.
    ForRoot { entity_ref: Ref, op: Operation },
    /// A single, already-identified entity.
    ForOne { entity_ref: Ref, op: Operation },
    /// Every entity of a given type currently in the store.
    ForAll { entity_type: String, op: Operation },
    /// Siblings run in parallel; completes when all children complete.
    Concurrent { steps: Vec<Step> },
}

/// Top-level plan: an ordered sequence of steps executed in declared order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SyncPlan {
    pub steps: Vec<Step>,
}

impl SyncPlan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}
