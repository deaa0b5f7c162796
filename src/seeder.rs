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

//! Connector-supplied function that produces the root `SyncPlan` for a
//! fresh sync. Idempotent: calling it twice against the same engine state
//! must produce an equivalent plan.

use async_trait::async_trait;

use crate::engine::Engine;
use crate::error::CoreError;
use crate::plan::SyncPlan;

#[async_trait]
pub trait Seeder: Send + Sync {
    async fn seed(&self, ctx: &crate::registry::LoaderContext, engine: &dyn Engine) -> Result<SyncPlan, CoreError>;
}
