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

//! The federation boundary for a single installation. Scope routing
//! strips `scope.installationId` and forwards to the matching dispatcher;
//! specified here only at its interface.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::Engine;
use crate::error::CoreError;
use crate::executor::sync_handle::SyncHandle;

#[async_trait]
pub trait Installation: Send + Sync {
    fn describe(&self) -> Value;
    fn schema(&self) -> Value;
    fn engine(&self) -> &dyn Engine;

    async fn sync(&self) -> Result<Arc<SyncHandle>, CoreError>;
    async fn health(&self) -> Result<Value, CoreError>;
    async fn start(&self) -> Result<(), CoreError>;
    async fn stop(&self) -> Result<(), CoreError>;
}
