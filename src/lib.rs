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

//! A resumable, dependency-ordered task graph engine for driving connector
//! syncs into local entity stores.
//!
//! The core, in dependency order (leaves first): [`dal::TaskStore`],
//! [`dal::SyncMetaStore`], [`flow::FlowController`], [`registry::ExecutionRegistry`],
//! [`runner::TaskRunner`], [`executor::SyncExecutor`].

pub mod config;
pub mod dal;
pub mod database;
pub mod engine;
pub mod error;
pub mod executor;
pub mod federation;
pub mod flow;
pub mod models;
pub mod plan;
pub mod ref_key;
pub mod registry;
pub mod runner;
pub mod seeder;
pub mod task;

pub use config::EngineConfig;
pub use database::Database;
pub use error::CoreError;
pub use executor::{SyncExecutor, SyncHandle, SyncStatus};
pub use plan::{Operation, Step, SyncPlan};
pub use ref_key::{Ref, Scope};
pub use task::{Task, TaskPayload, TaskState};

/// Installs a `tracing-subscriber` formatter reading its filter from
/// `RUST_LOG`. Call once, early.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}
