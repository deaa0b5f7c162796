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

//! Tunables for the runner loops and connection pool: one struct, a sane
//! `Default`, and an `from_env` constructor layered on top for deployments
//! that want to tune without recompiling.

use std::time::Duration;

/// `PAGE_SIZE` from the Task Runner's forAll/load-collection algorithms.
pub const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of concurrent claim/execute loops spawned per `execute(plan)`.
    pub runner_loops: usize,
    /// Sleep between claim attempts when tasks are active but none claimable.
    pub claim_backoff: Duration,
    /// Poll cadence for scheduler-side housekeeping.
    pub poll_interval: Duration,
    /// Wall-clock budget for a single task's loader call.
    pub task_timeout: Duration,
    /// sqlite is effectively single-writer; default pool size reflects that.
    pub db_pool_size: usize,
    pub page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            runner_loops: 8,
            claim_backoff: Duration::from_millis(50),
            poll_interval: Duration::from_millis(100),
            task_timeout: Duration::from_secs(300),
            db_pool_size: 1,
            page_size: PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Loads overrides from `SLUICE_*` environment variables (via a
    /// `.env` file if present), falling back to defaults for anything unset
    /// or unparsable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SLUICE_RUNNER_LOOPS") {
            if let Ok(n) = v.parse() {
                cfg.runner_loops = n;
            }
        }
        if let Ok(v) = std::env::var("SLUICE_CLAIM_BACKOFF_MS") {
            if let Ok(n) = v.parse() {
                cfg.claim_backoff = Duration::from_millis(n);
            }
        }
        if let Ok(v) = std::env::var("SLUICE_TASK_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                cfg.task_timeout = Duration::from_secs(n);
            }
        }
        if let Ok(v) = std::env::var("SLUICE_DB_POOL_SIZE") {
            if let Ok(n) = v.parse() {
                cfg.db_pool_size = n;
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.runner_loops, 8);
        assert_eq!(cfg.page_size, PAGE_SIZE);
    }
}
