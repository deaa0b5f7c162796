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

#[path = "../fixtures.rs"]
mod fixtures;

use sluice::plan::{Operation, Step, SyncPlan};
use sluice::ref_key::Ref;
use sluice::SyncStatus;

/// The collection loader errors on every call; the sync must still resolve
/// (not hang) with a failed task and no user rows written.
#[tokio::test]
async fn failing_loader_fails_the_sync_without_hanging() {
    let users = vec![("u1".to_string(), "Ada Lovelace".to_string(), "ada@acme.test".to_string())];
    let harness = fixtures::build_harness(":memory:", users, 10, true).await;

    let plan = SyncPlan::new(vec![Step::ForRoot {
        entity_ref: Ref::local("AcmeWorkspace", "ws1"),
        op: Operation::LoadCollection { field: "users".to_string() },
    }]);

    let handle = harness.executor.execute(plan).await.expect("execute");
    let summary = tokio::time::timeout(std::time::Duration::from_secs(5), handle.completion())
        .await
        .expect("sync must resolve instead of hanging on a failed loader");

    assert_eq!(summary.status, SyncStatus::Failed);
    assert!(summary.tasks_failed >= 1);
    assert!(harness.engine.all_of("AcmeUser").is_empty());
}
