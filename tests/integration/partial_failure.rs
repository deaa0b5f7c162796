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

/// A `concurrent` group runs a failing collection load alongside a
/// succeeding one. The group's failed child must still unblock its
/// siblings and let the group itself reach a terminal state rather than
/// get stuck in `awaiting_children` forever.
#[tokio::test]
async fn one_failing_branch_does_not_block_its_siblings() {
    let users = vec![("u1".to_string(), "Ada Lovelace".to_string(), "ada@acme.test".to_string())];
    // fail_list_users=true: the only collection loader registered fails.
    let harness = fixtures::build_harness(":memory:", users, 10, true).await;

    let plan = SyncPlan::new(vec![Step::Concurrent {
        steps: vec![
            Step::ForRoot {
                entity_ref: Ref::local("AcmeWorkspace", "ws1"),
                op: Operation::LoadCollection { field: "users".to_string() },
            },
            Step::ForOne {
                entity_ref: Ref::local("AcmeWorkspace", "ws1"),
                op: Operation::LoadFields { fields: vec![] },
            },
        ],
    }]);

    let handle = harness.executor.execute(plan).await.expect("execute");
    let summary = tokio::time::timeout(std::time::Duration::from_secs(5), handle.completion())
        .await
        .expect("the group must not hang waiting on the failed branch");

    assert_ne!(summary.status, SyncStatus::Running);
    assert!(summary.tasks_failed >= 1, "the failing collection load must be recorded as failed");
    assert!(summary.tasks_completed >= 1, "the sibling ForOne step with no fields must still complete");
}
