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

/// Same shape as the happy path, but the mock API hands back users two at a
/// time, forcing pagination-continuation tasks on both the collection load
/// and the forAll field load.
#[tokio::test]
async fn paginated_api_still_yields_every_user() {
    let users: Vec<_> = (1..=5)
        .map(|n| (format!("u{n}"), format!("User {n}"), format!("user{n}@acme.test")))
        .collect();
    let harness = fixtures::build_harness(":memory:", users.clone(), 2, false).await;

    let plan = SyncPlan::new(vec![
        Step::ForRoot {
            entity_ref: Ref::local("AcmeWorkspace", "ws1"),
            op: Operation::LoadCollection { field: "users".to_string() },
        },
        Step::ForAll {
            entity_type: "AcmeUser".to_string(),
            op: Operation::LoadFields {
                fields: vec!["displayName".to_string(), "email".to_string()],
            },
        },
    ]);

    let handle = harness.executor.execute(plan).await.expect("execute");
    let summary = handle.completion().await;

    assert_eq!(summary.status, SyncStatus::Completed);
    assert_eq!(summary.tasks_failed, 0);

    let stored = harness.engine.all_of("AcmeUser");
    assert_eq!(stored.len(), 5, "every page must have been drained, not just the first");
    for (id, _, _) in &users {
        assert!(stored.iter().any(|(rid, _)| rid == id), "missing user {id}");
    }
}
