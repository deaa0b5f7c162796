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

#[tokio::test]
async fn three_users_are_synced_and_handle_resolves_completed() {
    let users = vec![
        ("u1".to_string(), "Ada Lovelace".to_string(), "ada@acme.test".to_string()),
        ("u2".to_string(), "Alan Turing".to_string(), "alan@acme.test".to_string()),
        ("u3".to_string(), "Grace Hopper".to_string(), "grace@acme.test".to_string()),
    ];
    let harness = fixtures::build_harness(":memory:", users.clone(), 10, false).await;

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
    assert_eq!(stored.len(), 3);
    for (id, name, email) in &users {
        let row = stored.iter().find(|(rid, _)| rid == id).expect("user present");
        assert_eq!(row.1.get("displayName").and_then(|v| v.as_str()), Some(name.as_str()));
        assert_eq!(row.1.get("email").and_then(|v| v.as_str()), Some(email.as_str()));
    }
}
