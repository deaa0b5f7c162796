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

use sluice::dal::{SqliteSyncMetaStore, SqliteTaskStore};
use sluice::database::Database;
use sluice::engine::{Engine, EntityInput};
use sluice::executor::SyncExecutor;
use sluice::flow::NoopFlowController;
use sluice::plan::{Operation, Step, SyncPlan};
use sluice::ref_key::Ref;
use sluice::runner::TaskRunner;
use sluice::EngineConfig;
use sluice::SyncStatus;

/// After a sync completes against a file-backed database, a fresh
/// `Database`/`TaskStore` opened on the same file must resume monotonic id
/// generation strictly above the highest id already on disk, and a second
/// sync against that store must not collide with the first sync's rows.
#[tokio::test]
async fn fresh_store_over_same_file_resumes_above_prior_max_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("resume.sqlite");
    let db_path = db_path.to_str().unwrap().to_string();

    let users = vec![
        ("u1".to_string(), "Ada Lovelace".to_string(), "ada@acme.test".to_string()),
        ("u2".to_string(), "Alan Turing".to_string(), "alan@acme.test".to_string()),
    ];

    let plan = || {
        SyncPlan::new(vec![
            Step::ForRoot {
                entity_ref: Ref::local("AcmeWorkspace", "ws1"),
                op: Operation::LoadCollection { field: "users".to_string() },
            },
            Step::ForAll {
                entity_type: "AcmeUser".to_string(),
                op: Operation::LoadFields { fields: vec!["displayName".to_string(), "email".to_string()] },
            },
        ])
    };

    // First run: build a harness bound to the file, run to completion, and
    // record the highest numeric task id it left behind.
    let first = fixtures::build_harness(&db_path, users.clone(), 10, false).await;
    let handle = first.executor.execute(plan()).await.expect("execute");
    let summary = handle.completion().await;
    assert_eq!(summary.status, SyncStatus::Completed);

    let prior_max_id: i64 = {
        let conn = first.db.pool().get().await.expect("conn");
        conn.interact(|conn| {
            use diesel::prelude::*;
            diesel::sql_query("SELECT COALESCE(MAX(CAST(id AS INTEGER)), 0) AS max_id FROM tasks")
                .get_result::<MaxIdRow>(conn)
        })
        .await
        .expect("interact")
        .expect("query")
        .max_id
    };
    assert!(prior_max_id > 0, "first sync must have persisted at least one task row");

    // Second run: a brand new Database/TaskStore bound to the same file,
    // exactly as a restarted process would construct it.
    let db2 = Database::connect(&db_path, 1).await.expect("reopen sqlite db");
    let next_id: i64 = db2.next_task_id().parse().expect("numeric id");
    assert!(
        next_id > prior_max_id,
        "resumed store must allocate ids above the prior max ({next_id} <= {prior_max_id})"
    );

    let task_store2 = std::sync::Arc::new(SqliteTaskStore::new(db2.clone()));
    let sync_meta2 = std::sync::Arc::new(SqliteSyncMetaStore::new(db2.clone()));
    let engine2 = first.engine.clone();
    let engine2_dyn: std::sync::Arc<dyn Engine> = engine2.clone();
    let registry2 = fixtures::mock_registry(users.clone(), 10, false);
    let runner2 = std::sync::Arc::new(TaskRunner::new(
        registry2,
        engine2_dyn,
        sync_meta2,
        std::sync::Arc::new(NoopFlowController),
        EngineConfig::default(),
    ));
    let executor2 = SyncExecutor::new(task_store2.clone(), runner2, EngineConfig::default());

    let handle2 = executor2.execute(plan()).await.expect("second execute");
    let summary2 = handle2.completion().await;
    assert_eq!(summary2.status, SyncStatus::Completed);

    // Both syncs' rows coexist; nothing was overwritten by id collision.
    let stored: Vec<(String, EntityInput)> = engine2.all_of("AcmeUser");
    assert_eq!(stored.len(), 2, "second sync must not duplicate or clobber entity rows");

    let second_max_id: i64 = {
        let conn = db2.pool().get().await.expect("conn");
        conn.interact(|conn| {
            use diesel::prelude::*;
            diesel::sql_query("SELECT COALESCE(MAX(CAST(id AS INTEGER)), 0) AS max_id FROM tasks")
                .get_result::<MaxIdRow>(conn)
        })
        .await
        .expect("interact")
        .expect("query")
        .max_id
    };
    assert!(second_max_id > prior_max_id, "second sync's tasks must use ids above the first sync's");
}

#[derive(diesel::QueryableByName)]
struct MaxIdRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    max_id: i64,
}
