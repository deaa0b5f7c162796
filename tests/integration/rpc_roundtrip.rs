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

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sluice::federation::{serve, RpcClient, RpcDispatcher, RpcRequest, RpcResponse};
use sluice::plan::{Operation, Step, SyncPlan};
use sluice::ref_key::Ref;

/// Dispatches `sync` by running a plan against the harness executor and
/// `status` by polling the resulting handle, the shape an `Installation`
/// would expose over the socket.
struct SyncDispatcher {
    harness: fixtures::Harness,
}

#[async_trait]
impl RpcDispatcher for SyncDispatcher {
    async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        match request.method.as_str() {
            "sync" => {
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
                match self.harness.executor.execute(plan).await {
                    Ok(handle) => RpcResponse::ok(request.id, json!({ "syncId": handle.id })),
                    Err(e) => RpcResponse::err(request.id, e.into()),
                }
            }
            "status" => {
                let sync_id = request.args.first().and_then(|v| v.as_str()).unwrap_or_default();
                match self.harness.executor.get(sync_id) {
                    Some(handle) => {
                        let summary = handle.completion().await;
                        RpcResponse::ok(
                            request.id,
                            json!({
                                "status": format!("{:?}", summary.status),
                                "tasksCompleted": summary.tasks_completed,
                                "tasksFailed": summary.tasks_failed,
                            }),
                        )
                    }
                    None => RpcResponse::err(
                        request.id,
                        sluice::error::CoreError::new(
                            "federation",
                            vec![sluice::error::Facet::NotFound],
                            format!("no such sync: {sync_id}"),
                        ),
                    ),
                }
            }
            other => RpcResponse::err(
                request.id,
                sluice::error::CoreError::new(
                    "federation",
                    vec![sluice::error::Facet::NotImplemented],
                    format!("unknown method: {other}"),
                ),
            ),
        }
    }
}

/// A `sync` call over the Unix socket must trigger the same execution path
/// as calling the executor in-process, and a follow-up `status` call must
/// observe the completed result.
#[tokio::test]
async fn sync_and_status_round_trip_over_unix_socket() {
    let dir = tempfile::tempdir().expect("tempdir");
    let socket_path = dir.path().join("sluice.sock");
    let socket_path = socket_path.to_str().unwrap().to_string();

    let users = vec![("u1".to_string(), "Ada Lovelace".to_string(), "ada@acme.test".to_string())];
    let harness = fixtures::build_harness(":memory:", users, 10, false).await;
    let dispatcher: Arc<dyn RpcDispatcher> = Arc::new(SyncDispatcher { harness });

    let serve_path = socket_path.clone();
    tokio::spawn(async move {
        let _ = serve(&serve_path, dispatcher).await;
    });
    // Give the listener a moment to bind before connecting.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = RpcClient::connect(&socket_path).await.expect("connect over unix socket");

    let sync_response = client
        .call(RpcRequest {
            id: "req-1".to_string(),
            target: "installations.acme".to_string(),
            method: "sync".to_string(),
            args: vec![],
            scope: None,
        })
        .await
        .expect("sync call");

    let sync_id = match sync_response {
        RpcResponse::Ok { result, .. } => result["syncId"].as_str().expect("syncId present").to_string(),
        RpcResponse::Err { error, .. } => panic!("sync call failed: {}", error.message),
    };

    let status_response = client
        .call(RpcRequest {
            id: "req-2".to_string(),
            target: "installations.acme".to_string(),
            method: "status".to_string(),
            args: vec![json!(sync_id)],
            scope: None,
        })
        .await
        .expect("status call");

    match status_response {
        RpcResponse::Ok { result, .. } => {
            assert_eq!(result["status"], json!("Completed"));
            assert_eq!(result["tasksFailed"], json!(0));
        }
        RpcResponse::Err { error, .. } => panic!("status call failed: {}", error.message),
    }
}
