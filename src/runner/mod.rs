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

//! Task Runner: stateless execution of a single task. Given a payload and
//! the registry/engine/sync-meta/flow collaborators, produces zero-or-more
//! child templates.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::{Engine, Page, PageRequest, Projection};
use crate::error::RunnerError;
use crate::flow::FlowController;
use crate::plan::Operation;
use crate::ref_key::Ref;
use crate::registry::{ExecutionRegistry, LoaderContext, LoaderKind};
use crate::dal::SyncMetaStore;
use crate::task::{SyncStepTarget, Task, TaskPayload, TaskRunResult, TaskState, TaskTemplate};

pub struct TaskRunner {
    registry: Arc<ExecutionRegistry>,
    engine: Arc<dyn Engine>,
    sync_meta: Arc<dyn SyncMetaStore>,
    flow: Arc<dyn FlowController>,
    config: EngineConfig,
}

impl TaskRunner {
    pub fn new(
        registry: Arc<ExecutionRegistry>,
        engine: Arc<dyn Engine>,
        sync_meta: Arc<dyn SyncMetaStore>,
        flow: Arc<dyn FlowController>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            engine,
            sync_meta,
            flow,
            config,
        }
    }

    /// Dispatches by payload kind. Failures propagate as `Err`; the
    /// scheduler converts them into `fail(taskId, message)`.
    pub async fn run(&self, task: &Task) -> Result<TaskRunResult, RunnerError> {
        match &task.payload {
            TaskPayload::SyncGroup => {
                // Synthetic: never executes; scheduler moves it straight to
                // awaiting_children without dispatching here.
                Ok(TaskRunResult::empty())
            }
            TaskPayload::SyncStep { target, op, cursor } => {
                self.run_sync_step(target, op, cursor.clone()).await
            }
            TaskPayload::LoadFields { refs, fields } => {
                self.process_load_fields_for_refs(refs, fields).await?;
                Ok(TaskRunResult::empty())
            }
            TaskPayload::LoadCollection { parent, field, cursor } => {
                self.run_load_collection(parent, field, cursor.clone()).await
            }
        }
    }

    async fn run_sync_step(
        &self,
        target: &SyncStepTarget,
        op: &Operation,
        cursor: Option<String>,
    ) -> Result<TaskRunResult, RunnerError> {
        match (target, op) {
            (SyncStepTarget::Ref(r), Operation::LoadFields { fields }) => {
                self.process_load_fields_for_refs(std::slice::from_ref(r), fields).await?;
                Ok(TaskRunResult::empty())
            }
            (SyncStepTarget::Ref(r), Operation::LoadCollection { field }) => {
                self.run_load_collection(r, field, cursor).await
            }
            (SyncStepTarget::AllOfType(entity_type), Operation::LoadFields { fields }) => {
                let page = self
                    .engine
                    .load_page(
                        entity_type,
                        Projection::Refs,
                        PageRequest {
                            cursor,
                            limit: self.config.page_size,
                        },
                    )
                    .await
                    .map_err(|e| RunnerError::LoaderFailed(e.message))?;

                self.process_load_fields_for_refs(&page.items, fields).await?;

                let mut children = Vec::new();
                if page.has_more {
                    children.push(continuation_template(
                        TaskPayload::SyncStep {
                            target: SyncStepTarget::AllOfType(entity_type.clone()),
                            op: Operation::LoadFields { fields: fields.clone() },
                            cursor: page.cursor,
                        },
                    ));
                }
                Ok(TaskRunResult::with_children(children))
            }
            (SyncStepTarget::AllOfType(entity_type), Operation::LoadCollection { field }) => {
                let page = self
                    .engine
                    .load_page(
                        entity_type,
                        Projection::Refs,
                        PageRequest {
                            cursor,
                            limit: self.config.page_size,
                        },
                    )
                    .await
                    .map_err(|e| RunnerError::LoaderFailed(e.message))?;

                let mut children = Vec::new();
                for parent_ref in &page.items {
                    children.push(continuation_template(TaskPayload::LoadCollection {
                        parent: parent_ref.clone(),
                        field: field.clone(),
                        cursor: None,
                    }));
                }
                if page.has_more {
                    children.push(continuation_template(TaskPayload::SyncStep {
                        target: SyncStepTarget::AllOfType(entity_type.clone()),
                        op: Operation::LoadCollection { field: field.clone() },
                        cursor: page.cursor,
                    }));
                }
                Ok(TaskRunResult::with_children(children))
            }
        }
    }

    async fn run_load_collection(
        &self,
        parent: &Ref,
        field: &str,
        cursor: Option<String>,
    ) -> Result<TaskRunResult, RunnerError> {
        let resolver = self
            .registry
            .get_resolver(&parent.entity_type)
            .ok_or_else(|| RunnerError::NoResolver(parent.entity_type.clone()))?;
        let loader_name = resolver
            .loader_for_field(field)
            .ok_or_else(|| RunnerError::NoCollectionLoader {
                entity_type: parent.entity_type.clone(),
                field: field.to_string(),
            })?
            .to_string();
        let loader = self
            .registry
            .get_loader(&loader_name)
            .ok_or_else(|| RunnerError::NoCollectionLoader {
                entity_type: parent.entity_type.clone(),
                field: field.to_string(),
            })?;
        if !loader.depends_on.is_empty() {
            return Err(RunnerError::LoaderDepsNotSupported(loader_name));
        }
        let collection_loader = match &loader.kind {
            LoaderKind::Collection(c) => c,
            _ => {
                return Err(RunnerError::NoCollectionLoader {
                    entity_type: parent.entity_type.clone(),
                    field: field.to_string(),
                })
            }
        };

        let _token = self.flow.acquire(&loader_name).await;
        let ctx: LoaderContext = HashMap::new();
        let page_result = collection_loader
            .load_page(
                parent,
                PageRequest {
                    cursor,
                    limit: self.config.page_size,
                },
                &ctx,
            )
            .await;
        // Flow token releases on drop regardless of outcome below.
        let page: Page<Ref> = page_result.map_err(|e| RunnerError::LoaderFailed(e.message))?;

        for item in &page.items {
            self.engine
                .store(item, Default::default())
                .await
                .map_err(|e| RunnerError::LoaderFailed(e.message))?;
        }
        self.sync_meta
            .record_synced(&parent.to_key(), field, Utc::now())
            .await?;

        let mut children = Vec::new();
        if page.has_more {
            children.push(continuation_template(TaskPayload::LoadCollection {
                parent: parent.clone(),
                field: field.to_string(),
                cursor: page.cursor,
            }));
        }
        Ok(TaskRunResult::with_children(children))
    }

    /// Shared field-processing algorithm used by every `loadFields` path:
    /// resolve the loader per field, group fields by loader, acquire a
    /// flow token, call the loader, write results, record sync meta for
    /// the full set of fields grouped under the loader (not just the ones
    /// actually populated — absence means "not present upstream").
    async fn process_load_fields_for_refs(&self, refs: &[Ref], fields: &[String]) -> Result<(), RunnerError> {
        if refs.is_empty() {
            return Ok(());
        }
        let entity_type = &refs[0].entity_type;
        let resolver = self
            .registry
            .get_resolver(entity_type)
            .ok_or_else(|| RunnerError::NoResolver(entity_type.clone()))?;

        // Step 1 + 2: resolve loader per field, then group by loader.
        let mut fields_by_loader: HashMap<String, Vec<String>> = HashMap::new();
        for field in fields {
            if let Some(loader_name) = resolver.loader_for_field(field) {
                fields_by_loader
                    .entry(loader_name.to_string())
                    .or_default()
                    .push(field.clone());
            }
        }

        for (loader_name, grouped_fields) in fields_by_loader {
            let loader = self
                .registry
                .get_loader(&loader_name)
                .ok_or_else(|| RunnerError::UnknownEntityType(loader_name.clone()))?;

            // Step 3: loader-to-loader dependency is not supported.
            if !loader.depends_on.is_empty() {
                return Err(RunnerError::LoaderDepsNotSupported(loader_name));
            }

            // Step 4: acquire flow token keyed by loader name.
            let _token = self.flow.acquire(&loader_name).await;
            let ctx: LoaderContext = HashMap::new();

            match &loader.kind {
                LoaderKind::EntityBatched(batched) => {
                    // Step 5: call once with all refs.
                    let batch = batched
                        .load_batch(refs, &ctx)
                        .await
                        .map_err(|e| RunnerError::LoaderFailed(e.message))?;
                    for r in refs {
                        if let Some(input) = batch.get(r) {
                            self.engine
                                .store(r, input.clone())
                                .await
                                .map_err(|e| RunnerError::LoaderFailed(e.message))?;
                        }
                        for field in &grouped_fields {
                            self.sync_meta.record_synced(&r.to_key(), field, Utc::now()).await?;
                        }
                    }
                }
                LoaderKind::Entity(entity_loader) => {
                    // Step 6: call once per ref.
                    for r in refs {
                        let input = entity_loader
                            .load(r, &ctx)
                            .await
                            .map_err(|e| RunnerError::LoaderFailed(e.message))?;
                        self.engine
                            .store(r, input)
                            .await
                            .map_err(|e| RunnerError::LoaderFailed(e.message))?;
                        for field in &grouped_fields {
                            self.sync_meta.record_synced(&r.to_key(), field, Utc::now()).await?;
                        }
                    }
                }
                LoaderKind::Collection(_) | LoaderKind::Raw(_) => {
                    return Err(RunnerError::FieldNotLoaded(loader_name));
                }
            }
            // Step 7: token releases on drop at end of this loop iteration.
        }
        Ok(())
    }
}

fn continuation_template(payload: TaskPayload) -> TaskTemplate {
    TaskTemplate::new(Uuid::new_v4().to_string(), TaskState::Pending, payload)
}
