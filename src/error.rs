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

//! Error taxonomy shared across the engine: every error carries a boundary
//! (which layer produced it) and one or more facets (semantic traits that
//! let callers catch by meaning rather than by concrete variant).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A semantic trait attached to an error. Facets are the catch-by-meaning
/// axis: a caller checking `err.has(Facet::NotFound)` doesn't need to know
/// which concrete boundary raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Facet {
    BadInput,
    NotFound,
    NotImplemented,
    Invariant,
    Retryable,
}

/// The core error type. Every failure that can cross a component boundary
/// (Task Store, Execution Registry, Task Runner, transport) is eventually
/// converted into one of these so it can be serialised over RPC and
/// reconstituted with its boundary/facets intact.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct CoreError {
    pub boundary: String,
    pub facets: Vec<Facet>,
    pub message: String,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    pub cause: Option<Box<CoreError>>,
}

impl CoreError {
    pub fn new(boundary: impl Into<String>, facets: Vec<Facet>, message: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            facets,
            message: message.into(),
            data: BTreeMap::new(),
            cause: None,
        }
    }

    /// Catch-by-definition: is this error (by boundary + first facet) a
    /// particular named condition.
    pub fn is(&self, boundary: &str) -> bool {
        self.boundary == boundary
    }

    /// Catch-by-facet: does this error carry the given semantic trait.
    pub fn has(&self, facet: Facet) -> bool {
        self.facets.contains(&facet)
    }

    /// Attach post-hoc context at a boundary crossing (e.g. an installation
    /// id or ref key), without losing the original error.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_cause(mut self, cause: CoreError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

/// Errors raised by the Task Store / Sync Metadata Store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database pool error: {0}")]
    Pool(String),
    #[error("database query error: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("payload serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no such task: {0}")]
    NoSuchTask(String),
    #[error("migration error: {0}")]
    Migration(String),
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        let facets = match &e {
            StoreError::NoSuchTask(_) => vec![Facet::NotFound],
            StoreError::Pool(_) | StoreError::Query(_) => vec![Facet::Retryable],
            StoreError::Serde(_) | StoreError::Migration(_) => vec![Facet::Invariant],
        };
        CoreError::new("task_store", facets, e.to_string())
    }
}

/// Errors raised while dispatching and executing a single task.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),
    #[error("no resolver registered for entity type: {0}")]
    NoResolver(String),
    #[error("no collection loader for field {field} on {entity_type}")]
    NoCollectionLoader { entity_type: String, field: String },
    #[error("loader {0} declares dependsOn, which is not supported")]
    LoaderDepsNotSupported(String),
    #[error("field {0} was requested but never populated by its loader")]
    FieldNotLoaded(String),
    #[error("loader result not available for ref {0}")]
    LoaderResultNotAvailable(String),
    #[error("batched loader did not return a key for ref {0}")]
    BatchKeyMissing(String),
    #[error("batched loader returned an empty batch")]
    BatchEmpty,
    #[error("failed to build task context: {0}")]
    ContextBuildFailed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("loader call failed: {0}")]
    LoaderFailed(String),
}

impl From<RunnerError> for CoreError {
    fn from(e: RunnerError) -> Self {
        let facets = match &e {
            RunnerError::UnknownEntityType(_) | RunnerError::NoResolver(_) => vec![Facet::Invariant],
            RunnerError::NoCollectionLoader { .. } => vec![Facet::Invariant],
            RunnerError::LoaderDepsNotSupported(_) => vec![Facet::NotImplemented],
            RunnerError::FieldNotLoaded(_) => vec![Facet::Invariant],
            RunnerError::LoaderResultNotAvailable(_) => vec![Facet::NotFound],
            RunnerError::BatchKeyMissing(_) | RunnerError::BatchEmpty => vec![Facet::Invariant],
            RunnerError::ContextBuildFailed(_) => vec![Facet::BadInput],
            RunnerError::Store(_) => vec![Facet::Retryable],
            RunnerError::LoaderFailed(_) => vec![Facet::Retryable],
        };
        CoreError::new("task_runner", facets, e.to_string())
    }
}

/// Errors raised by the RefKey parser/printer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RefKeyError {
    #[error("malformed ref key: {0:?}")]
    Malformed(String),
}

impl From<RefKeyError> for CoreError {
    fn from(e: RefKeyError) -> Self {
        CoreError::new("ref_key", vec![Facet::BadInput], e.to_string())
    }
}

/// Errors raised by the federation RPC / Unix socket transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("no such request target: {0}")]
    UnknownTarget(String),
    #[error("request {0} received a response but no caller is awaiting it")]
    OrphanResponse(String),
    #[error("connection closed before a response for request {0} arrived")]
    ConnectionClosed(String),
}

impl From<TransportError> for CoreError {
    fn from(e: TransportError) -> Self {
        let facets = match &e {
            TransportError::UnknownTarget(_) => vec![Facet::NotFound],
            _ => vec![Facet::Retryable],
        };
        CoreError::new("transport", facets, e.to_string())
    }
}
