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

//! The storage boundary the runner writes into and reads pages from.
//! Treated as a black-box interface; this crate provides no concrete
//! implementation, only the trait a caller's storage layer must satisfy.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreError;
use crate::ref_key::Ref;

/// One field/value pair the runner asks an `Engine` to persist for a ref.
pub type EntityInput = std::collections::BTreeMap<String, Value>;

/// Cursor-based pagination request.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub limit: u32,
}

/// One page of results plus a continuation cursor.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub cursor: Option<String>,
}

/// What a page of entities should contain.
#[derive(Debug, Clone)]
pub enum Projection {
    /// Just the refs, no field data.
    Refs,
    /// Refs plus a specific set of fields.
    Select(Vec<String>),
    /// Refs plus every field currently stored.
    All,
}

/// A batch of per-ref results, keyed by ref; batched loaders may omit refs
/// they have no data for.
pub struct Batch<V, K> {
    entries: std::collections::HashMap<K, V>,
}

impl<V, K: std::hash::Hash + Eq> Batch<V, K> {
    pub fn new() -> Self {
        Self {
            entries: std::collections::HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}

impl<V, K: std::hash::Hash + Eq> Default for Batch<V, K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait Engine: Send + Sync {
    async fn load(&self, entity_ref: &Ref, fields: &[String]) -> Result<EntityInput, CoreError>;

    async fn store(&self, entity_ref: &Ref, input: EntityInput) -> Result<(), CoreError>;

    async fn load_page(
        &self,
        entity_type: &str,
        projection: Projection,
        request: PageRequest,
    ) -> Result<Page<Ref>, CoreError>;

    async fn query(&self, entity_type: &str, filter: &str) -> Result<Vec<Ref>, CoreError>;
}
