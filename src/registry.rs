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

//! Execution Registry: an index over a connector's resolvers, mapping
//! `(entityType, fieldName) -> loader` and `entityType -> resolver`. Built
//! once and looked up by the runner on every task dispatch.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::engine::{Batch, EntityInput, Page, PageRequest};
use crate::error::CoreError;
use crate::ref_key::Ref;

/// Arbitrary call-scoped state (credentials, http client, cancellation
/// token) threaded through every loader call. Opaque to the runner.
pub type LoaderContext = std::collections::HashMap<String, Value>;

#[async_trait]
pub trait EntityLoader: Send + Sync {
    async fn load(&self, entity_ref: &Ref, ctx: &LoaderContext) -> Result<EntityInput, CoreError>;
}

#[async_trait]
pub trait EntityBatchedLoader: Send + Sync {
    async fn load_batch(&self, refs: &[Ref], ctx: &LoaderContext) -> Result<Batch<EntityInput, Ref>, CoreError>;
}

#[async_trait]
pub trait CollectionLoader: Send + Sync {
    async fn load_page(
        &self,
        parent: &Ref,
        page_request: PageRequest,
        ctx: &LoaderContext,
    ) -> Result<Page<Ref>, CoreError>;
}

#[async_trait]
pub trait RawLoader: Send + Sync {
    async fn load(&self, ctx: &LoaderContext) -> Result<Value, CoreError>;
}

/// The four loader kinds a resolver can point a field at. Dispatch is by
/// `match` on this discriminator, not by dynamic inheritance.
pub enum LoaderKind {
    Entity(Box<dyn EntityLoader>),
    EntityBatched(Box<dyn EntityBatchedLoader>),
    Collection(Box<dyn CollectionLoader>),
    Raw(Box<dyn RawLoader>),
}

pub struct Loader {
    pub name: String,
    pub kind: LoaderKind,
    /// Loader-to-loader dependency is not supported in this implementation;
    /// the Task Runner fails fast if this is non-empty.
    pub depends_on: Vec<String>,
}

impl Loader {
    pub fn new(name: impl Into<String>, kind: LoaderKind) -> Self {
        Self {
            name: name.into(),
            kind,
            depends_on: Vec::new(),
        }
    }
}

/// Maps each field of its entity type to exactly one loader name.
pub trait Resolver: Send + Sync {
    fn entity_type(&self) -> &str;
    fn loader_for_field(&self, field: &str) -> Option<&str>;
}

/// Declares an entity type's known fields, chiefly for validation and
/// introspection; entity defs reference each other by name only (arena
/// style), never by embedding, so cyclic schemas (e.g. Channel<->Team)
/// are representable.
pub struct EntityDef {
    pub entity_type: String,
    pub fields: Vec<String>,
}

#[derive(Default)]
pub struct ExecutionRegistry {
    entities: HashMap<String, EntityDef>,
    resolvers: HashMap<String, Box<dyn Resolver>>,
    loaders: HashMap<String, Loader>,
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_entity(&mut self, def: EntityDef) -> &mut Self {
        self.entities.insert(def.entity_type.clone(), def);
        self
    }

    pub fn register_resolver(&mut self, resolver: Box<dyn Resolver>) -> &mut Self {
        self.resolvers.insert(resolver.entity_type().to_string(), resolver);
        self
    }

    pub fn register_loader(&mut self, loader: Loader) -> &mut Self {
        self.loaders.insert(loader.name.clone(), loader);
        self
    }

    pub fn get_entity(&self, entity_type: &str) -> Option<&EntityDef> {
        self.entities.get(entity_type)
    }

    pub fn get_resolver(&self, entity_type: &str) -> Option<&dyn Resolver> {
        self.resolvers.get(entity_type).map(|b| b.as_ref())
    }

    pub fn get_loader(&self, loader_name: &str) -> Option<&Loader> {
        self.loaders.get(loader_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver {
        entity_type: String,
        field_loaders: HashMap<String, String>,
    }

    impl Resolver for FixedResolver {
        fn entity_type(&self) -> &str {
            &self.entity_type
        }
        fn loader_for_field(&self, field: &str) -> Option<&str> {
            self.field_loaders.get(field).map(|s| s.as_str())
        }
    }

    #[test]
    fn registry_looks_up_by_name() {
        let mut registry = ExecutionRegistry::new();
        registry.register_entity(EntityDef {
            entity_type: "AcmeUser".to_string(),
            fields: vec!["displayName".to_string(), "email".to_string()],
        });
        let mut field_loaders = HashMap::new();
        field_loaders.insert("displayName".to_string(), "loadUsers".to_string());
        registry.register_resolver(Box::new(FixedResolver {
            entity_type: "AcmeUser".to_string(),
            field_loaders,
        }));

        assert!(registry.get_entity("AcmeUser").is_some());
        let resolver = registry.get_resolver("AcmeUser").unwrap();
        assert_eq!(resolver.loader_for_field("displayName"), Some("loadUsers"));
        assert_eq!(resolver.loader_for_field("unknownField"), None);
        assert!(registry.get_resolver("Nonexistent").is_none());
    }
}
