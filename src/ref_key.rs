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

//! Entity references and their stable string form, the `RefKey`.
//!
//! A [`Ref`] identifies an entity by `(entityType, id, scope)`. Two refs are
//! equal iff type and id match — scope is metadata, not identity. Modeled
//! as a flat tagged record rather than per-ref virtual methods, so entity
//! lookup stays a plain name-indexed table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RefKeyError;

/// Distinguishes a ref local to the current installation's store from one
/// that crosses an installation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Local,
    Installation(String),
}

/// A reference to an entity. Equality ignores `scope`: two refs naming the
/// same `(entity_type, id)` are the same entity regardless of which
/// installation the pointer was dereferenced through.
#[derive(Debug, Clone)]
pub struct Ref {
    pub entity_type: String,
    pub id: String,
    pub scope: Scope,
}

// Refs are (de)serialised as their RefKey string, not as a nested object:
// it's the wire-stable form, and parse/print are total inverses of it.
impl Serialize for Ref {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_key())
    }
}

impl<'de> Deserialize<'de> for Ref {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ref::parse_key(&s).map_err(serde::de::Error::custom)
    }
}

impl Ref {
    pub fn local(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
            scope: Scope::Local,
        }
    }

    pub fn installation(
        entity_type: impl Into<String>,
        id: impl Into<String>,
        installation_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
            scope: Scope::Installation(installation_id.into()),
        }
    }

    /// Render as a `RefKey` string: `"{entityType}:{id}"` for local scope,
    /// `"{entityType}:{id}@{installationId}"` for installation scope.
    pub fn to_key(&self) -> String {
        match &self.scope {
            Scope::Local => format!("{}:{}", self.entity_type, self.id),
            Scope::Installation(inst) => format!("{}:{}@{}", self.entity_type, self.id, inst),
        }
    }

    /// Parse a `RefKey` string produced by [`Ref::to_key`]. Parser and
    /// printer are total inverses.
    pub fn parse_key(s: &str) -> Result<Self, RefKeyError> {
        let (entity_type, rest) = s
            .split_once(':')
            .ok_or_else(|| RefKeyError::Malformed(s.to_string()))?;
        if entity_type.is_empty() {
            return Err(RefKeyError::Malformed(s.to_string()));
        }
        let (id, scope) = match rest.split_once('@') {
            Some((id, inst)) => {
                if id.is_empty() || inst.is_empty() {
                    return Err(RefKeyError::Malformed(s.to_string()));
                }
                (id, Scope::Installation(inst.to_string()))
            }
            None => {
                if rest.is_empty() {
                    return Err(RefKeyError::Malformed(s.to_string()));
                }
                (rest, Scope::Local)
            }
        };
        Ok(Self {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
            scope,
        })
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type && self.id == other.id
    }
}
impl Eq for Ref {}

impl std::hash::Hash for Ref {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.entity_type.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

impl FromStr for Ref {
    type Err = RefKeyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ref::parse_key(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_round_trips() {
        let r = Ref::local("AcmeUser", "u1");
        assert_eq!(r.to_key(), "AcmeUser:u1");
        assert_eq!(Ref::parse_key(&r.to_key()).unwrap(), r);
    }

    #[test]
    fn installation_round_trips() {
        let r = Ref::installation("AcmeUser", "u1", "inst-42");
        assert_eq!(r.to_key(), "AcmeUser:u1@inst-42");
        let parsed = Ref::parse_key(&r.to_key()).unwrap();
        assert_eq!(parsed, r);
        assert_eq!(parsed.scope, Scope::Installation("inst-42".to_string()));
    }

    #[test]
    fn equality_ignores_scope() {
        let a = Ref::local("AcmeUser", "u1");
        let b = Ref::installation("AcmeUser", "u1", "inst-42");
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(Ref::parse_key("no-colon-here").is_err());
        assert!(Ref::parse_key(":u1").is_err());
        assert!(Ref::parse_key("AcmeUser:").is_err());
        assert!(Ref::parse_key("AcmeUser:u1@").is_err());
    }
}
