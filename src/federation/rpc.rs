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

//! JSONL wire records for the federation RPC boundary: one JSON value per
//! line, UTF-8, newline-terminated.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Facet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcScope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: String,
    pub target: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<RpcScope>,
}

/// A serialised error, round-trippable so `is`-by-definition and
/// `has`-by-facet continue to work after crossing the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedError {
    pub boundary: String,
    pub facets: Vec<Facet>,
    pub message: String,
    #[serde(default)]
    pub data: std::collections::BTreeMap<String, Value>,
    pub cause: Option<Box<SerializedError>>,
}

impl From<CoreError> for SerializedError {
    fn from(e: CoreError) -> Self {
        Self {
            boundary: e.boundary,
            facets: e.facets,
            message: e.message,
            data: e.data,
            cause: e.cause.map(|c| Box::new(SerializedError::from(*c))),
        }
    }
}

impl From<SerializedError> for CoreError {
    fn from(e: SerializedError) -> Self {
        CoreError {
            boundary: e.boundary,
            facets: e.facets,
            message: e.message,
            data: e.data,
            cause: e.cause.map(|c| Box::new(CoreError::from(*c))),
        }
    }
}

/// `{id, ok:true, result}` or `{id, ok:false, error}`. `ok` carries a JSON
/// boolean, not a string tag, so this is serialised by hand rather than
/// via `#[serde(tag = ...)]` (which only tags on string discriminants).
#[derive(Debug, Clone)]
pub enum RpcResponse {
    Ok { id: String, result: Value },
    Err { id: String, error: SerializedError },
}

impl RpcResponse {
    pub fn id(&self) -> &str {
        match self {
            RpcResponse::Ok { id, .. } => id,
            RpcResponse::Err { id, .. } => id,
        }
    }

    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        RpcResponse::Ok { id: id.into(), result }
    }

    pub fn err(id: impl Into<String>, error: CoreError) -> Self {
        RpcResponse::Err {
            id: id.into(),
            error: error.into(),
        }
    }
}

impl Serialize for RpcResponse {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(3))?;
        match self {
            RpcResponse::Ok { id, result } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("result", result)?;
            }
            RpcResponse::Err { id, error } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("error", error)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RpcResponse {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            id: String,
            ok: bool,
            #[serde(default)]
            result: Option<Value>,
            #[serde(default)]
            error: Option<SerializedError>,
        }
        let raw = Raw::deserialize(deserializer)?;
        if raw.ok {
            Ok(RpcResponse::Ok {
                id: raw.id,
                result: raw.result.unwrap_or(Value::Null),
            })
        } else {
            Ok(RpcResponse::Err {
                id: raw.id,
                error: raw.error.ok_or_else(|| serde::de::Error::missing_field("error"))?,
            })
        }
    }
}
