use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed OpenAPI contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSpec {
    /// Source file name, when loaded from disk.
    pub filename: Option<String>,
    /// The `openapi` version string (e.g. "3.0.3").
    pub version: String,
    /// The `info.title` field.
    pub title: String,
    /// The `info.version` field.
    pub api_version: String,
    /// Every path + method pair declared by the contract.
    pub operations: Vec<Operation>,
}

/// A single API operation (path + method).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// The path template (e.g. "/pets/{id}").
    pub path: String,
    /// The HTTP method (uppercase).
    pub method: String,
    /// The OpenAPI operationId, if present.
    pub operation_id: Option<String>,
    /// Path-level and operation-level parameters, merged.
    pub parameters: Vec<Parameter>,
    /// Request body definition.
    pub request_body: Option<RequestBody>,
    /// Declared responses keyed by status key ("200", "4XX", "default").
    pub responses: BTreeMap<String, ResponseSpec>,
}

/// A parameter definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// One of "path", "query", "header", "cookie".
    pub location: String,
    pub required: bool,
    /// JSON Schema with every `$ref` inlined.
    pub schema: Option<serde_json::Value>,
}

/// Request body definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    /// Media type -> schema.
    pub content: BTreeMap<String, ContentSchema>,
}

/// Schema attached to a media type entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSchema {
    pub schema: Option<serde_json::Value>,
}

/// A declared response for one status key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// Header name -> definition.
    pub headers: BTreeMap<String, ResponseHeader>,
    /// Media type -> schema. Empty means the body is unconstrained.
    pub content: BTreeMap<String, ContentSchema>,
}

/// A declared response header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub required: bool,
    pub schema: Option<serde_json::Value>,
}
