//! Operation catalog handed over by the route-description layer.
//!
//! The catalog carries only what schema assembly needs: for each operation
//! its path and method plus the observed request/response bodies, each body
//! pairing a descriptor with the example value's JSON encoding.
use serde::Deserialize;
use serde_json::Value;

use crate::descriptor::Descriptor;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_STATUS: u16 = 200;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Registered up front, whether or not an operation refers to them.
    #[serde(default)]
    pub components: Vec<Descriptor>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub requests: Vec<Body>,
    #[serde(default)]
    pub responses: Vec<Body>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub descriptor: Option<Descriptor>,
    /// Example value already encoded by the serialization layer.
    #[serde(default)]
    pub example: Option<Value>,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }

    /// GET and HEAD requests carry no body.
    pub fn accepts_body(self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl Body {
    pub fn status(&self) -> u16 {
        self.status.unwrap_or(DEFAULT_STATUS)
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}
