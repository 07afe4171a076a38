//! Declarative endpoint descriptions consumed by the cache engine.

use std::fmt;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::api::error::ApiError;

/// Invalidation label. A tag without `id` matches every tag of its kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    pub kind: &'static str,
    pub id: Option<String>,
}

impl Tag {
    pub fn kind(kind: &'static str) -> Self {
        Self { kind, id: None }
    }

    pub fn with_id(kind: &'static str, id: impl ToString) -> Self {
        Self {
            kind,
            id: Some(id.to_string()),
        }
    }

    /// Whether invalidating `self` affects an entry that provided `provided`.
    pub fn matches(&self, provided: &Tag) -> bool {
        self.kind == provided.kind && (self.id.is_none() || self.id == provided.id)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Request relative to the API's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub path: String,
    pub method: Method,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            params: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            method: Method::POST,
            params: Vec::new(),
            body: Some(body),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }
}

/// Cache identity of one query: `"{endpoint}({json arg})"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(endpoint: &str, arg: &Value) -> Self {
        Self(format!("{}({})", endpoint, arg))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A read operation. Results are cached per distinct argument.
pub trait QueryEndpoint: Clone + Send + Sync + 'static {
    type Arg: Serialize + Clone + Send + Sync + 'static;
    type Output: DeserializeOwned + Send + 'static;

    /// Endpoint name, used in cache keys and action types.
    const NAME: &'static str;

    fn request(&self, arg: &Self::Arg) -> RequestSpec;

    /// Tags attached to the cache entry once a fetch settles.
    ///
    /// Also called with neither result nor error when the entry is created,
    /// so invalidations that arrive before the first settlement still match.
    fn provides_tags(
        &self,
        _result: Option<&Self::Output>,
        _error: Option<&ApiError>,
        _arg: &Self::Arg,
    ) -> Vec<Tag> {
        Vec::new()
    }
}

/// A write operation. Never cached; may invalidate query tags on success.
pub trait MutationEndpoint: Clone + Send + Sync + 'static {
    type Arg: Serialize + Clone + Send + Sync + 'static;
    type Output: DeserializeOwned + Send + 'static;

    const NAME: &'static str;

    fn request(&self, arg: &Self::Arg) -> RequestSpec;

    fn invalidates_tags(&self, _result: &Self::Output, _arg: &Self::Arg) -> Vec<Tag> {
        Vec::new()
    }
}

pub(crate) fn serialize_arg<T: Serialize>(endpoint: &str, arg: &T) -> Value {
    match serde_json::to_value(arg) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(endpoint, error = %err, "Failed to serialize endpoint argument");
            Value::Null
        }
    }
}

/// Check that `data` has the endpoint's output shape.
pub(crate) fn decode<T: DeserializeOwned>(data: &Value, status: u16) -> Result<T, ApiError> {
    T::deserialize(data).map_err(|err| ApiError::Parsing {
        original_status: status,
        data: data.to_string(),
        message: err.to_string(),
    })
}
