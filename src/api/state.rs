use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::SystemTime;

use serde_json::Value;
use uuid::Uuid;

use crate::api::endpoint::{CacheKey, Tag};
use crate::api::error::ApiError;
use crate::store::SliceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Uninitialized,
    Pending,
    Fulfilled,
    Rejected,
}

/// Cached result of one query endpoint for one serialized argument.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEntry {
    pub endpoint: &'static str,
    pub arg: Value,
    pub status: FetchStatus,
    pub data: Option<Value>,
    pub error: Option<ApiError>,
    /// Id of the fetch whose settlement this entry accepts.
    pub request_id: Option<Uuid>,
    pub subscribers: BTreeSet<Uuid>,
    pub tags: BTreeSet<Tag>,
    /// Set by tag invalidation; cleared when the next fetch starts.
    pub stale: bool,
    pub started_at: Option<SystemTime>,
    pub fulfilled_at: Option<SystemTime>,
}

impl QueryEntry {
    pub fn new(endpoint: &'static str, arg: Value) -> Self {
        Self {
            endpoint,
            arg,
            status: FetchStatus::Uninitialized,
            data: None,
            error: None,
            request_id: None,
            subscribers: BTreeSet::new(),
            tags: BTreeSet::new(),
            stale: false,
            started_at: None,
            fulfilled_at: None,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether a new subscriber should trigger a fetch.
    pub fn needs_fetch(&self) -> bool {
        self.stale
            || matches!(
                self.status,
                FetchStatus::Uninitialized | FetchStatus::Rejected
            )
    }

    pub fn provides_any(&self, invalidated: &[Tag]) -> bool {
        invalidated
            .iter()
            .any(|tag| self.tags.iter().any(|provided| tag.matches(provided)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationEntry {
    pub endpoint: &'static str,
    pub arg: Value,
    pub status: FetchStatus,
    pub data: Option<Value>,
    pub error: Option<ApiError>,
    pub started_at: SystemTime,
}

/// Connectivity flags driven by lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiConfigState {
    pub online: bool,
    pub focused: bool,
}

impl Default for ApiConfigState {
    fn default() -> Self {
        Self {
            online: true,
            focused: true,
        }
    }
}

/// Slice state owned by one API engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiState {
    pub queries: HashMap<CacheKey, Arc<QueryEntry>>,
    pub mutations: HashMap<Uuid, Arc<MutationEntry>>,
    pub config: ApiConfigState,
}

impl SliceState for ApiState {}

impl ApiState {
    pub fn query(&self, key: &CacheKey) -> Option<&QueryEntry> {
        self.queries.get(key).map(Arc::as_ref)
    }

    pub fn mutation(&self, request_id: &Uuid) -> Option<&MutationEntry> {
        self.mutations.get(request_id).map(Arc::as_ref)
    }

    /// Keys of entries whose provided tags match any of `tags`.
    pub fn keys_tagged(&self, tags: &[Tag]) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self
            .queries
            .iter()
            .filter(|(_, entry)| entry.provides_any(tags))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn subscribed_keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self
            .queries
            .iter()
            .filter(|(_, entry)| entry.subscriber_count() > 0)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}
