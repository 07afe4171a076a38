use serde_json::Value;
use uuid::Uuid;

use crate::api::endpoint::{CacheKey, Tag};
use crate::api::error::ApiError;
use crate::store::Action;

/// Platform events that drive automatic refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Focused,
    Blurred,
    Online,
    Offline,
}

impl Action for LifecycleEvent {
    fn action_type(&self) -> String {
        let name = match self {
            LifecycleEvent::Focused => "lifecycle/focused",
            LifecycleEvent::Blurred => "lifecycle/unfocused",
            LifecycleEvent::Online => "lifecycle/online",
            LifecycleEvent::Offline => "lifecycle/offline",
        };
        name.to_string()
    }
}

/// Transitions of one API slice. Produced only by the cache engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiAction {
    SubscriptionAdded {
        key: CacheKey,
        endpoint: &'static str,
        arg: Value,
        subscription: Uuid,
    },
    SubscriptionRemoved {
        key: CacheKey,
        subscription: Uuid,
    },
    QueryPending {
        key: CacheKey,
        endpoint: &'static str,
        arg: Value,
        request_id: Uuid,
    },
    QueryFulfilled {
        key: CacheKey,
        request_id: Uuid,
        data: Value,
        tags: Vec<Tag>,
    },
    QueryRejected {
        key: CacheKey,
        request_id: Uuid,
        error: ApiError,
        tags: Vec<Tag>,
    },
    QueriesInvalidated {
        keys: Vec<CacheKey>,
    },
    QueryEvicted {
        key: CacheKey,
    },
    MutationPending {
        request_id: Uuid,
        endpoint: &'static str,
        arg: Value,
    },
    MutationFulfilled {
        request_id: Uuid,
        data: Value,
        invalidates: Vec<Tag>,
    },
    MutationRejected {
        request_id: Uuid,
        error: ApiError,
    },
    MutationRemoved {
        request_id: Uuid,
    },
    /// Handled by the engine middleware; the reducer leaves state alone.
    InvalidateTags {
        tags: Vec<Tag>,
    },
    Lifecycle(LifecycleEvent),
}

impl Action for ApiAction {
    fn action_type(&self) -> String {
        let name = match self {
            ApiAction::SubscriptionAdded { .. } => "subscriptions/add",
            ApiAction::SubscriptionRemoved { .. } => "subscriptions/remove",
            ApiAction::QueryPending { .. } => "executeQuery/pending",
            ApiAction::QueryFulfilled { .. } => "executeQuery/fulfilled",
            ApiAction::QueryRejected { .. } => "executeQuery/rejected",
            ApiAction::QueriesInvalidated { .. } => "queries/invalidated",
            ApiAction::QueryEvicted { .. } => "queries/removed",
            ApiAction::MutationPending { .. } => "executeMutation/pending",
            ApiAction::MutationFulfilled { .. } => "executeMutation/fulfilled",
            ApiAction::MutationRejected { .. } => "executeMutation/rejected",
            ApiAction::MutationRemoved { .. } => "mutations/removed",
            ApiAction::InvalidateTags { .. } => "util/invalidateTags",
            ApiAction::Lifecycle(event) => return event.action_type(),
        };
        name.to_string()
    }
}
