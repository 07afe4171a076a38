use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::SystemTime;

use crate::api::action::{ApiAction, LifecycleEvent};
use crate::api::endpoint::CacheKey;
use crate::api::state::{ApiConfigState, ApiState, FetchStatus, MutationEntry, QueryEntry};
use crate::store::Reducer;

pub struct ApiReducer;

impl Reducer for ApiReducer {
    type State = ApiState;
    type Action = ApiAction;

    fn reduce(state: Self::State, action: Self::Action) -> Self::State {
        match action {
            ApiAction::SubscriptionAdded {
                key,
                endpoint,
                arg,
                subscription,
            } => {
                let entry = state
                    .query(&key)
                    .cloned()
                    .unwrap_or_else(|| QueryEntry::new(endpoint, arg));
                let mut subscribers = entry.subscribers.clone();
                subscribers.insert(subscription);
                put_query(
                    state,
                    key,
                    QueryEntry {
                        subscribers,
                        ..entry
                    },
                )
            }
            ApiAction::SubscriptionRemoved { key, subscription } => {
                update_query(state, &key, |entry| {
                    let mut subscribers = entry.subscribers.clone();
                    subscribers.remove(&subscription);
                    Some(QueryEntry {
                        subscribers,
                        ..entry.clone()
                    })
                })
            }
            ApiAction::QueryPending {
                key,
                endpoint,
                arg,
                request_id,
            } => {
                let entry = state
                    .query(&key)
                    .cloned()
                    .unwrap_or_else(|| QueryEntry::new(endpoint, arg));
                put_query(
                    state,
                    key,
                    QueryEntry {
                        status: FetchStatus::Pending,
                        request_id: Some(request_id),
                        stale: false,
                        started_at: Some(SystemTime::now()),
                        ..entry
                    },
                )
            }
            ApiAction::QueryFulfilled {
                key,
                request_id,
                data,
                tags,
            } => update_query(state, &key, |entry| {
                if entry.request_id != Some(request_id) {
                    return None;
                }
                Some(QueryEntry {
                    status: FetchStatus::Fulfilled,
                    data: Some(data),
                    error: None,
                    tags: tags.into_iter().collect(),
                    fulfilled_at: Some(SystemTime::now()),
                    ..entry.clone()
                })
            }),
            ApiAction::QueryRejected {
                key,
                request_id,
                error,
                tags,
            } => update_query(state, &key, |entry| {
                if entry.request_id != Some(request_id) {
                    return None;
                }
                // Previously fetched data stays available next to the error.
                Some(QueryEntry {
                    status: FetchStatus::Rejected,
                    error: Some(error),
                    tags: tags.into_iter().collect::<BTreeSet<_>>(),
                    ..entry.clone()
                })
            }),
            ApiAction::QueriesInvalidated { keys } => {
                keys.iter().fold(state, |state, key| {
                    update_query(state, key, |entry| {
                        Some(QueryEntry {
                            stale: true,
                            ..entry.clone()
                        })
                    })
                })
            }
            ApiAction::QueryEvicted { key } => {
                let evictable = state
                    .query(&key)
                    .is_some_and(|e| e.subscriber_count() == 0 && e.status != FetchStatus::Pending);
                if !evictable {
                    return state;
                }
                let mut queries = state.queries;
                queries.remove(&key);
                ApiState { queries, ..state }
            }
            ApiAction::MutationPending {
                request_id,
                endpoint,
                arg,
            } => {
                let mut mutations = state.mutations;
                mutations.insert(
                    request_id,
                    Arc::new(MutationEntry {
                        endpoint,
                        arg,
                        status: FetchStatus::Pending,
                        data: None,
                        error: None,
                        started_at: SystemTime::now(),
                    }),
                );
                ApiState { mutations, ..state }
            }
            ApiAction::MutationFulfilled {
                request_id, data, ..
            } => update_mutation(state, request_id, |entry| MutationEntry {
                status: FetchStatus::Fulfilled,
                data: Some(data),
                error: None,
                ..entry.clone()
            }),
            ApiAction::MutationRejected { request_id, error } => {
                update_mutation(state, request_id, |entry| MutationEntry {
                    status: FetchStatus::Rejected,
                    error: Some(error),
                    ..entry.clone()
                })
            }
            ApiAction::MutationRemoved { request_id } => {
                let mut mutations = state.mutations;
                mutations.remove(&request_id);
                ApiState { mutations, ..state }
            }
            ApiAction::InvalidateTags { .. } => state,
            ApiAction::Lifecycle(event) => {
                let config = match event {
                    LifecycleEvent::Focused => ApiConfigState {
                        focused: true,
                        ..state.config
                    },
                    LifecycleEvent::Blurred => ApiConfigState {
                        focused: false,
                        ..state.config
                    },
                    LifecycleEvent::Online => ApiConfigState {
                        online: true,
                        ..state.config
                    },
                    LifecycleEvent::Offline => ApiConfigState {
                        online: false,
                        ..state.config
                    },
                };
                ApiState { config, ..state }
            }
        }
    }
}

fn put_query(state: ApiState, key: CacheKey, entry: QueryEntry) -> ApiState {
    let mut queries = state.queries;
    queries.insert(key, Arc::new(entry));
    ApiState { queries, ..state }
}

/// Replace an existing entry. `update` returning `None` leaves state as is.
fn update_query(
    state: ApiState,
    key: &CacheKey,
    update: impl FnOnce(&QueryEntry) -> Option<QueryEntry>,
) -> ApiState {
    let Some(next) = state.query(key).and_then(update) else {
        return state;
    };
    put_query(state, key.clone(), next)
}

fn update_mutation(
    state: ApiState,
    request_id: uuid::Uuid,
    update: impl FnOnce(&MutationEntry) -> MutationEntry,
) -> ApiState {
    let Some(next) = state.mutation(&request_id).map(update) else {
        return state;
    };
    let mut mutations = state.mutations;
    mutations.insert(request_id, Arc::new(next));
    ApiState { mutations, ..state }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoint::Tag;
    use crate::api::error::ApiError;
    use serde_json::json;
    use uuid::Uuid;

    fn key() -> CacheKey {
        CacheKey::new("getQuotes", &json!(10))
    }

    fn pending(request_id: Uuid) -> ApiState {
        ApiReducer::reduce(
            ApiState::default(),
            ApiAction::QueryPending {
                key: key(),
                endpoint: "getQuotes",
                arg: json!(10),
                request_id,
            },
        )
    }

    #[test]
    fn test_subscription_creates_uninitialized_entry() {
        let sub = Uuid::new_v4();
        let state = ApiReducer::reduce(
            ApiState::default(),
            ApiAction::SubscriptionAdded {
                key: key(),
                endpoint: "getQuotes",
                arg: json!(10),
                subscription: sub,
            },
        );
        let entry = state.query(&key()).unwrap();
        assert_eq!(entry.status, FetchStatus::Uninitialized);
        assert_eq!(entry.subscriber_count(), 1);
        assert!(entry.needs_fetch());
    }

    #[test]
    fn test_fulfilled_stores_data_and_tags() {
        let id = Uuid::new_v4();
        let state = ApiReducer::reduce(
            pending(id),
            ApiAction::QueryFulfilled {
                key: key(),
                request_id: id,
                data: json!({"quotes": []}),
                tags: vec![Tag::with_id("Quotes", 10)],
            },
        );
        let entry = state.query(&key()).unwrap();
        assert_eq!(entry.status, FetchStatus::Fulfilled);
        assert_eq!(entry.data, Some(json!({"quotes": []})));
        assert!(entry.tags.contains(&Tag::with_id("Quotes", 10)));
        assert!(!entry.needs_fetch());
    }

    #[test]
    fn test_settlement_of_superseded_request_is_ignored() {
        let old = Uuid::new_v4();
        let current = Uuid::new_v4();
        let state = ApiReducer::reduce(
            pending(old),
            ApiAction::QueryPending {
                key: key(),
                endpoint: "getQuotes",
                arg: json!(10),
                request_id: current,
            },
        );
        let state = ApiReducer::reduce(
            state,
            ApiAction::QueryFulfilled {
                key: key(),
                request_id: old,
                data: json!(1),
                tags: Vec::new(),
            },
        );
        let entry = state.query(&key()).unwrap();
        assert_eq!(entry.status, FetchStatus::Pending);
        assert_eq!(entry.data, None);
    }

    #[test]
    fn test_rejected_keeps_previous_data() {
        let first = Uuid::new_v4();
        let state = ApiReducer::reduce(
            pending(first),
            ApiAction::QueryFulfilled {
                key: key(),
                request_id: first,
                data: json!(1),
                tags: Vec::new(),
            },
        );
        let second = Uuid::new_v4();
        let state = ApiReducer::reduce(
            state,
            ApiAction::QueryPending {
                key: key(),
                endpoint: "getQuotes",
                arg: json!(10),
                request_id: second,
            },
        );
        let state = ApiReducer::reduce(
            state,
            ApiAction::QueryRejected {
                key: key(),
                request_id: second,
                error: ApiError::Timeout { seconds: 1 },
                tags: Vec::new(),
            },
        );
        let entry = state.query(&key()).unwrap();
        assert_eq!(entry.status, FetchStatus::Rejected);
        assert_eq!(entry.data, Some(json!(1)));
        assert_eq!(entry.error, Some(ApiError::Timeout { seconds: 1 }));
    }

    #[test]
    fn test_evict_skips_subscribed_entries() {
        let sub = Uuid::new_v4();
        let state = ApiReducer::reduce(
            ApiState::default(),
            ApiAction::SubscriptionAdded {
                key: key(),
                endpoint: "getQuotes",
                arg: json!(10),
                subscription: sub,
            },
        );
        let state = ApiReducer::reduce(state, ApiAction::QueryEvicted { key: key() });
        assert!(state.query(&key()).is_some());

        let state = ApiReducer::reduce(
            state,
            ApiAction::SubscriptionRemoved {
                key: key(),
                subscription: sub,
            },
        );
        let state = ApiReducer::reduce(state, ApiAction::QueryEvicted { key: key() });
        assert!(state.query(&key()).is_none());
    }

    #[test]
    fn test_invalidated_entries_are_stale_until_refetched() {
        let id = Uuid::new_v4();
        let state = ApiReducer::reduce(
            pending(id),
            ApiAction::QueryFulfilled {
                key: key(),
                request_id: id,
                data: json!(1),
                tags: Vec::new(),
            },
        );
        let state = ApiReducer::reduce(state, ApiAction::QueriesInvalidated { keys: vec![key()] });
        assert!(state.query(&key()).unwrap().needs_fetch());

        let state = ApiReducer::reduce(
            state,
            ApiAction::QueryPending {
                key: key(),
                endpoint: "getQuotes",
                arg: json!(10),
                request_id: Uuid::new_v4(),
            },
        );
        assert!(!state.query(&key()).unwrap().stale);
    }

    #[test]
    fn test_lifecycle_updates_config_flags() {
        let state = ApiReducer::reduce(
            ApiState::default(),
            ApiAction::Lifecycle(LifecycleEvent::Offline),
        );
        assert!(!state.config.online);
        let state = ApiReducer::reduce(state, ApiAction::Lifecycle(LifecycleEvent::Blurred));
        assert!(!state.config.focused);
        let state = ApiReducer::reduce(state, ApiAction::Lifecycle(LifecycleEvent::Online));
        assert!(state.config.online);
    }
}
