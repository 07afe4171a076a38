//! View-facing handles over cache entries.

use std::marker::PhantomData;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::api::endpoint::{decode, CacheKey, MutationEndpoint, QueryEndpoint};
use crate::api::engine::ApiEngine;
use crate::api::error::ApiError;
use crate::api::state::{FetchStatus, MutationEntry, QueryEntry};

/// Typed view of one query entry.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub status: FetchStatus,
    /// First load: pending with nothing cached yet.
    pub is_loading: bool,
    /// Any request in progress, including background refetches.
    pub is_fetching: bool,
    pub is_stale: bool,
}

impl<T: DeserializeOwned> QueryResult<T> {
    fn from_entry(entry: Option<&QueryEntry>) -> Self {
        let Some(entry) = entry else {
            return Self {
                data: None,
                error: None,
                status: FetchStatus::Uninitialized,
                is_loading: false,
                is_fetching: false,
                is_stale: false,
            };
        };
        let data = entry.data.as_ref().and_then(|v| decode::<T>(v, 200).ok());
        let is_fetching = entry.status == FetchStatus::Pending;
        Self {
            is_loading: is_fetching && data.is_none(),
            data,
            error: entry.error.clone(),
            status: entry.status,
            is_fetching,
            is_stale: entry.stale,
        }
    }
}

impl<T> QueryResult<T> {
    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Fulfilled
    }

    pub fn is_error(&self) -> bool {
        self.status == FetchStatus::Rejected
    }
}

/// Subscription to one query. Dropping it unsubscribes.
pub struct QueryHook<E: QueryEndpoint> {
    engine: ApiEngine,
    key: CacheKey,
    subscription: Uuid,
    _endpoint: PhantomData<fn() -> E>,
}

impl<E: QueryEndpoint> QueryHook<E> {
    pub(crate) fn new(engine: ApiEngine, key: CacheKey, subscription: Uuid) -> Self {
        Self {
            engine,
            key,
            subscription,
            _endpoint: PhantomData,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn result(&self) -> QueryResult<E::Output> {
        QueryResult::from_entry(self.engine.slice().query(&self.key))
    }

    /// Force a new request unless one is already in flight.
    pub fn refetch(&self) {
        self.engine.refetch(&self.key);
    }

    /// Wait for the current request (if any) and return the cached outcome.
    pub async fn settled(&self) -> Result<E::Output, ApiError> {
        if let Some(mut receiver) = self.engine.settlement_receiver(&self.key) {
            let settlement = match receiver.wait_for(Option::is_some).await {
                Ok(value) => (*value).clone(),
                Err(_) => None,
            };
            if let Some(settlement) = settlement {
                return settlement.and_then(|data| decode::<E::Output>(&data, 200));
            }
        }

        let slice = self.engine.slice();
        let Some(entry) = slice.query(&self.key) else {
            return Err(not_settled(&self.key));
        };
        match (entry.status, &entry.data, &entry.error) {
            (FetchStatus::Fulfilled, Some(data), _) => decode::<E::Output>(data, 200),
            (FetchStatus::Rejected, _, Some(error)) => Err(error.clone()),
            _ => Err(not_settled(&self.key)),
        }
    }
}

impl<E: QueryEndpoint> Drop for QueryHook<E> {
    fn drop(&mut self) {
        self.engine.unsubscribe(&self.key, self.subscription);
    }
}

fn not_settled(key: &CacheKey) -> ApiError {
    ApiError::Fetch {
        message: format!("query {} has no settled result", key),
    }
}

/// Typed view of the latest mutation triggered through a hook.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResult<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub status: FetchStatus,
    pub is_loading: bool,
}

impl<T: DeserializeOwned> MutationResult<T> {
    fn from_entry(entry: Option<&MutationEntry>) -> Self {
        match entry {
            Some(entry) => Self {
                data: entry.data.as_ref().and_then(|v| decode::<T>(v, 200).ok()),
                error: entry.error.clone(),
                status: entry.status,
                is_loading: entry.status == FetchStatus::Pending,
            },
            None => Self {
                data: None,
                error: None,
                status: FetchStatus::Uninitialized,
                is_loading: false,
            },
        }
    }
}

/// Settlement of one triggered mutation.
pub struct MutationHandle<T> {
    request_id: Uuid,
    settled: oneshot::Receiver<Result<T, ApiError>>,
}

impl<T> MutationHandle<T> {
    pub(crate) fn new(request_id: Uuid, settled: oneshot::Receiver<Result<T, ApiError>>) -> Self {
        Self {
            request_id,
            settled,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub async fn settled(self) -> Result<T, ApiError> {
        match self.settled.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ApiError::Fetch {
                message: "mutation task ended without a result".to_string(),
            }),
        }
    }
}

/// Trigger for one mutation endpoint; tracks the most recent request.
pub struct MutationHook<E: MutationEndpoint> {
    engine: ApiEngine,
    endpoint: E,
    last: Mutex<Option<Uuid>>,
}

impl<E: MutationEndpoint> MutationHook<E> {
    pub(crate) fn new(engine: ApiEngine, endpoint: E) -> Self {
        Self {
            engine,
            endpoint,
            last: Mutex::new(None),
        }
    }

    /// Fire the mutation. The previous request's entry is discarded.
    pub fn trigger(&self, arg: E::Arg) -> MutationHandle<E::Output> {
        let handle = self.engine.start_mutation(&self.endpoint, arg);
        let previous = self.last.lock().replace(handle.request_id());
        if let Some(previous) = previous {
            self.engine.remove_mutation(previous);
        }
        handle
    }

    pub fn result(&self) -> MutationResult<E::Output> {
        let last = *self.last.lock();
        let slice = self.engine.slice();
        MutationResult::from_entry(last.as_ref().and_then(|id| slice.mutation(id)))
    }

    pub fn is_loading(&self) -> bool {
        self.result().is_loading
    }

    pub fn reset(&self) {
        let last = self.last.lock().take();
        if let Some(request_id) = last {
            self.engine.remove_mutation(request_id);
        }
    }
}

impl<E: MutationEndpoint> Drop for MutationHook<E> {
    fn drop(&mut self) {
        self.reset();
    }
}
