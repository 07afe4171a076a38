//! Generic fetch/cache/invalidate lifecycle shared by every API.
//!
//! One [`ApiEngine`] owns one API slice of the store. It issues network
//! requests on spawned tasks and reports their lifecycle back to the store
//! as `pending` / `fulfilled` / `rejected` actions. Per cache key it keeps
//! the recipe needed to refetch, the in-flight request (for
//! de-duplication) and the eviction timer armed once the last subscriber
//! leaves.
//!
//! Locking rule: the runner map lock is never held across a dispatch.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::action::{ApiAction, LifecycleEvent};
use crate::api::base_query::{BaseQuery, RawResponse};
use crate::api::endpoint::{
    decode, serialize_arg, CacheKey, MutationEndpoint, QueryEndpoint, RequestSpec, Tag,
};
use crate::api::error::ApiError;
use crate::api::hooks::{MutationHandle, MutationHook, QueryHook};
use crate::api::state::ApiState;
use crate::store::{AppAction, AppState, Middleware, Store};

/// Where an API lives and how to reach it.
#[derive(Debug, Clone)]
pub struct ApiDefinition {
    /// Name of the store slice this API owns, e.g. `quotesApi`.
    pub reducer_path: &'static str,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// How long an unsubscribed entry is retained before eviction.
    pub keep_unused_data_for: Duration,
    pub refetch_on_focus: bool,
    pub refetch_on_reconnect: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            keep_unused_data_for: Duration::from_secs(60),
            refetch_on_focus: true,
            refetch_on_reconnect: true,
        }
    }
}

pub(crate) type Settlement = Result<Value, ApiError>;

type SettleFn = dyn Fn(Result<RawResponse, ApiError>) -> (Settlement, Vec<Tag>) + Send + Sync;

/// Everything needed to (re)issue the request behind one cache key.
struct QueryRecipe {
    endpoint: &'static str,
    arg: Value,
    request: RequestSpec,
    /// Tags the entry will provide, known before any response arrives.
    expected_tags: Vec<Tag>,
    /// Validates the body against the endpoint output and computes tags.
    settle: Box<SettleFn>,
}

impl QueryRecipe {
    fn new<E: QueryEndpoint>(endpoint: E, arg: E::Arg, arg_json: Value) -> Self {
        let request = endpoint.request(&arg);
        let expected_tags = endpoint.provides_tags(None, None, &arg);
        let settle = move |raw: Result<RawResponse, ApiError>| {
            let decoded = raw.and_then(|raw| {
                decode::<E::Output>(&raw.data, raw.status).map(|output| (raw.data, output))
            });
            match decoded {
                Ok((data, output)) => {
                    let tags = endpoint.provides_tags(Some(&output), None, &arg);
                    (Ok(data), tags)
                }
                Err(error) => {
                    let tags = endpoint.provides_tags(None, Some(&error), &arg);
                    (Err(error), tags)
                }
            }
        };
        Self {
            endpoint: E::NAME,
            arg: arg_json,
            request,
            expected_tags,
            settle: Box::new(settle),
        }
    }

    fn provides_any(&self, invalidated: &[Tag]) -> bool {
        invalidated
            .iter()
            .any(|tag| self.expected_tags.iter().any(|provided| tag.matches(provided)))
    }
}

struct InFlight {
    request_id: Uuid,
    settled: watch::Receiver<Option<Settlement>>,
}

struct QueryRunner {
    recipe: Arc<QueryRecipe>,
    inflight: Option<InFlight>,
    eviction: Option<JoinHandle<()>>,
    /// Set when an invalidation or lifecycle refetch arrives while a request
    /// is in flight; the request is reissued once that one settles.
    refetch_after_settle: bool,
    /// Bumped on every new subscription; an eviction armed under an older
    /// generation is void.
    generation: u64,
}

struct PendingFetch {
    request_id: Uuid,
    sender: watch::Sender<Option<Settlement>>,
    recipe: Arc<QueryRecipe>,
}

impl QueryRunner {
    fn new(recipe: Arc<QueryRecipe>) -> Self {
        Self {
            recipe,
            inflight: None,
            eviction: None,
            refetch_after_settle: false,
            generation: 0,
        }
    }

    /// Reserve the in-flight slot. `None` when a request is already running.
    fn begin_fetch(&mut self) -> Option<PendingFetch> {
        if self.inflight.is_some() {
            return None;
        }
        let request_id = Uuid::new_v4();
        let (sender, settled) = watch::channel(None);
        self.inflight = Some(InFlight {
            request_id,
            settled,
        });
        Some(PendingFetch {
            request_id,
            sender,
            recipe: Arc::clone(&self.recipe),
        })
    }
}

pub(crate) struct EngineInner {
    reducer_path: &'static str,
    store: Store,
    base_query: BaseQuery,
    options: CacheOptions,
    runners: Mutex<HashMap<CacheKey, QueryRunner>>,
}

/// Cache-lifecycle engine for one API slice.
#[derive(Clone)]
pub struct ApiEngine {
    inner: Arc<EngineInner>,
}

impl ApiEngine {
    /// Build the engine and install its middleware on `store`.
    pub fn new(
        store: &Store,
        definition: ApiDefinition,
        options: CacheOptions,
    ) -> Result<Self, reqwest::Error> {
        let base_query = BaseQuery::new(definition.base_url, definition.timeout)?;
        let inner = Arc::new(EngineInner {
            reducer_path: definition.reducer_path,
            store: store.clone(),
            base_query,
            options: options.clone(),
            runners: Mutex::new(HashMap::new()),
        });
        store.add_middleware(Arc::new(EngineMiddleware {
            reducer_path: definition.reducer_path,
            options,
            engine: Arc::downgrade(&inner),
        }));
        Ok(Self { inner })
    }

    pub fn base_url(&self) -> &str {
        self.inner.base_query.base_url()
    }

    /// This API's slice of the current snapshot.
    pub fn slice(&self) -> Arc<ApiState> {
        self.inner.slice()
    }

    /// Subscribe to `endpoint(arg)`, fetching unless a usable result is
    /// cached or a request for the same key is already in flight.
    ///
    /// The subscription lasts as long as the returned hook.
    pub fn query<E: QueryEndpoint>(&self, endpoint: E, arg: E::Arg) -> QueryHook<E> {
        let arg_json = serialize_arg(E::NAME, &arg);
        let key = CacheKey::new(E::NAME, &arg_json);
        let subscription = Uuid::new_v4();

        let fetch = {
            let mut runners = self.inner.runners.lock();
            let runner = runners.entry(key.clone()).or_insert_with(|| {
                QueryRunner::new(Arc::new(QueryRecipe::new(
                    endpoint,
                    arg,
                    arg_json.clone(),
                )))
            });
            runner.generation += 1;
            if let Some(timer) = runner.eviction.take() {
                timer.abort();
            }
            let needs_fetch = self
                .inner
                .slice()
                .query(&key)
                .is_none_or(|entry| entry.needs_fetch());
            if needs_fetch {
                runner.begin_fetch()
            } else {
                None
            }
        };

        self.inner.dispatch(ApiAction::SubscriptionAdded {
            key: key.clone(),
            endpoint: E::NAME,
            arg: arg_json,
            subscription,
        });
        if let Some(fetch) = fetch {
            self.inner.launch(key.clone(), fetch);
        }

        QueryHook::new(self.clone(), key, subscription)
    }

    pub fn mutation<E: MutationEndpoint>(&self, endpoint: E) -> MutationHook<E> {
        MutationHook::new(self.clone(), endpoint)
    }

    /// Mark every entry providing one of `tags` stale. Subscribed entries
    /// refetch right away; the rest refetch when next subscribed.
    pub fn invalidate_tags(&self, tags: Vec<Tag>) {
        self.inner.dispatch(ApiAction::InvalidateTags { tags });
    }

    /// Refetch every entry that currently has subscribers.
    pub fn refetch_subscribed(&self) {
        let slice = self.inner.slice();
        self.inner.refetch_subscribed(&slice);
    }

    /// Whether a request for `key` is currently running.
    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.inner
            .runners
            .lock()
            .get(key)
            .is_some_and(|runner| runner.inflight.is_some())
    }

    pub(crate) fn refetch(&self, key: &CacheKey) -> bool {
        self.inner.refetch(key)
    }

    pub(crate) fn settlement_receiver(
        &self,
        key: &CacheKey,
    ) -> Option<watch::Receiver<Option<Settlement>>> {
        self.inner
            .runners
            .lock()
            .get(key)
            .and_then(|runner| runner.inflight.as_ref())
            .map(|inflight| inflight.settled.clone())
    }

    pub(crate) fn unsubscribe(&self, key: &CacheKey, subscription: Uuid) {
        self.inner.unsubscribe(key, subscription);
    }

    pub(crate) fn remove_mutation(&self, request_id: Uuid) {
        self.inner
            .dispatch(ApiAction::MutationRemoved { request_id });
    }

    pub(crate) fn start_mutation<E: MutationEndpoint>(
        &self,
        endpoint: &E,
        arg: E::Arg,
    ) -> MutationHandle<E::Output> {
        let request_id = Uuid::new_v4();
        let request = endpoint.request(&arg);
        self.inner.dispatch(ApiAction::MutationPending {
            request_id,
            endpoint: E::NAME,
            arg: serialize_arg(E::NAME, &arg),
        });

        let (sender, settled) = oneshot::channel();
        let Ok(runtime) = Handle::try_current() else {
            let error = ApiError::no_runtime();
            self.inner.dispatch(ApiAction::MutationRejected {
                request_id,
                error: error.clone(),
            });
            let _ = sender.send(Err(error));
            return MutationHandle::new(request_id, settled);
        };

        let engine = Arc::clone(&self.inner);
        let endpoint = endpoint.clone();
        runtime.spawn(async move {
            let decoded = engine.base_query.execute(&request).await.and_then(|raw| {
                decode::<E::Output>(&raw.data, raw.status).map(|output| (raw.data, output))
            });
            match decoded {
                Ok((data, output)) => {
                    let invalidates = endpoint.invalidates_tags(&output, &arg);
                    tracing::debug!(
                        api = engine.reducer_path,
                        endpoint = E::NAME,
                        request_id = %request_id,
                        invalidates = invalidates.len(),
                        "Mutation fulfilled"
                    );
                    engine.dispatch(ApiAction::MutationFulfilled {
                        request_id,
                        data,
                        invalidates,
                    });
                    let _ = sender.send(Ok(output));
                }
                Err(error) => {
                    tracing::warn!(
                        api = engine.reducer_path,
                        endpoint = E::NAME,
                        request_id = %request_id,
                        error = %error,
                        "Mutation rejected"
                    );
                    engine.dispatch(ApiAction::MutationRejected {
                        request_id,
                        error: error.clone(),
                    });
                    let _ = sender.send(Err(error));
                }
            }
        });

        MutationHandle::new(request_id, settled)
    }
}

impl EngineInner {
    fn dispatch(&self, action: ApiAction) {
        self.store.dispatch(AppAction::Api {
            reducer_path: self.reducer_path,
            action,
        });
    }

    fn slice(&self) -> Arc<ApiState> {
        self.store
            .get_state()
            .api(self.reducer_path)
            .cloned()
            .unwrap_or_default()
    }

    /// Dispatch `pending` and spawn the request for a reserved fetch.
    fn launch(self: &Arc<Self>, key: CacheKey, fetch: PendingFetch) {
        let PendingFetch {
            request_id,
            sender,
            recipe,
        } = fetch;

        self.dispatch(ApiAction::QueryPending {
            key: key.clone(),
            endpoint: recipe.endpoint,
            arg: recipe.arg.clone(),
            request_id,
        });
        tracing::debug!(api = self.reducer_path, key = %key, request_id = %request_id, "Query started");

        let Ok(runtime) = Handle::try_current() else {
            let (settlement, tags) = (recipe.settle)(Err(ApiError::no_runtime()));
            self.settle(key, request_id, settlement, tags, sender);
            return;
        };

        let engine = Arc::clone(self);
        runtime.spawn(async move {
            let raw = engine.base_query.execute(&recipe.request).await;
            let (settlement, tags) = (recipe.settle)(raw);
            engine.settle(key, request_id, settlement, tags, sender);
        });
    }

    fn settle(
        self: &Arc<Self>,
        key: CacheKey,
        request_id: Uuid,
        settlement: Settlement,
        tags: Vec<Tag>,
        sender: watch::Sender<Option<Settlement>>,
    ) {
        match &settlement {
            Ok(data) => {
                tracing::debug!(api = self.reducer_path, key = %key, request_id = %request_id, "Query fulfilled");
                self.dispatch(ApiAction::QueryFulfilled {
                    key: key.clone(),
                    request_id,
                    data: data.clone(),
                    tags,
                });
            }
            Err(error) => {
                tracing::warn!(
                    api = self.reducer_path,
                    key = %key,
                    request_id = %request_id,
                    error = %error,
                    "Query rejected"
                );
                self.dispatch(ApiAction::QueryRejected {
                    key: key.clone(),
                    request_id,
                    error: error.clone(),
                    tags,
                });
            }
        }

        // Release the in-flight slot only after the store holds the result,
        // so late joiners never see a pending entry without a request.
        let subscribed = self
            .slice()
            .query(&key)
            .is_some_and(|entry| entry.subscriber_count() > 0);
        let (evict_now, follow_up) = {
            let mut runners = self.runners.lock();
            match runners.get_mut(&key) {
                Some(runner) => {
                    if runner
                        .inflight
                        .as_ref()
                        .is_some_and(|inflight| inflight.request_id == request_id)
                    {
                        runner.inflight = None;
                    }
                    let deferred = std::mem::take(&mut runner.refetch_after_settle);
                    if subscribed {
                        let follow_up = if deferred { runner.begin_fetch() } else { None };
                        (false, follow_up)
                    } else {
                        // Unsubscribed entries stay stale and refetch on next access.
                        (self.arm_eviction(&key, runner), None)
                    }
                }
                None => (false, None),
            }
        };
        if evict_now {
            self.evict(&key, None);
        }
        // Reissue before waking waiters, so a waiter that asks again joins
        // the new request.
        if let Some(fetch) = follow_up {
            tracing::debug!(api = self.reducer_path, key = %key, "Refetching query invalidated while in flight");
            self.launch(key.clone(), fetch);
        }

        let _ = sender.send(Some(settlement));
    }

    fn refetch(self: &Arc<Self>, key: &CacheKey) -> bool {
        let fetch = self
            .runners
            .lock()
            .get_mut(key)
            .and_then(QueryRunner::begin_fetch);
        match fetch {
            Some(fetch) => {
                self.launch(key.clone(), fetch);
                true
            }
            None => false,
        }
    }

    /// Like `refetch`, but a request already in flight is followed by a
    /// fresh one once it settles instead of being reused.
    fn refetch_or_defer(self: &Arc<Self>, key: &CacheKey) -> bool {
        let fetch = {
            let mut runners = self.runners.lock();
            let Some(runner) = runners.get_mut(key) else {
                return false;
            };
            if runner.inflight.is_some() {
                runner.refetch_after_settle = true;
                tracing::debug!(api = self.reducer_path, key = %key, "Request in flight, refetching after it settles");
                None
            } else {
                runner.begin_fetch()
            }
        };
        match fetch {
            Some(fetch) => {
                self.launch(key.clone(), fetch);
                true
            }
            None => false,
        }
    }

    fn refetch_subscribed(self: &Arc<Self>, slice: &ApiState) {
        for key in slice.subscribed_keys() {
            if self.refetch_or_defer(&key) {
                tracing::debug!(api = self.reducer_path, key = %key, "Refetching subscribed query");
            }
        }
    }

    fn invalidate(self: &Arc<Self>, slice: &ApiState, tags: &[Tag]) {
        let mut keys = slice.keys_tagged(tags);
        // A first fetch has no settled tags yet; match on what it will provide.
        {
            let runners = self.runners.lock();
            for (key, runner) in runners.iter() {
                if runner.inflight.is_some()
                    && !keys.contains(key)
                    && runner.recipe.provides_any(tags)
                {
                    keys.push(key.clone());
                }
            }
        }
        keys.sort();
        if keys.is_empty() {
            return;
        }
        tracing::debug!(
            api = self.reducer_path,
            tags = ?tags,
            entries = keys.len(),
            "Invalidating cached queries"
        );

        self.dispatch(ApiAction::QueriesInvalidated { keys: keys.clone() });
        for key in keys {
            let subscribed = slice
                .query(&key)
                .is_some_and(|entry| entry.subscriber_count() > 0);
            if subscribed {
                self.refetch_or_defer(&key);
            }
        }
    }

    fn unsubscribe(self: &Arc<Self>, key: &CacheKey, subscription: Uuid) {
        self.dispatch(ApiAction::SubscriptionRemoved {
            key: key.clone(),
            subscription,
        });

        // Armed regardless of the remaining count: the timer re-checks
        // subscribers when it fires.
        let evict_now = {
            let mut runners = self.runners.lock();
            match runners.get_mut(key) {
                Some(runner) if runner.inflight.is_none() => self.arm_eviction(key, runner),
                _ => false,
            }
        };
        if evict_now {
            self.evict(key, None);
        }
    }

    /// Start the retention timer. Returns `true` when there is no runtime
    /// to run it on and the caller should evict immediately.
    fn arm_eviction(self: &Arc<Self>, key: &CacheKey, runner: &mut QueryRunner) -> bool {
        let Ok(runtime) = Handle::try_current() else {
            return true;
        };
        if let Some(timer) = runner.eviction.take() {
            timer.abort();
        }

        let engine: Weak<EngineInner> = Arc::downgrade(self);
        let generation = runner.generation;
        let delay = self.options.keep_unused_data_for;
        let key = key.clone();
        runner.eviction = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(engine) = engine.upgrade() {
                engine.evict(&key, Some(generation));
            }
        }));
        false
    }

    /// Drop the entry if it is still idle and unsubscribed.
    fn evict(&self, key: &CacheKey, generation: Option<u64>) {
        let unsubscribed = self
            .slice()
            .query(key)
            .is_none_or(|entry| entry.subscriber_count() == 0);
        let removed = {
            let mut runners = self.runners.lock();
            let idle = runners.get(key).is_some_and(|runner| {
                runner.inflight.is_none() && generation.is_none_or(|g| g == runner.generation)
            });
            if idle && unsubscribed {
                runners.remove(key);
                true
            } else {
                false
            }
        };
        if removed {
            tracing::debug!(api = self.reducer_path, key = %key, "Evicting unused query");
            self.dispatch(ApiAction::QueryEvicted { key: key.clone() });
        }
    }
}

/// Reacts to actions that need follow-up network work.
struct EngineMiddleware {
    reducer_path: &'static str,
    options: CacheOptions,
    engine: Weak<EngineInner>,
}

impl Middleware for EngineMiddleware {
    fn after_reduce(&self, _store: &Store, action: &AppAction, state: &AppState) {
        let Some(engine) = self.engine.upgrade() else {
            return;
        };
        let Some(slice) = state.api(self.reducer_path) else {
            return;
        };

        match action {
            AppAction::Api {
                reducer_path,
                action,
            } if *reducer_path == self.reducer_path => match action {
                ApiAction::MutationFulfilled { invalidates, .. } if !invalidates.is_empty() => {
                    engine.invalidate(slice, invalidates);
                }
                ApiAction::InvalidateTags { tags } => engine.invalidate(slice, tags),
                _ => {}
            },
            AppAction::Lifecycle(LifecycleEvent::Focused) if self.options.refetch_on_focus => {
                engine.refetch_subscribed(slice);
            }
            AppAction::Lifecycle(LifecycleEvent::Online) if self.options.refetch_on_reconnect => {
                engine.refetch_subscribed(slice);
            }
            _ => {}
        }
    }
}
