//! Process-wide state container.
//!
//! Dispatches are serialized: the dispatching thread holds a re-entrant
//! lock for the whole reduce-and-notify cycle, so other threads queue up
//! behind it in arrival order. A dispatch issued from a listener or
//! middleware on the same thread is appended to the queue and applied
//! once the current action has finished notifying.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::store::snapshot::{AppAction, AppState, RootReducer};
use crate::store::{Action, Reducer};

/// Callback invoked with every published snapshot.
pub type Listener = Arc<dyn Fn(&AppState) + Send + Sync>;

/// Hook that runs after each action has been reduced and published.
///
/// Middleware performs side effects (network calls, timers) and feeds
/// results back through [`Store::dispatch`].
pub trait Middleware: Send + Sync {
    fn after_reduce(&self, store: &Store, action: &AppAction, state: &AppState);
}

#[derive(Default)]
struct DispatchQueue {
    pending: RefCell<VecDeque<AppAction>>,
    draining: Cell<bool>,
}

struct StoreInner {
    state: RwLock<Arc<AppState>>,
    queue: ReentrantMutex<DispatchQueue>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    middleware: RwLock<Vec<Arc<dyn Middleware>>>,
    next_listener_id: AtomicU64,
    version: AtomicU64,
}

/// Cheap-to-clone handle to the shared store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(Arc::new(initial)),
                queue: ReentrantMutex::new(DispatchQueue::default()),
                listeners: Mutex::new(Vec::new()),
                middleware: RwLock::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Current snapshot. Never partially updated.
    pub fn get_state(&self) -> Arc<AppState> {
        Arc::clone(&*self.inner.state.read())
    }

    /// Number of actions applied so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Apply an action synchronously.
    ///
    /// When called from inside a listener or middleware, the action is
    /// queued and applied before the outermost `dispatch` returns.
    pub fn dispatch(&self, action: impl Into<AppAction>) {
        let queue = self.inner.queue.lock();
        queue.pending.borrow_mut().push_back(action.into());
        if queue.draining.get() {
            return;
        }

        queue.draining.set(true);
        let _drain = scopeguard::guard(&queue.draining, |draining| draining.set(false));
        loop {
            let next = queue.pending.borrow_mut().pop_front();
            let Some(action) = next else {
                break;
            };
            self.apply(action);
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AppState) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst);
        let listener: Listener = Arc::new(listener);
        self.inner.listeners.lock().push((id, listener));
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    pub fn add_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.inner.middleware.write().push(middleware);
    }

    fn apply(&self, action: AppAction) {
        let previous = self.get_state();
        let next = Arc::new(RootReducer::reduce((*previous).clone(), action.clone()));
        *self.inner.state.write() = Arc::clone(&next);
        self.inner.version.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(action = %action.action_type(), "Action applied");

        // Snapshot the lists so callbacks may subscribe or unsubscribe.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }

        let middleware: Vec<Arc<dyn Middleware>> = self.inner.middleware.read().clone();
        for layer in middleware {
            layer.after_reduce(self, &action, &next);
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

/// Registration returned by [`Store::subscribe`].
///
/// Dropping it keeps the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    store: Weak<StoreInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.store.upgrade() {
            inner.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
