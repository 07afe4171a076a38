//! Orchestrators that read the store and dispatch counter transitions.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::api::ApiError;
use crate::cancel::CancelToken;
use crate::counter::action::CounterAction;
use crate::counter::selectors::select_count;
use crate::counter::source::CountSource;
use crate::store::Store;

/// Handle to one in-flight async increment.
pub struct AsyncIncrement {
    request_id: Uuid,
    settled: oneshot::Receiver<Result<i64, ApiError>>,
}

impl AsyncIncrement {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Wait for settlement. The store has already seen the settlement
    /// transition by the time this returns.
    pub async fn settled(self) -> Result<i64, ApiError> {
        match self.settled.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ApiError::Fetch {
                message: "increment task ended without a result".to_string(),
            }),
        }
    }
}

/// Start an async increment.
///
/// `pending` is dispatched before this returns; `fulfilled` or `rejected`
/// is dispatched from a spawned task once `source` settles. Outside a Tokio
/// runtime the increment is rejected right away.
pub fn increment_async(
    store: &Store,
    source: Arc<dyn CountSource>,
    amount: i64,
) -> AsyncIncrement {
    increment_async_with_cancel(store, source, amount, CancelToken::new())
}

/// Same as [`increment_async`], settling as `rejected(Cancelled)` once
/// `cancel` fires.
pub fn increment_async_with_cancel(
    store: &Store,
    source: Arc<dyn CountSource>,
    amount: i64,
    cancel: CancelToken,
) -> AsyncIncrement {
    let request_id = Uuid::new_v4();
    store.dispatch(CounterAction::IncrementAsyncPending { request_id });

    let (sender, settled) = oneshot::channel();
    let Ok(runtime) = Handle::try_current() else {
        let error = ApiError::no_runtime();
        tracing::warn!(request_id = %request_id, error = %error, "Async increment rejected");
        store.dispatch(CounterAction::IncrementAsyncRejected {
            request_id,
            error: error.clone(),
        });
        let _ = sender.send(Err(error));
        return AsyncIncrement {
            request_id,
            settled,
        };
    };

    let store = store.clone();
    runtime.spawn(async move {
        let outcome = tokio::select! {
            result = source.fetch_count(amount) => result,
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
        };
        // The token may fire between the call resolving and this point.
        let outcome = if cancel.is_cancelled() {
            Err(ApiError::Cancelled)
        } else {
            outcome
        };

        match &outcome {
            Ok(resolved) => {
                tracing::debug!(
                    request_id = %request_id,
                    source = source.name(),
                    amount = resolved,
                    "Async increment fulfilled"
                );
                store.dispatch(CounterAction::IncrementAsyncFulfilled {
                    request_id,
                    amount: *resolved,
                });
            }
            Err(error) => {
                tracing::warn!(
                    request_id = %request_id,
                    source = source.name(),
                    error = %error,
                    "Async increment rejected"
                );
                store.dispatch(CounterAction::IncrementAsyncRejected {
                    request_id,
                    error: error.clone(),
                });
            }
        }
        let _ = sender.send(outcome);
    });

    AsyncIncrement {
        request_id,
        settled,
    }
}

/// Dispatch `IncrementByAmount(amount)` only when the current value is odd.
///
/// Uses the truncated remainder, so negative odd values (remainder `-1`)
/// count as odd too.
pub fn increment_if_odd(store: &Store, amount: i64) {
    let current = select_count(&store.get_state());
    if current % 2 == 1 || current % 2 == -1 {
        store.dispatch(CounterAction::IncrementByAmount(amount));
    }
}
