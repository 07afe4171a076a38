use uuid::Uuid;

use crate::api::ApiError;
use crate::store::Action;

#[derive(Debug, Clone, PartialEq)]
pub enum CounterAction {
    Increment,
    Decrement,
    IncrementByAmount(i64),
    /// An async increment started; the counter enters `Loading`.
    IncrementAsyncPending { request_id: Uuid },
    /// An async increment resolved with `amount`.
    IncrementAsyncFulfilled { request_id: Uuid, amount: i64 },
    /// An async increment failed. `value` is left untouched.
    IncrementAsyncRejected { request_id: Uuid, error: ApiError },
}

impl Action for CounterAction {
    fn action_type(&self) -> String {
        let name = match self {
            CounterAction::Increment => "counter/increment",
            CounterAction::Decrement => "counter/decrement",
            CounterAction::IncrementByAmount(_) => "counter/incrementByAmount",
            CounterAction::IncrementAsyncPending { .. } => "counter/fetchCount/pending",
            CounterAction::IncrementAsyncFulfilled { .. } => "counter/fetchCount/fulfilled",
            CounterAction::IncrementAsyncRejected { .. } => "counter/fetchCount/rejected",
        };
        name.to_string()
    }
}
