use crate::counter::action::CounterAction;
use crate::counter::state::{CounterState, CounterStatus};
use crate::store::Reducer;

/// Counter arithmetic saturates at the `i64` bounds.
pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;

    fn reduce(state: Self::State, action: Self::Action) -> Self::State {
        match action {
            CounterAction::Increment => CounterState {
                value: state.value.saturating_add(1),
                ..state
            },
            CounterAction::Decrement => CounterState {
                value: state.value.saturating_sub(1),
                ..state
            },
            CounterAction::IncrementByAmount(amount) => CounterState {
                value: state.value.saturating_add(amount),
                ..state
            },
            CounterAction::IncrementAsyncPending { .. } => CounterState {
                status: CounterStatus::Loading,
                ..state
            },
            CounterAction::IncrementAsyncFulfilled { amount, .. } => CounterState {
                value: state.value.saturating_add(amount),
                status: CounterStatus::Idle,
            },
            CounterAction::IncrementAsyncRejected { .. } => CounterState {
                status: CounterStatus::Failed,
                ..state
            },
        }
    }
}
