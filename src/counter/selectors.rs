use crate::counter::state::{CounterState, CounterStatus};
use crate::store::AppState;

pub fn select_counter(state: &AppState) -> &CounterState {
    &state.counter
}

pub fn select_count(state: &AppState) -> i64 {
    select_counter(state).value
}

pub fn select_status(state: &AppState) -> CounterStatus {
    select_counter(state).status
}
