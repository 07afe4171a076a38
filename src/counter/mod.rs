//! Counter slice: state, transitions, reducer, selectors and thunks.

mod action;
mod reducer;
mod selectors;
mod source;
mod state;
mod thunk;

pub use action::CounterAction;
pub use reducer::CounterReducer;
pub use selectors::{select_count, select_counter, select_status};
pub use source::{CountSource, SimulatedCount};
pub use state::{CounterState, CounterStatus};
pub use thunk::{increment_async, increment_async_with_cancel, increment_if_odd, AsyncIncrement};
