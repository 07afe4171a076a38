//! Store primitives with unidirectional data flow.
//!
//! # Architecture
//!
//! ```text
//! Action ──→ Reducer ──→ Snapshot ──→ Listeners ──→ Middleware
//!    ↑                                                  │
//!    └──────────────── async settlement ────────────────┘
//! ```
//!
//! - **SliceState**: immutable sub-state owned by one reducer
//! - **Action**: transition consumed exactly once by the root reducer
//! - **Reducer**: pure function that transforms a slice based on an action
//! - **Store**: serializes dispatches and publishes snapshots

mod action;
mod container;
mod reducer;
mod slice;
mod snapshot;

pub use action::Action;
pub use container::{Listener, Middleware, Store, Subscription};
pub use reducer::Reducer;
pub use slice::SliceState;
pub use snapshot::{AppAction, AppState, RootReducer};
