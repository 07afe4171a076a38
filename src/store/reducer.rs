//! The reducer seam between dispatched actions and slice snapshots.

use super::action::Action;
use super::slice::SliceState;

/// Computes the next snapshot of one slice from the previous one.
///
/// `reduce` takes the old snapshot by value and returns the replacement.
/// Nothing else in the store writes slice data, and `reduce` may not
/// dispatch, spawn or touch the network.
pub trait Reducer {
    type State: SliceState;

    /// Actions routed to this slice by the root reducer.
    type Action: Action;

    /// Unrecognized or inapplicable actions return `state` unchanged.
    fn reduce(state: Self::State, action: Self::Action) -> Self::State;
}
