//! Bound shared by every slice held in `AppState`.

/// A slice snapshot stored behind an `Arc` in the app state.
///
/// Snapshots are replaced, never mutated, so listeners may hold on to an
/// old one. `PartialEq` lets callers tell whether a dispatch changed a
/// slice, and `Default` gives the slice's state before any action.
pub trait SliceState: Clone + PartialEq + Default + Send + Sync + 'static {}
