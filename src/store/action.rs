//! Base trait for actions (state transitions).

/// Marker trait for action objects.
///
/// Actions represent:
/// - User intents (increment, decrement)
/// - Lifecycle events of async work (pending, fulfilled, rejected)
/// - Platform events (focus regained, network back online)
///
/// Actions are consumed exactly once by the reducer composition.
pub trait Action: Clone + Send + 'static {
    /// Stable string identifier, e.g. `counter/increment`.
    fn action_type(&self) -> String;
}
