//! Forwarding of platform lifecycle events into the store.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::action::LifecycleEvent;
use crate::store::Store;

/// Sender side handed to whatever observes focus and connectivity.
pub type LifecycleSender = mpsc::UnboundedSender<LifecycleEvent>;

/// Spawn a task that dispatches every received [`LifecycleEvent`] into
/// `store`, in the order received. Engines configured with
/// `refetch_on_focus` / `refetch_on_reconnect` react by refetching their
/// subscribed queries.
///
/// The task ends once every sender has been dropped.
pub fn setup_listeners(store: &Store) -> (LifecycleSender, JoinHandle<()>) {
    let (sender, mut events) = mpsc::unbounded_channel();
    let store = store.clone();
    let handle = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::debug!(event = ?event, "Lifecycle event");
            store.dispatch(event);
        }
    });
    (sender, handle)
}
