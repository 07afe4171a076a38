use std::sync::Arc;

use crate::api::{ApiAction, ApiReducer, ApiState, LifecycleEvent};
use crate::counter::{CounterAction, CounterReducer, CounterState};
use crate::endpoints::{counter, quotes};
use crate::store::{Action, Reducer, SliceState};

/// Immutable aggregate of every slice.
///
/// Slices are behind `Arc` so a transition only reallocates the slice it
/// touches; compare slices with `Arc::ptr_eq` to skip re-renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub counter: Arc<CounterState>,
    pub quotes_api: Arc<ApiState>,
    pub counter_api: Arc<ApiState>,
}

impl SliceState for AppState {}

impl AppState {
    /// Look up an API slice by its reducer path.
    pub fn api(&self, reducer_path: &str) -> Option<&Arc<ApiState>> {
        match reducer_path {
            quotes::REDUCER_PATH => Some(&self.quotes_api),
            counter::REDUCER_PATH => Some(&self.counter_api),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    Counter(CounterAction),
    Api {
        reducer_path: &'static str,
        action: ApiAction,
    },
    Lifecycle(LifecycleEvent),
}

impl Action for AppAction {
    fn action_type(&self) -> String {
        match self {
            AppAction::Counter(action) => action.action_type(),
            AppAction::Api {
                reducer_path,
                action,
            } => format!("{}/{}", reducer_path, action.action_type()),
            AppAction::Lifecycle(event) => event.action_type(),
        }
    }
}

impl From<CounterAction> for AppAction {
    fn from(action: CounterAction) -> Self {
        AppAction::Counter(action)
    }
}

impl From<LifecycleEvent> for AppAction {
    fn from(event: LifecycleEvent) -> Self {
        AppAction::Lifecycle(event)
    }
}

/// Routes each action to the reducer of the slice that owns it.
pub struct RootReducer;

impl Reducer for RootReducer {
    type State = AppState;
    type Action = AppAction;

    fn reduce(state: Self::State, action: Self::Action) -> Self::State {
        match action {
            AppAction::Counter(action) => AppState {
                counter: Arc::new(CounterReducer::reduce((*state.counter).clone(), action)),
                ..state
            },
            AppAction::Api {
                reducer_path,
                action,
            } => match reducer_path {
                quotes::REDUCER_PATH => AppState {
                    quotes_api: reduce_api(&state.quotes_api, action),
                    ..state
                },
                counter::REDUCER_PATH => AppState {
                    counter_api: reduce_api(&state.counter_api, action),
                    ..state
                },
                unknown => {
                    tracing::trace!(reducer_path = unknown, "No slice for action, ignoring");
                    state
                }
            },
            AppAction::Lifecycle(event) => AppState {
                quotes_api: reduce_api(&state.quotes_api, ApiAction::Lifecycle(event)),
                counter_api: reduce_api(&state.counter_api, ApiAction::Lifecycle(event)),
                ..state
            },
        }
    }
}

fn reduce_api(slice: &Arc<ApiState>, action: ApiAction) -> Arc<ApiState> {
    Arc::new(ApiReducer::reduce((**slice).clone(), action))
}
