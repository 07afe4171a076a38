use serde::{Deserialize, Serialize};

use crate::store::SliceState;

/// Progress of the most recent async increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterStatus {
    #[default]
    Idle,
    Loading,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterState {
    pub value: i64,
    pub status: CounterStatus,
}

impl SliceState for CounterState {}

impl CounterState {
    pub fn with_value(value: i64) -> Self {
        Self {
            value,
            status: CounterStatus::Idle,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == CounterStatus::Loading
    }
}
