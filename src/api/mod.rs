//! Declarative remote-data cache.
//!
//! Endpoints describe requests and tag rules ([`QueryEndpoint`],
//! [`MutationEndpoint`]); one [`ApiEngine`] per API turns them into a store
//! slice, a middleware and a subscription-counted cache lifecycle.

mod action;
mod base_query;
mod endpoint;
mod engine;
mod error;
mod hooks;
mod listeners;
mod reducer;
mod state;

pub use action::{ApiAction, LifecycleEvent};
pub use base_query::{BaseQuery, RawResponse};
pub use endpoint::{CacheKey, MutationEndpoint, QueryEndpoint, RequestSpec, Tag};
pub use engine::{ApiDefinition, ApiEngine, CacheOptions};
pub use error::ApiError;
pub use hooks::{MutationHandle, MutationHook, MutationResult, QueryHook, QueryResult};
pub use listeners::{setup_listeners, LifecycleSender};
pub use reducer::ApiReducer;
pub use state::{ApiConfigState, ApiState, FetchStatus, MutationEntry, QueryEntry};
