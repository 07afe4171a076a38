//! Local counter backend for the counter API.

mod server;

pub use server::{build_router, serve, CounterService, IncrementRequest};
