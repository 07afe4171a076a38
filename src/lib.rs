pub mod api;
pub mod app;
pub mod cancel;
pub mod config;
pub mod counter;
pub mod endpoints;
pub mod error;
pub mod logging;
pub mod service;
pub mod store;
