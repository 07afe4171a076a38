//! Concrete APIs wired into the store.

pub mod counter;
pub mod quotes;
