//! Command implementations for the blogstat CLI

pub mod inspect;
pub mod metrics;
pub mod store;
