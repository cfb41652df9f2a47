//! Application services.
//!
//! Operations that combine the scheduler with the store, shared by the CLI
//! and tests.

pub mod backup;
pub mod review;
