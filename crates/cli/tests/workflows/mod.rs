//! Workflow integration tests
//!
//! Startup checks, end-to-end streaming runs, runs with files changing
//! underneath, and interrupt handling.

pub mod interrupts;
pub mod live;
pub mod startup;
pub mod streaming;
