//! seqwatch CLI library
//!
//! Configuration, output sink, liveness probe and run wiring behind the
//! `scat` binary.

pub mod config;
pub mod liveness;
pub mod run;
pub mod sink;

pub use config::{RunConfig, ScatArgs, ScatConfig};
pub use run::execute;
