//! Configuration for the e2e harness.
//!
//! Settings are layered: built-in defaults, then an optional JSON file, then
//! environment variables. Outside CI every repository coordinate must come
//! from the environment; under prow they are derived from the cluster.

mod builder;
mod constants;
mod defaults;
mod environment;
mod loader;
mod types;
mod validation;

pub use types::{ApplicationTarget, Config, WorkflowSettings};

pub use constants::PULL_REQUEST_HEAD;

#[cfg(test)]
mod tests;
