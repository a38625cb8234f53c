//! Convergence poller: bounded, fixed-interval waiting on a [`Predicate`].

mod engine;
mod spec;

pub use engine::{Convergence, ConvergenceReport, converge, converge_all};
pub use spec::{PollBudget, PollOutcome, PollSpec, Predicate};
#[cfg(test)]
pub use spec::{FnPredicate, from_fn};
