use std::fmt;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::error::ConvergenceError;

use super::spec::{PollOutcome, PollSpec, Predicate};

/// Terminal result of a convergence wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    Ready,
    TimedOut,
    Failed(String),
}

impl fmt::Display for Convergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Convergence::Ready => write!(f, "ready"),
            Convergence::TimedOut => write!(f, "timed out"),
            Convergence::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceReport {
    pub target: String,
    pub outcome: Convergence,
    pub evaluations: u32,
    pub elapsed: Duration,
    pub deadline: Duration,
}

impl ConvergenceReport {
    pub fn is_ready(&self) -> bool {
        self.outcome == Convergence::Ready
    }

    pub fn into_result(self) -> Result<Self, ConvergenceError> {
        match &self.outcome {
            Convergence::Ready => Ok(self),
            Convergence::TimedOut => Err(ConvergenceError::TimeoutExceeded(self.deadline)),
            Convergence::Failed(reason) => Err(ConvergenceError::definitive(format!(
                "{}: {reason}",
                self.target
            ))),
        }
    }
}

/// Evaluate the predicate until it is ready, fails, or the deadline passes.
///
/// The first evaluation happens immediately. Between evaluations the loop
/// sleeps for the interval, clamped so the last evaluation starts on the
/// deadline. Each evaluation may run until the deadline, and never for less
/// than half an interval; the one that starts on the deadline therefore gets
/// exactly that half interval. An evaluation still running when its window
/// closes is dropped and the wait times out.
pub async fn converge<P: Predicate>(spec: &PollSpec<P>) -> ConvergenceReport {
    let target = spec.predicate().describe();
    let deadline = spec.deadline();
    let started = Instant::now();
    let mut evaluations = 0u32;

    info!(
        target = %target,
        interval_secs = spec.interval().as_secs_f64(),
        deadline_secs = deadline.as_secs_f64(),
        "waiting for convergence"
    );

    let outcome = loop {
        evaluations += 1;
        let window = deadline
            .saturating_sub(started.elapsed())
            .max(spec.interval() / 2);

        let evaluated = match time::timeout(window, spec.predicate().evaluate()).await {
            Ok(evaluated) => evaluated,
            Err(_) => {
                warn!(target = %target, evaluations, ?window, "evaluation outlived its window");
                break Convergence::TimedOut;
            }
        };

        match evaluated {
            PollOutcome::Ready => break Convergence::Ready,
            PollOutcome::Failed(reason) => break Convergence::Failed(reason),
            PollOutcome::NotYetReady => {}
        }

        let elapsed = started.elapsed();
        if elapsed >= deadline {
            break Convergence::TimedOut;
        }

        let pause = spec.interval().min(deadline - elapsed);
        debug!(target = %target, evaluations, ?pause, "not ready yet");
        time::sleep(pause).await;
    };

    let report = ConvergenceReport {
        target,
        outcome,
        evaluations,
        elapsed: started.elapsed(),
        deadline,
    };

    match &report.outcome {
        Convergence::Ready => info!(
            target = %report.target,
            evaluations = report.evaluations,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "converged"
        ),
        Convergence::TimedOut => warn!(
            target = %report.target,
            evaluations = report.evaluations,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "gave up waiting"
        ),
        Convergence::Failed(reason) => warn!(
            target = %report.target,
            evaluations = report.evaluations,
            reason = %reason,
            "convergence failed"
        ),
    }

    report
}

/// Run independent waits concurrently and return their reports in input order.
pub async fn converge_all<P: Predicate>(specs: &[PollSpec<P>]) -> Vec<ConvergenceReport> {
    join_all(specs.iter().map(converge)).await
}
