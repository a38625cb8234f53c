#[cfg(test)]
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConvergenceError, Result};

/// Answer of a single predicate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    NotYetReady,
    Failed(String),
}

impl PollOutcome {
    #[cfg(test)]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

impl From<ConvergenceError> for PollOutcome {
    fn from(error: ConvergenceError) -> Self {
        if error.is_transient() {
            PollOutcome::NotYetReady
        } else {
            PollOutcome::Failed(error.to_string())
        }
    }
}

/// Something the poller can ask "are you there yet?".
///
/// Implementations may perform I/O, but repeated evaluation must not change
/// which target is being observed.
#[async_trait]
pub trait Predicate: Send + Sync {
    /// Human-readable name of the observed target, used in logs.
    fn describe(&self) -> String;

    async fn evaluate(&self) -> PollOutcome;
}

#[async_trait]
impl<P> Predicate for Box<P>
where
    P: Predicate + ?Sized,
{
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn evaluate(&self) -> PollOutcome {
        (**self).evaluate().await
    }
}

#[async_trait]
impl<P> Predicate for Arc<P>
where
    P: Predicate + ?Sized,
{
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn evaluate(&self) -> PollOutcome {
        (**self).evaluate().await
    }
}

/// Adapts an async closure into a [`Predicate`].
#[cfg(test)]
pub struct FnPredicate<F> {
    name: String,
    check: F,
}

#[cfg(test)]
pub fn from_fn<F, Fut>(name: impl Into<String>, check: F) -> FnPredicate<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = PollOutcome> + Send,
{
    FnPredicate {
        name: name.into(),
        check,
    }
}

#[cfg(test)]
#[async_trait]
impl<F, Fut> Predicate for FnPredicate<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = PollOutcome> + Send,
{
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn evaluate(&self) -> PollOutcome {
        (self.check)().await
    }
}

/// Interval and deadline pair, kept separately from any predicate so it can
/// live in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollBudget {
    #[serde(with = "secs")]
    pub interval: Duration,
    #[serde(with = "secs")]
    pub deadline: Duration,
}

impl PollBudget {
    pub const fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(ConvergenceError::configuration(
                "poll interval must be greater than zero",
            ));
        }
        if self.deadline.is_zero() {
            return Err(ConvergenceError::configuration(
                "poll deadline must be greater than zero",
            ));
        }
        if self.interval > self.deadline {
            return Err(ConvergenceError::configuration(format!(
                "poll interval ({:?}) must not exceed the deadline ({:?})",
                self.interval, self.deadline
            )));
        }
        Ok(())
    }

    pub fn spec<P: Predicate>(self, predicate: P) -> Result<PollSpec<P>> {
        PollSpec::new(self.interval, self.deadline, predicate)
    }
}

/// A validated, immutable description of one convergence wait.
pub struct PollSpec<P> {
    interval: Duration,
    deadline: Duration,
    predicate: P,
}

impl<P: Predicate> PollSpec<P> {
    pub fn new(interval: Duration, deadline: Duration, predicate: P) -> Result<Self> {
        PollBudget::new(interval, deadline).validate()?;
        Ok(Self {
            interval,
            deadline,
            predicate,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn predicate(&self) -> &P {
        &self.predicate
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
