//! Ordered fallback with per-source deadlines.
//!
//! A [`FallbackChain`] tries its sources one after another, each bounded by
//! its own timeout, and returns the first acceptable result. When every source
//! has failed, timed out, or produced an unacceptable (typically empty)
//! result, the chain's [`TerminalSource`] produces the answer. The terminal
//! source is infallible, so [`FallbackChain::run`] always returns a value.
//!
//! The model dispatch path and the media search path both run on this type.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a single source did not produce a usable result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// The source did not answer within its deadline.
    #[error("timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// The source answered successfully but had nothing to offer.
    #[error("returned an empty result")]
    Empty,

    /// The source declined to run (e.g. its backend is known to be down).
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The source ran and failed.
    #[error("{0}")]
    Failed(String),
}

/// A fallible source tried by a [`FallbackChain`].
#[async_trait]
pub trait FallbackSource<Q, T>: Send + Sync
where
    Q: Sync,
{
    /// Name used in logs and in [`FallbackOutcome::served_by`].
    fn name(&self) -> &str;

    /// Deadline for a single attempt.
    fn timeout(&self) -> Duration;

    /// Try to produce a result for `request`.
    async fn attempt(&self, request: &Q) -> Result<T, SourceError>;
}

/// The last element of a chain. It cannot fail.
pub trait TerminalSource<Q, T>: Send + Sync {
    /// Name used in logs and in [`FallbackOutcome::served_by`].
    fn name(&self) -> &str;

    /// Produce a result for `request`.
    fn produce(&self, request: &Q) -> T;
}

/// A recorded failure of one source during a chain run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    /// Name of the source that failed.
    pub source: String,
    /// What went wrong.
    pub error: SourceError,
}

/// Result of running a chain.
#[derive(Debug, Clone)]
pub struct FallbackOutcome<T> {
    /// The value produced by the first acceptable source, or by the terminal.
    pub value: T,
    /// Name of the source that produced `value`.
    pub served_by: String,
    /// Failures of the sources tried before `served_by`, in order.
    pub failures: Vec<SourceFailure>,
    /// True when every fallible source failed and the terminal answered.
    pub exhausted: bool,
}

type Acceptance<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// An ordered list of sources ending in an infallible terminal source.
pub struct FallbackChain<Q, T> {
    name: String,
    sources: Vec<Arc<dyn FallbackSource<Q, T>>>,
    terminal: Arc<dyn TerminalSource<Q, T>>,
    accept: Acceptance<T>,
}

impl<Q, T> FallbackChain<Q, T>
where
    Q: Send + Sync + 'static,
    T: Send + 'static,
{
    /// Create a chain with no fallible sources yet.
    pub fn new(name: impl Into<String>, terminal: Arc<dyn TerminalSource<Q, T>>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            terminal,
            accept: Arc::new(|_| true),
        }
    }

    /// Append a source; sources run in the order they were added.
    pub fn with_source(mut self, source: Arc<dyn FallbackSource<Q, T>>) -> Self {
        self.sources.push(source);
        self
    }

    /// Only treat a successful result as final when `accept` returns true.
    ///
    /// Rejected results are recorded as [`SourceError::Empty`].
    pub fn accept_when<F>(mut self, accept: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.accept = Arc::new(accept);
        self
    }

    /// Name of the chain.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the fallible sources followed by the terminal, in run order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.terminal.name()))
            .collect()
    }

    /// Run the chain for `request`.
    pub async fn run(&self, request: &Q) -> FallbackOutcome<T> {
        let mut failures = Vec::new();

        for source in &self.sources {
            let deadline = source.timeout();
            debug!(
                "[{}] trying source {} (timeout {} ms)",
                self.name,
                source.name(),
                deadline.as_millis()
            );

            let error = match tokio::time::timeout(deadline, source.attempt(request)).await {
                Ok(Ok(value)) if (self.accept)(&value) => {
                    info!("[{}] served by {}", self.name, source.name());
                    return FallbackOutcome {
                        value,
                        served_by: source.name().to_string(),
                        failures,
                        exhausted: false,
                    };
                }
                Ok(Ok(_)) => SourceError::Empty,
                Ok(Err(err)) => err,
                Err(_) => SourceError::Timeout(deadline),
            };

            warn!("[{}] source {} failed: {}", self.name, source.name(), error);
            failures.push(SourceFailure {
                source: source.name().to_string(),
                error,
            });
        }

        info!(
            "[{}] all {} sources exhausted, using {}",
            self.name,
            self.sources.len(),
            self.terminal.name()
        );

        FallbackOutcome {
            value: self.terminal.produce(request),
            served_by: self.terminal.name().to_string(),
            failures,
            exhausted: true,
        }
    }
}
