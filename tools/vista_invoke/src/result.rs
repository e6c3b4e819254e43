//! Invocation result types.

use std::time::Duration;

use crate::error::PreviewError;

/// What one invocation (or one whole-function failure) produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Rendered return value.
    Success(String),
    Failure(PreviewError),
}

/// Result of invoking a function with one combination of values.
#[derive(Clone, Debug, PartialEq)]
pub struct InvocationResult {
    pub function: String,
    /// `[name, ...]` suffix identifying the combination. `None` for
    /// zero-parameter functions and whole-function failures.
    pub display: Option<String>,
    pub outcome: Outcome,
    /// Wall-clock time, only measured when profiling.
    pub elapsed: Option<Duration>,
}

impl InvocationResult {
    pub fn success(
        function: impl Into<String>,
        display: Option<String>,
        payload: String,
        elapsed: Option<Duration>,
    ) -> Self {
        InvocationResult {
            function: function.into(),
            display,
            outcome: Outcome::Success(payload),
            elapsed,
        }
    }

    #[cold]
    pub fn failed(
        function: impl Into<String>,
        display: Option<String>,
        error: PreviewError,
        elapsed: Option<Duration>,
    ) -> Self {
        InvocationResult {
            function: function.into(),
            display,
            outcome: Outcome::Failure(error),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn payload(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(payload) => Some(payload),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PreviewError> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    /// Function name with the combination suffix, e.g. `card[Alice]`.
    pub fn display_name(&self) -> String {
        match &self.display {
            Some(suffix) => format!("{}{suffix}", self.function),
            None => self.function.clone(),
        }
    }
}

/// Non-fatal conditions noticed while invoking a function.
///
/// Every warning is also emitted through `tracing::warn!` when it happens.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineWarning {
    /// Combination count above the soft threshold.
    CombinationCount {
        function: String,
        total: usize,
        breakdown: String,
    },
    /// A provider's display-name lookup failed for one index.
    DisplayName {
        provider: String,
        index: usize,
        cause: String,
    },
    /// An invocation exceeded the slow threshold (profiling only).
    SlowInvocation { display_name: String, elapsed: Duration },
}

/// Everything `InvocationEngine::invoke` produces for one function.
#[derive(Clone, Debug, Default)]
pub struct Invocation {
    pub results: Vec<InvocationResult>,
    pub warnings: Vec<EngineWarning>,
}

impl Invocation {
    pub fn into_results(self) -> Vec<InvocationResult> {
        self.results
    }

    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.results.len() - self.successes()
    }

    /// Number of combination-count warnings (0 or 1 per call).
    pub fn combination_warnings(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, EngineWarning::CombinationCount { .. }))
            .count()
    }
}
