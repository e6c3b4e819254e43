//! Engine limits.

use std::time::Duration;

use vista_ir::DEFAULT_PROVIDER_LIMIT;

/// Configuration for the invocation engine.
#[derive(Clone, Debug)]
pub struct InvokeConfig {
    /// Values taken from a provider whose parameter declares no limit.
    pub default_limit: usize,
    /// Hard ceiling on combinations per function. Above it nothing is invoked.
    pub max_combinations: usize,
    /// Soft ceiling: above it a warning is emitted but invocation proceeds.
    pub warn_combinations: usize,
    /// Measure wall-clock time around every invocation.
    pub profile: bool,
    /// Invocations slower than this are logged when profiling.
    pub slow_threshold: Duration,
}

impl Default for InvokeConfig {
    fn default() -> Self {
        InvokeConfig {
            default_limit: DEFAULT_PROVIDER_LIMIT,
            max_combinations: 100,
            warn_combinations: 20,
            profile: false,
            slow_threshold: Duration::from_millis(100),
        }
    }
}
