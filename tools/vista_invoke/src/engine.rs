//! Invocation engine.
//!
//! Drives materialization, limit checks, combination enumeration and
//! dispatch for one function descriptor.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use vista_ir::{FunctionDescriptor, Value};

use crate::combinations::{combinations, total_combinations, Combination};
use crate::config::InvokeConfig;
use crate::error::PreviewError;
use crate::materialize::{materialize, MaterializedProvider, ProviderInstances};
use crate::result::{EngineWarning, Invocation, InvocationResult};
use crate::runtime::{CallError, Callable, Module};

/// Why dispatch to the candidate set did not produce a value.
enum DispatchFailure {
    /// The target ran and failed (per-datum).
    Raised(String),
    /// Every candidate rejected the arguments (structural).
    Mismatch(PreviewError),
}

/// Invokes preview functions against a loaded module.
#[derive(Clone, Debug, Default)]
pub struct InvocationEngine {
    config: InvokeConfig,
}

impl InvocationEngine {
    pub fn new() -> Self {
        InvocationEngine::default()
    }

    pub fn with_config(config: InvokeConfig) -> Self {
        InvocationEngine { config }
    }

    pub fn config(&self) -> &InvokeConfig {
        &self.config
    }

    /// Invoke `descriptor` once per combination of its providers' values.
    ///
    /// Structural failures yield a single error result; per-combination
    /// failures are recorded in place and enumeration continues.
    #[tracing::instrument(level = "debug", skip_all, fields(function = %descriptor.name))]
    pub fn invoke(&self, descriptor: &FunctionDescriptor, module: &dyn Module) -> Invocation {
        let mut warnings = Vec::new();
        let results = if descriptor.is_parameterized() {
            self.invoke_parameterized(descriptor, module, &mut warnings)
        } else {
            vec![self.invoke_once(descriptor, module, &mut warnings)]
        };
        Invocation { results, warnings }
    }

    fn invoke_once(
        &self,
        descriptor: &FunctionDescriptor,
        module: &dyn Module,
        warnings: &mut Vec<EngineWarning>,
    ) -> InvocationResult {
        let name = &descriptor.name;
        let candidates = match resolve_candidates(descriptor, module) {
            Ok(candidates) => candidates,
            Err(error) => return InvocationResult::failed(name, None, error, None),
        };

        let (outcome, elapsed) = self.timed_dispatch(descriptor, &candidates, &[], name, warnings);
        match outcome {
            Ok(value) => InvocationResult::success(name, None, value.to_string(), elapsed),
            Err(DispatchFailure::Raised(cause)) => InvocationResult::failed(
                name,
                None,
                PreviewError::InvocationFailed {
                    display_name: name.clone(),
                    cause,
                },
                elapsed,
            ),
            Err(DispatchFailure::Mismatch(error)) => {
                InvocationResult::failed(name, None, error, elapsed)
            }
        }
    }

    fn invoke_parameterized(
        &self,
        descriptor: &FunctionDescriptor,
        module: &dyn Module,
        warnings: &mut Vec<EngineWarning>,
    ) -> Vec<InvocationResult> {
        let name = &descriptor.name;
        let mut instances = ProviderInstances::new();
        let mut providers = Vec::with_capacity(descriptor.params.len());
        for spec in &descriptor.params {
            match materialize(spec, module, &mut instances, self.config.default_limit) {
                Ok(provider) => providers.push(provider),
                Err(error) => return vec![InvocationResult::failed(name, None, error, None)],
            }
        }

        let total = total_combinations(providers.iter().map(MaterializedProvider::len));
        if total > self.config.max_combinations {
            let error = PreviewError::TooManyCombinations {
                total,
                breakdown: breakdown(&providers),
                limit: self.config.max_combinations,
            };
            return vec![InvocationResult::failed(name, None, error, None)];
        }
        if total > self.config.warn_combinations {
            let breakdown = breakdown(&providers);
            tracing::warn!(
                function = %name,
                total,
                "large number of combinations: {breakdown}"
            );
            warnings.push(EngineWarning::CombinationCount {
                function: name.clone(),
                total,
                breakdown,
            });
        }

        let candidates = match resolve_candidates(descriptor, module) {
            Ok(candidates) => candidates,
            Err(error) => return vec![InvocationResult::failed(name, None, error, None)],
        };

        let mut results = Vec::with_capacity(total);
        for combination in combinations(&providers) {
            let suffix = display_suffix(&providers, &combination, warnings);
            let display_name = format!("{name}{suffix}");
            let args = combination.to_args();

            let (outcome, elapsed) =
                self.timed_dispatch(descriptor, &candidates, &args, &display_name, warnings);
            let result = match outcome {
                Ok(value) => InvocationResult::success(name, Some(suffix), value.to_string(), elapsed),
                Err(DispatchFailure::Raised(cause)) => InvocationResult::failed(
                    name,
                    Some(suffix),
                    PreviewError::InvocationFailed {
                        display_name,
                        cause,
                    },
                    elapsed,
                ),
                Err(DispatchFailure::Mismatch(error)) => {
                    return vec![InvocationResult::failed(name, None, error, None)];
                }
            };
            results.push(result);
        }
        results
    }

    fn timed_dispatch(
        &self,
        descriptor: &FunctionDescriptor,
        candidates: &[Arc<dyn Callable>],
        args: &[Value],
        display_name: &str,
        warnings: &mut Vec<EngineWarning>,
    ) -> (Result<Value, DispatchFailure>, Option<Duration>) {
        if !self.config.profile {
            return (dispatch(descriptor, candidates, args), None);
        }

        let start = Instant::now();
        let outcome = dispatch(descriptor, candidates, args);
        let elapsed = start.elapsed();
        if elapsed > self.config.slow_threshold {
            tracing::warn!(
                function = %display_name,
                elapsed_ms = elapsed.as_millis(),
                "slow preview invocation"
            );
            warnings.push(EngineWarning::SlowInvocation {
                display_name: display_name.to_string(),
                elapsed,
            });
        }
        (outcome, Some(elapsed))
    }
}

/// Candidates with the descriptor's name and arity.
fn resolve_candidates(
    descriptor: &FunctionDescriptor,
    module: &dyn Module,
) -> Result<Vec<Arc<dyn Callable>>, PreviewError> {
    let arity = descriptor.arity();
    let candidates: Vec<_> = module
        .candidates(descriptor)
        .into_iter()
        .filter(|c| c.arity() == arity)
        .collect();

    if candidates.is_empty() {
        return Err(PreviewError::MethodNotFound {
            function: descriptor.qualified_name(),
            arity,
            parameters: descriptor.param_names(),
        });
    }
    Ok(candidates)
}

/// Try each candidate in turn. A rejection moves on; anything raised is final.
fn dispatch(
    descriptor: &FunctionDescriptor,
    candidates: &[Arc<dyn Callable>],
    args: &[Value],
) -> Result<Value, DispatchFailure> {
    let mut expected = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match call_isolated(candidate.as_ref(), args) {
            Ok(value) => return Ok(value),
            Err(CallError::Rejected(reason)) => {
                tracing::trace!(signature = %candidate.signature(), "candidate rejected: {reason}");
                expected.push(candidate.signature());
            }
            Err(CallError::Raised(cause)) => return Err(DispatchFailure::Raised(cause)),
        }
    }

    Err(DispatchFailure::Mismatch(PreviewError::TypeMismatch {
        function: descriptor.qualified_name(),
        expected,
        provided: args.iter().map(|a| a.type_name().to_string()).collect(),
        parameters: descriptor.param_names(),
    }))
}

/// Call a candidate, turning a panic inside it into a raised failure.
fn call_isolated(candidate: &dyn Callable, args: &[Value]) -> Result<Value, CallError> {
    match panic::catch_unwind(AssertUnwindSafe(|| candidate.call(args))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panicked".to_string());
            Err(CallError::Raised(message))
        }
    }
}

/// `name=len` per parameter, joined with ` x `.
fn breakdown(providers: &[MaterializedProvider]) -> String {
    providers
        .iter()
        .map(|p| format!("{}={}", p.spec().name, p.len()))
        .collect::<Vec<_>>()
        .join(" x ")
}

/// Suffix identifying a combination: `[Alice]`, `[0]`, `[A, 1]`.
///
/// Each entry is the provider's custom name when non-blank, else the index.
pub fn display_suffix(
    providers: &[MaterializedProvider],
    combination: &Combination<'_>,
    warnings: &mut Vec<EngineWarning>,
) -> String {
    let names: Vec<String> = providers
        .iter()
        .zip(combination.indices())
        .map(|(provider, index)| {
            provider
                .display_name(index, warnings)
                .unwrap_or_else(|| index.to_string())
        })
        .collect();
    format!("[{}]", names.join(", "))
}
