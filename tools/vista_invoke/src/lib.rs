//! Parameterized invocation engine.
//!
//! Given a `FunctionDescriptor` and a loaded `Module`, the engine:
//! - materializes a bounded value list for every parameter's provider
//! - checks the size of the cartesian product against hard and soft limits
//! - invokes the target once per combination, trying every overload candidate
//! - isolates per-combination failures and reports structural ones once
//!
//! # Architecture
//!
//! ```text
//! ParameterSpec ──► materialize() ──► MaterializedProvider ─┐
//!                                                           ▼
//!                                  combinations() ──► Combination ──► dispatch ──► InvocationResult
//! ```
//!
//! Dynamic invocation goes through the `Module` / `Callable` / `Provider`
//! traits. `NativeModule` is an in-process dispatch table implementing them;
//! other loaders (e.g. a host process) implement the same traits.

mod combinations;
mod config;
mod engine;
mod error;
mod materialize;
mod native;
mod result;
mod runtime;

pub use combinations::{combinations, total_combinations, Combination, Combinations, IndexProduct};
pub use config::InvokeConfig;
pub use engine::{display_suffix, InvocationEngine};
pub use error::{ErrorCategory, PreviewError};
pub use materialize::{materialize, MaterializedProvider, ProviderInstances};
pub use native::{accepts, FnProvider, ListProvider, NativeFunction, NativeModule};
pub use result::{EngineWarning, Invocation, InvocationResult, Outcome};
pub use runtime::{CallError, Callable, Module, Provider, ProviderLookupError};
