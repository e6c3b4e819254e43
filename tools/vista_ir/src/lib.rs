//! Vista IR - shared data model for the preview runner.
//!
//! This crate holds the plain data that flows between the discovery front
//! end, the invocation engine and the reload orchestrator:
//! - `FunctionDescriptor` / `ParameterSpec`: what to invoke and with which providers
//! - `Value`: opaque sample values produced by providers and returned by targets
//! - `Diagnostic`: compiler output attached to a failed fast compile
//! - `ValidationError`: discovery-time problems with provider bindings
//!
//! Every type is `serde`-serializable so external collaborators can exchange
//! them as JSON.

mod descriptor;
mod diagnostic;
mod value;

pub use descriptor::{ContainerKind, FunctionDescriptor, ParameterSpec, DEFAULT_PROVIDER_LIMIT};
pub use diagnostic::{Diagnostic, Location, Severity, ValidationError};
pub use value::Value;
