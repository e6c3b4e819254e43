//! Dynamic symbol invocation.
//!
//! A loaded `Module` hands out overload candidates by name and instantiates
//! providers by qualified reference. Candidates can *reject* an argument list
//! (wrong representation, try the next one) or *raise* (the target ran and
//! failed, which is final).

use std::sync::Arc;

use vista_ir::{FunctionDescriptor, Value};

/// Why a single candidate call did not produce a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallError {
    /// The arguments do not fit this candidate's parameter types.
    Rejected(String),
    /// The target was entered and failed.
    Raised(String),
}

/// One invocable overload.
pub trait Callable: Send + Sync {
    /// Declared parameter type names, in order.
    fn param_types(&self) -> &[String];

    fn arity(&self) -> usize {
        self.param_types().len()
    }

    fn call(&self, args: &[Value]) -> Result<Value, CallError>;

    /// Human-readable signature for mismatch reports, e.g. `(int, str)`.
    fn signature(&self) -> String {
        format!("({})", self.param_types().join(", "))
    }
}

/// A source of sample values for one parameter.
pub trait Provider: Send + Sync {
    /// The value sequence, in order. May be infinite; callers bound it.
    fn values(&self) -> Box<dyn Iterator<Item = Value> + '_>;

    /// The first `limit` values, or why the sequence broke while producing
    /// them. Providers whose values can fail to arrive override this.
    fn take_values(&self, limit: usize) -> Result<Vec<Value>, String> {
        Ok(self.values().take(limit).collect())
    }

    /// Custom display name for the value at `index`.
    ///
    /// Providers without display names keep the default, which names nothing.
    fn display_name(&self, _index: usize) -> Result<Option<String>, String> {
        Ok(None)
    }
}

/// Failure to obtain a provider instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderLookupError {
    /// No provider type with that qualified name.
    NotFound,
    /// The type exists but construction failed.
    Failed(String),
}

/// A loaded module, ready for invocation.
pub trait Module: Send + Sync {
    /// Every callable named `descriptor.name` in the descriptor's container,
    /// regardless of arity.
    fn candidates(&self, descriptor: &FunctionDescriptor) -> Vec<Arc<dyn Callable>>;

    /// Create (or fetch the singleton of) the provider named `reference`.
    fn instantiate_provider(&self, reference: &str)
        -> Result<Arc<dyn Provider>, ProviderLookupError>;
}
