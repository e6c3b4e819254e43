//! Error taxonomy for invocation.
//!
//! # Severity
//!
//! Structural errors (provider problems, combination limit, overload
//! resolution) void a whole function and are reported as one synthetic
//! result. `InvocationFailed` is per-datum: it belongs to one combination
//! and never aborts its siblings.

use std::fmt;

/// Stable, machine-readable error category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    ProviderNotFound,
    ProviderInstantiationFailed,
    ProviderEmpty,
    TypeMismatch,
    MethodNotFound,
    InvocationFailed,
    TooManyCombinations,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::ProviderNotFound => "provider_not_found",
            ErrorCategory::ProviderInstantiationFailed => "provider_instantiation_failed",
            ErrorCategory::ProviderEmpty => "provider_empty",
            ErrorCategory::TypeMismatch => "type_mismatch",
            ErrorCategory::MethodNotFound => "method_not_found",
            ErrorCategory::InvocationFailed => "invocation_failed",
            ErrorCategory::TooManyCombinations => "too_many_combinations",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure attached to an `InvocationResult`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    #[error("provider `{provider}` for parameter `{parameter}` not found")]
    ProviderNotFound { provider: String, parameter: String },

    #[error("failed to instantiate provider `{provider}` for parameter `{parameter}`: {cause}")]
    ProviderInstantiationFailed {
        provider: String,
        parameter: String,
        cause: String,
    },

    #[error("provider `{provider}` for parameter `{parameter}` produced no values")]
    ProviderEmpty { provider: String, parameter: String },

    #[error(
        "no overload of `{function}` accepts ({}) for parameters ({}); candidates: {}",
        .provided.join(", "),
        .parameters.join(", "),
        .expected.join(" | ")
    )]
    TypeMismatch {
        function: String,
        /// Signature of every candidate that rejected the arguments.
        expected: Vec<String>,
        /// Type names of the supplied values.
        provided: Vec<String>,
        parameters: Vec<String>,
    },

    #[error(
        "no function `{function}` taking {arity} argument(s) ({})",
        .parameters.join(", ")
    )]
    MethodNotFound {
        function: String,
        arity: usize,
        parameters: Vec<String>,
    },

    #[error("{display_name} failed: {cause}")]
    InvocationFailed { display_name: String, cause: String },

    #[error("{total} combinations ({breakdown}) exceed the limit of {limit}")]
    TooManyCombinations {
        total: usize,
        breakdown: String,
        limit: usize,
    },
}

impl PreviewError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PreviewError::ProviderNotFound { .. } => ErrorCategory::ProviderNotFound,
            PreviewError::ProviderInstantiationFailed { .. } => {
                ErrorCategory::ProviderInstantiationFailed
            }
            PreviewError::ProviderEmpty { .. } => ErrorCategory::ProviderEmpty,
            PreviewError::TypeMismatch { .. } => ErrorCategory::TypeMismatch,
            PreviewError::MethodNotFound { .. } => ErrorCategory::MethodNotFound,
            PreviewError::InvocationFailed { .. } => ErrorCategory::InvocationFailed,
            PreviewError::TooManyCombinations { .. } => ErrorCategory::TooManyCombinations,
        }
    }

    /// Rendered message (same text as `Display`).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether this error voids the whole function rather than one combination.
    pub fn is_structural(&self) -> bool {
        !matches!(self, PreviewError::InvocationFailed { .. })
    }
}
