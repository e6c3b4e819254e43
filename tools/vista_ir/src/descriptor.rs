//! Function and parameter descriptors.
//!
//! Produced by the discovery collaborator and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Number of values taken from a provider when the parameter declares no limit.
pub const DEFAULT_PROVIDER_LIMIT: usize = 100;

/// What kind of container a previewed function lives in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Top-level function, no receiver.
    #[default]
    FreeFunction,
    /// Member of a shared singleton instance.
    Singleton,
    /// Member of a type that is instantiated with a no-argument constructor.
    Instantiable,
}

/// A parameter of a previewed function and the provider bound to it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name as declared.
    pub name: String,
    /// Declared type name. Opaque: only used in error messages.
    pub type_name: String,
    /// Qualified name of the provider type supplying sample values.
    pub provider: String,
    /// Per-parameter value limit. `None` or `Some(0)` means "use the global default".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ParameterSpec {
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        ParameterSpec {
            name: name.into(),
            type_name: type_name.into(),
            provider: provider.into(),
            limit: None,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Number of values to pull from this parameter's provider.
    ///
    /// A positive declared limit wins; anything else falls back to `global`.
    pub fn effective_limit(&self, global: usize) -> usize {
        match self.limit {
            Some(limit) if limit > 0 => usize::try_from(limit).unwrap_or(usize::MAX),
            _ => global,
        }
    }
}

/// One discoverable preview function.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Simple function name, stable across reloads.
    pub name: String,
    /// Module (package/namespace) path the function lives in.
    pub module_path: String,
    /// Enclosing containers, outermost first. Empty for free functions.
    #[serde(default)]
    pub containers: Vec<String>,
    #[serde(default)]
    pub kind: ContainerKind,
    /// Parameters in declaration order.
    #[serde(default)]
    pub params: Vec<ParameterSpec>,
}

impl FunctionDescriptor {
    /// Create a zero-parameter free function descriptor.
    pub fn new(name: impl Into<String>, module_path: impl Into<String>) -> Self {
        FunctionDescriptor {
            name: name.into(),
            module_path: module_path.into(),
            containers: Vec::new(),
            kind: ContainerKind::FreeFunction,
            params: Vec::new(),
        }
    }

    /// Place the function inside a container chain.
    #[must_use]
    pub fn in_container(mut self, kind: ContainerKind, chain: &[&str]) -> Self {
        self.kind = kind;
        self.containers = chain.iter().map(|c| (*c).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_param(mut self, param: ParameterSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_parameterized(&self) -> bool {
        !self.params.is_empty()
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    /// Dotted path of the container the function is looked up in.
    ///
    /// `app.ui` + `[Cards, Small]` gives `app.ui.Cards.Small`.
    pub fn container_path(&self) -> String {
        let mut path = self.module_path.clone();
        for container in &self.containers {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(container);
        }
        path
    }

    /// Fully qualified function name (`container_path` + `.name`).
    pub fn qualified_name(&self) -> String {
        let container = self.container_path();
        if container.is_empty() {
            self.name.clone()
        } else {
            format!("{container}.{}", self.name)
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
