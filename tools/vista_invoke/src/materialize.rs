//! Provider materialization.
//!
//! Turns a parameter's provider reference into a finite, indexable value
//! list. Providers are instantiated at most once per `invoke` call through
//! `ProviderInstances`; nothing is cached across calls.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use vista_ir::{ParameterSpec, Value};

use crate::error::PreviewError;
use crate::result::EngineWarning;
use crate::runtime::{Module, Provider, ProviderLookupError};

/// Provider instances created during one `invoke` call, keyed by reference.
#[derive(Default)]
pub struct ProviderInstances {
    instances: FxHashMap<String, Arc<dyn Provider>>,
}

impl ProviderInstances {
    pub fn new() -> Self {
        ProviderInstances::default()
    }

    fn get_or_instantiate(
        &mut self,
        spec: &ParameterSpec,
        module: &dyn Module,
    ) -> Result<Arc<dyn Provider>, PreviewError> {
        if let Some(existing) = self.instances.get(&spec.provider) {
            return Ok(Arc::clone(existing));
        }

        let provider = module
            .instantiate_provider(&spec.provider)
            .map_err(|e| match e {
                ProviderLookupError::NotFound => PreviewError::ProviderNotFound {
                    provider: spec.provider.clone(),
                    parameter: spec.name.clone(),
                },
                ProviderLookupError::Failed(cause) => PreviewError::ProviderInstantiationFailed {
                    provider: spec.provider.clone(),
                    parameter: spec.name.clone(),
                    cause,
                },
            })?;
        self.instances
            .insert(spec.provider.clone(), Arc::clone(&provider));
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// A provider's values for one parameter, bounded by the effective limit.
///
/// Never empty: `materialize` reports `ProviderEmpty` instead.
pub struct MaterializedProvider {
    spec: ParameterSpec,
    values: Vec<Value>,
    provider: Arc<dyn Provider>,
}

impl MaterializedProvider {
    pub(crate) fn new(spec: ParameterSpec, values: Vec<Value>, provider: Arc<dyn Provider>) -> Self {
        MaterializedProvider {
            spec,
            values,
            provider,
        }
    }

    pub fn spec(&self) -> &ParameterSpec {
        &self.spec
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Custom display name for `index`, if the provider has a non-blank one.
    ///
    /// A failing lookup is recorded as a warning and treated as "no name"
    /// for that index only.
    pub fn display_name(&self, index: usize, warnings: &mut Vec<EngineWarning>) -> Option<String> {
        match self.provider.display_name(index) {
            Ok(name) => name.filter(|n| !n.trim().is_empty()),
            Err(cause) => {
                tracing::warn!(
                    provider = %self.spec.provider,
                    index,
                    "display name lookup failed: {cause}"
                );
                warnings.push(EngineWarning::DisplayName {
                    provider: self.spec.provider.clone(),
                    index,
                    cause,
                });
                None
            }
        }
    }
}

impl std::fmt::Debug for MaterializedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterializedProvider")
            .field("parameter", &self.spec.name)
            .field("provider", &self.spec.provider)
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

/// Materialize the provider bound to `spec`.
///
/// Pulls at most `spec.effective_limit(default_limit)` values, so infinite
/// sequences are fine. A provider that fails while producing them is
/// reported like one that failed to construct; `ProviderEmpty` means the
/// sequence really was empty.
pub fn materialize(
    spec: &ParameterSpec,
    module: &dyn Module,
    instances: &mut ProviderInstances,
    default_limit: usize,
) -> Result<MaterializedProvider, PreviewError> {
    let provider = instances.get_or_instantiate(spec, module)?;
    let limit = spec.effective_limit(default_limit);
    let values = provider
        .take_values(limit)
        .map_err(|cause| PreviewError::ProviderInstantiationFailed {
            provider: spec.provider.clone(),
            parameter: spec.name.clone(),
            cause,
        })?;

    if values.is_empty() {
        return Err(PreviewError::ProviderEmpty {
            provider: spec.provider.clone(),
            parameter: spec.name.clone(),
        });
    }

    tracing::debug!(
        parameter = %spec.name,
        provider = %spec.provider,
        count = values.len(),
        limit,
        "materialized provider"
    );
    Ok(MaterializedProvider::new(spec.clone(), values, provider))
}
