//! In-process dispatch table.
//!
//! `NativeModule` is a `Module` built from Rust closures: functions are
//! registered under their qualified name (several overloads per name are
//! allowed) and providers under their qualified reference, either as a
//! shared singleton or as a constructor run once per invocation call.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use vista_ir::{FunctionDescriptor, Value};

use crate::runtime::{CallError, Callable, Module, Provider, ProviderLookupError};

type NativeBody = dyn Fn(&[Value]) -> Result<Value, CallError> + Send + Sync;
type ProviderConstructor = dyn Fn() -> Result<Arc<dyn Provider>, String> + Send + Sync;

/// Whether a value can be passed where `declared` is expected.
///
/// `any`/`_` accept everything and `float` also accepts `int`. Every other
/// declared name must equal the value's type name.
pub fn accepts(declared: &str, value: &Value) -> bool {
    match declared {
        "any" | "_" => true,
        "float" => matches!(value, Value::Float(_) | Value::Int(_)),
        other => other == value.type_name(),
    }
}

/// A registered overload.
pub struct NativeFunction {
    param_types: Vec<String>,
    body: Box<NativeBody>,
}

impl NativeFunction {
    pub fn new<F>(param_types: &[&str], body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        NativeFunction {
            param_types: param_types.iter().map(|t| (*t).to_string()).collect(),
            body: Box::new(body),
        }
    }
}

impl Callable for NativeFunction {
    fn param_types(&self) -> &[String] {
        &self.param_types
    }

    fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        for (declared, arg) in self.param_types.iter().zip(args) {
            if !accepts(declared, arg) {
                return Err(CallError::Rejected(format!(
                    "expected {declared}, got {}",
                    arg.type_name()
                )));
            }
        }
        (self.body)(args)
    }
}

enum ProviderFactory {
    Singleton(Arc<dyn Provider>),
    Constructor(Box<ProviderConstructor>),
}

/// A module whose symbols are Rust closures.
#[derive(Default)]
pub struct NativeModule {
    functions: FxHashMap<String, Vec<Arc<dyn Callable>>>,
    providers: FxHashMap<String, ProviderFactory>,
}

impl NativeModule {
    pub fn new() -> Self {
        NativeModule::default()
    }

    /// Register an overload under `qualified` (e.g. `app.Previews.card`).
    pub fn function<F>(&mut self, qualified: &str, param_types: &[&str], body: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        let function: Arc<dyn Callable> = Arc::new(NativeFunction::new(param_types, body));
        self.functions
            .entry(qualified.to_string())
            .or_default()
            .push(function);
        self
    }

    /// Register a provider shared by every invocation call.
    pub fn singleton_provider<P>(&mut self, reference: &str, provider: P) -> &mut Self
    where
        P: Provider + 'static,
    {
        self.providers.insert(
            reference.to_string(),
            ProviderFactory::Singleton(Arc::new(provider)),
        );
        self
    }

    /// Register a provider built by a no-argument constructor.
    pub fn constructed_provider<F, P>(&mut self, reference: &str, constructor: F) -> &mut Self
    where
        F: Fn() -> Result<P, String> + Send + Sync + 'static,
        P: Provider + 'static,
    {
        let constructor: Box<ProviderConstructor> = Box::new(move || {
            let provider: Arc<dyn Provider> = Arc::new(constructor()?);
            Ok(provider)
        });
        self.providers.insert(
            reference.to_string(),
            ProviderFactory::Constructor(constructor),
        );
        self
    }
}

impl Module for NativeModule {
    fn candidates(&self, descriptor: &FunctionDescriptor) -> Vec<Arc<dyn Callable>> {
        self.functions
            .get(&descriptor.qualified_name())
            .cloned()
            .unwrap_or_default()
    }

    fn instantiate_provider(
        &self,
        reference: &str,
    ) -> Result<Arc<dyn Provider>, ProviderLookupError> {
        match self.providers.get(reference) {
            None => Err(ProviderLookupError::NotFound),
            Some(ProviderFactory::Singleton(provider)) => Ok(Arc::clone(provider)),
            Some(ProviderFactory::Constructor(constructor)) => {
                constructor().map_err(ProviderLookupError::Failed)
            }
        }
    }
}

/// A finite provider over a fixed list, with optional display names.
#[derive(Clone, Debug, Default)]
pub struct ListProvider {
    values: Vec<Value>,
    names: Option<Vec<String>>,
}

impl ListProvider {
    pub fn new(values: Vec<Value>) -> Self {
        ListProvider {
            values,
            names: None,
        }
    }

    #[must_use]
    pub fn with_names(mut self, names: &[&str]) -> Self {
        self.names = Some(names.iter().map(|n| (*n).to_string()).collect());
        self
    }
}

impl Provider for ListProvider {
    fn values(&self) -> Box<dyn Iterator<Item = Value> + '_> {
        Box::new(self.values.iter().cloned())
    }

    fn display_name(&self, index: usize) -> Result<Option<String>, String> {
        Ok(self
            .names
            .as_ref()
            .and_then(|names| names.get(index).cloned()))
    }
}

type SequenceFn = dyn Fn() -> Box<dyn Iterator<Item = Value>> + Send + Sync;

/// A provider over a generated (possibly infinite) sequence.
pub struct FnProvider {
    sequence: Box<SequenceFn>,
}

impl FnProvider {
    pub fn new<F>(sequence: F) -> Self
    where
        F: Fn() -> Box<dyn Iterator<Item = Value>> + Send + Sync + 'static,
    {
        FnProvider {
            sequence: Box::new(sequence),
        }
    }
}

impl Provider for FnProvider {
    fn values(&self) -> Box<dyn Iterator<Item = Value> + '_> {
        (self.sequence)()
    }
}
