//! Rendering one preview file and reporting the outcome.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use rayon::prelude::*;
use vista_invoke::{EngineWarning, InvocationEngine, InvocationResult, InvokeConfig, Module};
use vista_ir::{FunctionDescriptor, ValidationError};

/// Which loader served a render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderPath {
    /// First render after startup.
    Initial,
    /// Overlay of freshly compiled units over the cached classpath.
    Fast,
    /// Classpath from a full external rebuild.
    Full,
}

impl RenderPath {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderPath::Initial => "initial",
            RenderPath::Fast => "fast",
            RenderPath::Full => "full",
        }
    }
}

impl fmt::Display for RenderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Results for one preview function.
#[derive(Clone, Debug)]
pub struct FunctionReport {
    pub descriptor: FunctionDescriptor,
    pub results: Vec<InvocationResult>,
    pub warnings: Vec<EngineWarning>,
}

impl FunctionReport {
    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.results.len() - self.successes()
    }
}

/// Everything produced by one render cycle.
#[derive(Clone, Debug)]
pub struct RenderReport {
    pub path: RenderPath,
    pub file: PathBuf,
    pub functions: Vec<FunctionReport>,
    /// Non-empty when discovery rejected the file; `functions` is then empty.
    pub validation_errors: Vec<ValidationError>,
    pub duration: Duration,
}

impl RenderReport {
    pub fn total(&self) -> usize {
        self.functions.iter().map(|f| f.results.len()).sum()
    }

    pub fn successes(&self) -> usize {
        self.functions.iter().map(FunctionReport::successes).sum()
    }

    pub fn failures(&self) -> usize {
        self.functions.iter().map(FunctionReport::failures).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0 || !self.validation_errors.is_empty()
    }

    /// Process exit code for one-shot rendering.
    ///
    /// - 0: at least one result, none failed
    /// - 1: any failure or validation error
    /// - 2: nothing rendered
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else if self.total() == 0 {
            2
        } else {
            0
        }
    }
}

/// Stage at which a reload cycle failed before anything rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureStage {
    /// Reading the previewed source.
    Source,
    /// Target lookup or classpath resolution.
    Build,
    /// Module loading.
    Load,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureStage::Source => "source",
            FailureStage::Build => "build",
            FailureStage::Load => "load",
        })
    }
}

/// What the orchestrator tells its sink after each cycle.
#[derive(Clone, Debug)]
pub enum RenderEvent {
    Rendered(RenderReport),
    Failed {
        path: RenderPath,
        stage: FailureStage,
        message: String,
    },
}

/// Receives render events on the reload worker thread.
pub trait RenderSink: Send {
    fn on_event(&mut self, event: RenderEvent);
}

impl<F> RenderSink for F
where
    F: FnMut(RenderEvent) + Send,
{
    fn on_event(&mut self, event: RenderEvent) {
        self(event);
    }
}

/// Invokes every selected function of a loaded module.
#[derive(Clone, Debug, Default)]
pub struct Renderer {
    engine: InvocationEngine,
    parallel: bool,
}

impl Renderer {
    pub fn new(config: InvokeConfig, parallel: bool) -> Self {
        Renderer {
            engine: InvocationEngine::with_config(config),
            parallel,
        }
    }

    /// Invoke each descriptor; reports come back in descriptor order.
    pub fn render(&self, descriptors: &[FunctionDescriptor], module: &dyn Module) -> Vec<FunctionReport> {
        if self.parallel && descriptors.len() > 1 {
            let pooled = rayon::ThreadPoolBuilder::new().build_scoped(
                rayon::ThreadBuilder::run,
                |pool| {
                    pool.install(|| {
                        descriptors
                            .par_iter()
                            .map(|descriptor| self.render_one(descriptor, module))
                            .collect::<Vec<_>>()
                    })
                },
            );
            match pooled {
                Ok(reports) => return reports,
                Err(e) => tracing::warn!("failed to build render pool, rendering sequentially: {e}"),
            }
        }
        descriptors
            .iter()
            .map(|descriptor| self.render_one(descriptor, module))
            .collect()
    }

    fn render_one(&self, descriptor: &FunctionDescriptor, module: &dyn Module) -> FunctionReport {
        let invocation = self.engine.invoke(descriptor, module);
        FunctionReport {
            descriptor: descriptor.clone(),
            results: invocation.results,
            warnings: invocation.warnings,
        }
    }
}
