//! External collaborators consumed by the orchestrator.
//!
//! Discovery, compilation, build-system queries and module loading are
//! black boxes here; the driver supplies implementations.

use std::fmt;
use std::path::{Path, PathBuf};

use vista_invoke::Module;
use vista_ir::{Diagnostic, FunctionDescriptor, ValidationError};
use vista_overlay::Resolver;

/// Finds preview functions in one source file.
pub trait Discovery: Send {
    fn discover(
        &self,
        source: &str,
        file: &Path,
    ) -> Result<Vec<FunctionDescriptor>, Vec<ValidationError>>;
}

/// Result of one compile call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileOutcome {
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutcome {
    pub fn succeeded() -> Self {
        CompileOutcome {
            success: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        CompileOutcome {
            success: false,
            diagnostics,
        }
    }
}

/// Compiles source files against a classpath.
///
/// Implementations clear `output_dir` before writing, so repeated calls
/// with the same directory never see stale units.
pub trait Compiler: Send {
    fn compile(&self, sources: &[PathBuf], classpath: &[PathBuf], output_dir: &Path)
        -> CompileOutcome;
}

/// Build-system identifier of the target owning the previewed file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TargetId(pub String);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no build target owns {}", .file.display())]
    NoTarget { file: PathBuf },
    #[error("{} is owned by several targets: {}", .file.display(), .candidates.join(", "))]
    AmbiguousTarget {
        file: PathBuf,
        candidates: Vec<String>,
    },
    #[error("build of `{target}` failed: {message}")]
    Failed { target: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Resolves build targets and their runtime classpath.
pub trait BuildSystem: Send {
    /// The single target owning `file`.
    fn find_target(&self, root: &Path, file: &Path) -> Result<TargetId, BuildError>;

    /// Build `target` and return its runtime classpath, in precedence order.
    fn resolve_classpath(&self, root: &Path, target: &TargetId) -> Result<Vec<PathBuf>, BuildError>;
}

#[derive(Debug, thiserror::Error)]
#[error("failed to load preview module for {}: {message}", .file.display())]
pub struct LoadError {
    pub file: PathBuf,
    pub message: String,
}

impl LoadError {
    pub fn new(file: &Path, message: impl Into<String>) -> Self {
        LoadError {
            file: file.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Loads the previewed module through a resolver.
///
/// The returned module lives for one render cycle; dropping it releases
/// whatever it holds.
pub trait ModuleLoader: Send {
    fn load(&self, resolver: &dyn Resolver, file: &Path) -> Result<Box<dyn Module>, LoadError>;
}

/// The full set of collaborators an orchestrator needs.
pub struct Collaborators {
    pub discovery: Box<dyn Discovery>,
    pub compiler: Box<dyn Compiler>,
    pub build: Box<dyn BuildSystem>,
    pub loader: Box<dyn ModuleLoader>,
}
