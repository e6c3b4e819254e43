//! The reload state machine.
//!
//! ```text
//! Initializing ──► Watching ──batch──► FastCompiling ──ok──► render ──► Watching
//!                     ▲                      │ failure
//!                     │                      ▼
//!                     └────────────── FullRebuilding ──► render
//!
//! any ──shutdown──► ShuttingDown ──► Terminated
//! ```

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use vista_overlay::{ClasspathLoader, OverlayLoader, Resolver};

use crate::batch::ChangeBatch;
use crate::collaborators::Collaborators;
use crate::config::ReloadConfig;
use crate::error::ReloadError;
use crate::render::{FailureStage, RenderEvent, RenderPath, RenderReport, RenderSink, Renderer};
use crate::scratch::ScratchDir;
use crate::session::ReloadSession;
use crate::worker::BatchHandler;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Initializing,
    Watching,
    FastCompiling,
    FullRebuilding,
    ShuttingDown,
    Terminated,
}

/// Owns the session and drives compile, rebuild and render.
///
/// After startup it lives on the reload worker thread (see
/// `SerialExecutor`), which makes it the only writer of its session.
pub struct ReloadOrchestrator {
    config: ReloadConfig,
    collaborators: Collaborators,
    session: ReloadSession,
    renderer: Renderer,
    sink: Box<dyn RenderSink>,
    state: State,
}

/// Why a render produced no report.
struct RenderFailure {
    stage: FailureStage,
    message: String,
}

impl ReloadOrchestrator {
    /// Create the orchestrator and its scratch directory.
    ///
    /// Stale scratch directories from dead processes are purged first.
    pub fn new(
        config: ReloadConfig,
        collaborators: Collaborators,
        sink: Box<dyn RenderSink>,
    ) -> Result<Self, ReloadError> {
        let scratch = ScratchDir::prepare(&config.scratch_parent, &config.scratch_prefix)
            .map_err(ReloadError::Scratch)?;
        let renderer = Renderer::new(config.invoke.clone(), config.parallel);
        Ok(ReloadOrchestrator {
            config,
            collaborators,
            session: ReloadSession::new(scratch),
            renderer,
            sink,
            state: State::Initializing,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn session(&self) -> &ReloadSession {
        &self.session
    }

    pub fn config(&self) -> &ReloadConfig {
        &self.config
    }

    fn transition(&mut self, to: State) {
        if self.state != to {
            debug!(from = ?self.state, to = ?to, "state transition");
            self.state = to;
        }
    }

    /// Full rebuild, first render, then a throwaway compile to warm the
    /// compiler. Failures are reported to the sink; watching starts anyway.
    #[tracing::instrument(level = "debug", skip(self), fields(file = %self.config.file.display()))]
    pub fn initialize(&mut self) {
        self.transition(State::Initializing);
        self.full_rebuild(RenderPath::Initial);
        self.warm_up();
        self.transition(State::Watching);
    }

    /// React to one debounced batch of changes.
    #[tracing::instrument(level = "debug", skip_all, fields(paths = batch.len()))]
    pub fn handle_batch(&mut self, batch: &ChangeBatch) {
        if self.session.is_torn_down() {
            return;
        }
        for path in batch.paths() {
            debug!(path = %path.display(), "changed");
        }
        if !self.fast_path() {
            self.full_rebuild(RenderPath::Full);
        }
        self.transition(State::Watching);
    }

    /// Delete the scratch directory. Idempotent.
    pub fn teardown(&mut self) {
        if self.state == State::Terminated {
            return;
        }
        self.transition(State::ShuttingDown);
        self.session.teardown();
        self.transition(State::Terminated);
        info!("preview session terminated");
    }

    /// Compile the previewed file alone and render through an overlay.
    ///
    /// Returns `false` when the full rebuild should take over.
    #[tracing::instrument(level = "debug", skip_all)]
    fn fast_path(&mut self) -> bool {
        self.transition(State::FastCompiling);
        let Some(classpath) = self.session.classpath().map(<[PathBuf]>::to_vec) else {
            debug!("no cached classpath; fast compile skipped");
            return false;
        };
        let out = match self.session.scratch().patch_dir() {
            Ok(out) => out,
            Err(e) => {
                warn!("cannot create patch directory: {e}");
                return false;
            }
        };

        let started = Instant::now();
        let outcome = self.collaborators.compiler.compile(
            std::slice::from_ref(&self.config.file),
            &classpath,
            &out,
        );
        if !outcome.success {
            for diagnostic in &outcome.diagnostics {
                let location = diagnostic
                    .location
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                warn!(
                    severity = %diagnostic.severity,
                    location = %location,
                    "{}",
                    diagnostic.message
                );
            }
            info!(
                diagnostics = outcome.diagnostics.len(),
                "fast compile failed; falling back to full rebuild"
            );
            return false;
        }
        debug!(elapsed = ?started.elapsed(), "fast compile succeeded");

        let overlay = match OverlayLoader::new(&out, classpath) {
            Ok(overlay) => overlay,
            Err(e) => {
                warn!("cannot open patch directory: {e}");
                return false;
            }
        };
        match self.render(RenderPath::Fast, &overlay) {
            Ok(report) => {
                self.sink.on_event(RenderEvent::Rendered(report));
                true
            }
            Err(failure) => {
                info!(
                    stage = %failure.stage,
                    "fast render failed; falling back to full rebuild: {}",
                    failure.message
                );
                false
            }
        }
    }

    /// Re-resolve target and classpath, then render from the classpath.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    fn full_rebuild(&mut self, path: RenderPath) {
        self.transition(State::FullRebuilding);
        self.session.invalidate();

        let build = &self.collaborators.build;
        let resolved = build
            .find_target(&self.config.root, &self.config.file)
            .and_then(|target| {
                let classpath = build.resolve_classpath(&self.config.root, &target)?;
                Ok((target, classpath))
            });
        let (target, classpath) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("full rebuild failed: {e}");
                self.sink.on_event(RenderEvent::Failed {
                    path,
                    stage: FailureStage::Build,
                    message: e.to_string(),
                });
                return;
            }
        };
        info!(%target, entries = classpath.len(), "full rebuild succeeded");
        self.session.cache(target, classpath.clone());

        let loader = ClasspathLoader::new(classpath);
        let event = match self.render(path, &loader) {
            Ok(report) => RenderEvent::Rendered(report),
            Err(failure) => {
                error!(stage = %failure.stage, "render failed: {}", failure.message);
                RenderEvent::Failed {
                    path,
                    stage: failure.stage,
                    message: failure.message,
                }
            }
        };
        self.sink.on_event(event);
    }

    fn warm_up(&mut self) {
        let Some(classpath) = self.session.classpath().map(<[PathBuf]>::to_vec) else {
            return;
        };
        let out = match self.session.scratch().warmup_dir() {
            Ok(out) => out,
            Err(e) => {
                debug!("warm-up skipped: {e}");
                return;
            }
        };
        let started = Instant::now();
        let outcome = self.collaborators.compiler.compile(
            std::slice::from_ref(&self.config.file),
            &classpath,
            &out,
        );
        debug!(success = outcome.success, elapsed = ?started.elapsed(), "warm-up compile");
        if let Err(e) = fs::remove_dir_all(&out) {
            debug!("failed to clear warm-up output: {e}");
        }
    }

    /// Discover, load and invoke. The loaded module is dropped before returning.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path))]
    fn render(&self, path: RenderPath, resolver: &dyn Resolver) -> Result<RenderReport, RenderFailure> {
        let started = Instant::now();
        let file = &self.config.file;
        let source = fs::read_to_string(file).map_err(|e| RenderFailure {
            stage: FailureStage::Source,
            message: format!("cannot read {}: {e}", file.display()),
        })?;

        let descriptors = match self.collaborators.discovery.discover(&source, file) {
            Ok(descriptors) => descriptors,
            Err(validation_errors) => {
                warn!(errors = validation_errors.len(), "preview validation failed");
                return Ok(RenderReport {
                    path,
                    file: file.clone(),
                    functions: Vec::new(),
                    validation_errors,
                    duration: started.elapsed(),
                });
            }
        };
        let selected: Vec<_> = descriptors
            .into_iter()
            .filter(|d| self.config.selects(&d.name))
            .collect();

        let module = self
            .collaborators
            .loader
            .load(resolver, file)
            .map_err(|e| RenderFailure {
                stage: FailureStage::Load,
                message: e.to_string(),
            })?;
        let functions = self.renderer.render(&selected, module.as_ref());
        drop(module);

        let report = RenderReport {
            path,
            file: file.clone(),
            functions,
            validation_errors: Vec::new(),
            duration: started.elapsed(),
        };
        info!(
            path = %report.path,
            functions = report.functions.len(),
            ok = report.successes(),
            failed = report.failures(),
            elapsed = ?report.duration,
            "rendered"
        );
        Ok(report)
    }
}

impl BatchHandler for ReloadOrchestrator {
    fn handle(&mut self, batch: ChangeBatch) {
        self.handle_batch(&batch);
    }

    fn finish(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for ReloadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadOrchestrator")
            .field("file", &self.config.file)
            .field("state", &self.state)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
