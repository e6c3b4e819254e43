//! Reload pipeline driven through fake collaborators.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};
use vista_invoke::{ListProvider, Module, NativeModule};
use vista_ir::{Diagnostic, FunctionDescriptor, Location, ParameterSpec, ValidationError, Value};
use vista_overlay::Resolver;
use vista_reload::{
    render_once, start, BuildError, BuildSystem, ChangeBatch, Collaborators, CompileOutcome,
    Compiler, Discovery, FailureStage, LoadError, ModuleLoader, ReloadConfig, ReloadOrchestrator,
    RenderEvent, RenderPath, State, TargetId,
};

/// Holds `FakeLoader` inside `load` while armed, until released.
#[derive(Default)]
struct Gate {
    armed: AtomicBool,
    entered: AtomicBool,
    released: AtomicBool,
}

#[derive(Default)]
struct Counters {
    compiles: AtomicUsize,
    builds: AtomicUsize,
    compile_fails: AtomicBool,
    build_fails: AtomicBool,
    search_paths: Mutex<Vec<Vec<PathBuf>>>,
    gate: Gate,
}

struct FakeDiscovery;

impl Discovery for FakeDiscovery {
    fn discover(
        &self,
        source: &str,
        _file: &Path,
    ) -> Result<Vec<FunctionDescriptor>, Vec<ValidationError>> {
        if source.contains("invalid") {
            return Err(vec![ValidationError {
                function: "card".into(),
                parameter: "size".into(),
                message: "provider must be a class".into(),
                line: Some(1),
                suggestion: "declare Sizes as a class".into(),
            }]);
        }
        Ok(vec![
            FunctionDescriptor::new("card", "app")
                .with_param(ParameterSpec::new("size", "int", "app.Sizes")),
            FunctionDescriptor::new("plain", "app"),
        ])
    }
}

struct FakeCompiler(Arc<Counters>);

impl Compiler for FakeCompiler {
    fn compile(&self, _sources: &[PathBuf], _classpath: &[PathBuf], out: &Path) -> CompileOutcome {
        self.0.compiles.fetch_add(1, Ordering::SeqCst);
        if self.0.compile_fails.load(Ordering::SeqCst) {
            return CompileOutcome::failed(vec![Diagnostic::error("unresolved reference: Siez")
                .at(Location {
                    file: PathBuf::from("src/Card.kt"),
                    line: 3,
                    column: Some(9),
                })]);
        }
        fs::create_dir_all(out).unwrap();
        fs::write(out.join("Card.unit"), "patched").unwrap();
        CompileOutcome::succeeded()
    }
}

struct FakeBuild {
    counters: Arc<Counters>,
    classpath: PathBuf,
}

impl BuildSystem for FakeBuild {
    fn find_target(&self, _root: &Path, file: &Path) -> Result<TargetId, BuildError> {
        if self.counters.build_fails.load(Ordering::SeqCst) {
            return Err(BuildError::NoTarget {
                file: file.to_path_buf(),
            });
        }
        Ok(TargetId("//app:ui".into()))
    }

    fn resolve_classpath(&self, _root: &Path, _target: &TargetId) -> Result<Vec<PathBuf>, BuildError> {
        self.counters.builds.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.classpath.clone()])
    }
}

/// Serves `Card.unit`'s content through `app.card`, so results show which
/// loader was used.
struct FakeLoader(Arc<Counters>);

impl ModuleLoader for FakeLoader {
    fn load(&self, resolver: &dyn Resolver, file: &Path) -> Result<Box<dyn Module>, LoadError> {
        let gate = &self.0.gate;
        if gate.armed.load(Ordering::SeqCst) {
            gate.entered.store(true, Ordering::SeqCst);
            while !gate.released.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(10));
            }
        }
        self.0.search_paths.lock().push(resolver.search_path());
        let unit = resolver
            .resolve("Card.unit")
            .ok_or_else(|| LoadError::new(file, "Card.unit not found"))?;
        let content = fs::read_to_string(&unit.path).map_err(|e| LoadError::new(file, e.to_string()))?;

        let mut module = NativeModule::new();
        module
            .function("app.card", &["int"], move |args| {
                Ok(Value::string(format!("{content}-{}", args[0])))
            })
            .function("app.plain", &[], |_| Ok(Value::from("plain")))
            .singleton_provider("app.Sizes", ListProvider::new(vec![Value::Int(1), Value::Int(2)]));
        Ok(Box::new(module))
    }
}

struct Fixture {
    dir: TempDir,
    counters: Arc<Counters>,
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("base")).unwrap();
        fs::create_dir_all(dir.path().join("scratch")).unwrap();
        fs::write(dir.path().join("src/Card.kt"), "fun card(size: Int)").unwrap();
        fs::write(dir.path().join("base/Card.unit"), "base").unwrap();
        Fixture {
            dir,
            counters: Arc::new(Counters::default()),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn source(&self) -> PathBuf {
        self.dir.path().join("src/Card.kt")
    }

    fn config(&self) -> ReloadConfig {
        let mut config = ReloadConfig::new(self.source(), self.dir.path());
        config.scratch_parent = self.dir.path().join("scratch");
        config.debounce = Duration::from_millis(50);
        config
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            discovery: Box::new(FakeDiscovery),
            compiler: Box::new(FakeCompiler(Arc::clone(&self.counters))),
            build: Box::new(FakeBuild {
                counters: Arc::clone(&self.counters),
                classpath: self.dir.path().join("base"),
            }),
            loader: Box::new(FakeLoader(Arc::clone(&self.counters))),
        }
    }

    fn sink(&self) -> impl FnMut(RenderEvent) + Send + 'static {
        let events = Arc::clone(&self.events);
        move |event| events.lock().push(event)
    }

    fn orchestrator(&self, config: ReloadConfig) -> ReloadOrchestrator {
        ReloadOrchestrator::new(config, self.collaborators(), Box::new(self.sink())).unwrap()
    }

    fn take_events(&self) -> Vec<RenderEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    fn builds(&self) -> usize {
        self.counters.builds.load(Ordering::SeqCst)
    }

    fn compiles(&self) -> usize {
        self.counters.compiles.load(Ordering::SeqCst)
    }

    fn scratch_dirs(&self) -> usize {
        fs::read_dir(self.dir.path().join("scratch")).unwrap().count()
    }
}

fn batch(path: &Path) -> ChangeBatch {
    std::iter::once(path.to_path_buf()).collect()
}

/// `(path, payloads)` of a rendered event.
fn rendered(event: &RenderEvent) -> (RenderPath, Vec<String>) {
    match event {
        RenderEvent::Rendered(report) => (
            report.path,
            report
                .functions
                .iter()
                .flat_map(|f| f.results.iter())
                .map(|r| r.payload().unwrap_or("<failed>").to_string())
                .collect(),
        ),
        RenderEvent::Failed { stage, message, .. } => panic!("{stage} failure: {message}"),
    }
}

#[test]
fn initialize_renders_from_full_rebuild_and_warms_up() {
    let fx = Fixture::new();
    let mut orchestrator = fx.orchestrator(fx.config());
    orchestrator.initialize();

    let events = fx.take_events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        rendered(&events[0]),
        (RenderPath::Initial, vec!["base-1".into(), "base-2".into(), "plain".into()])
    );
    assert_eq!(fx.builds(), 1);
    assert_eq!(fx.compiles(), 1);
    assert!(!orchestrator.session().scratch().path().join("warmup").exists());
    assert_eq!(orchestrator.state(), State::Watching);
    assert!(orchestrator.session().target().is_some());
}

#[test]
fn successful_compile_renders_through_overlay() {
    let fx = Fixture::new();
    let mut orchestrator = fx.orchestrator(fx.config());
    orchestrator.initialize();
    fx.take_events();

    orchestrator.handle_batch(&batch(&fx.source()));

    let events = fx.take_events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        rendered(&events[0]),
        (RenderPath::Fast, vec!["patched-1".into(), "patched-2".into(), "plain".into()])
    );
    assert_eq!(fx.builds(), 1, "fast path must not rebuild");

    let search_paths = fx.counters.search_paths.lock();
    let last = search_paths.last().unwrap();
    assert_eq!(last.len(), 2);
    assert!(last[0].ends_with("patch"));
    assert_eq!(last[1], fx.dir.path().join("base"));
}

#[test]
fn compile_failure_falls_back_to_full_rebuild() {
    let fx = Fixture::new();
    let mut orchestrator = fx.orchestrator(fx.config());
    orchestrator.initialize();
    fx.take_events();

    fx.counters.compile_fails.store(true, Ordering::SeqCst);
    orchestrator.handle_batch(&batch(&fx.source()));

    let events = fx.take_events();
    assert_eq!(events.len(), 1);
    assert_eq!(rendered(&events[0]).0, RenderPath::Full);
    assert_eq!(rendered(&events[0]).1[0], "base-1");
    assert_eq!(fx.builds(), 2);
    assert_eq!(orchestrator.state(), State::Watching);
}

/// Log sink shared with a `fmt` subscriber.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn compile_diagnostics_are_logged_as_warnings() {
    let fx = Fixture::new();
    let mut orchestrator = fx.orchestrator(fx.config());
    orchestrator.initialize();
    fx.take_events();
    fx.counters.compile_fails.store(true, Ordering::SeqCst);

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        orchestrator.handle_batch(&batch(&fx.source()));
    });

    let output = String::from_utf8(logs.0.lock().clone()).unwrap();
    let line = output
        .lines()
        .find(|line| line.contains("unresolved reference: Siez"))
        .unwrap();
    assert!(line.contains("WARN"), "{line}");
    assert!(line.contains("severity=error"), "{line}");
    assert!(line.contains("location=src/Card.kt:3:9"), "{line}");
}

#[test]
fn build_failure_is_reported_and_watching_continues() {
    let fx = Fixture::new();
    let mut orchestrator = fx.orchestrator(fx.config());
    orchestrator.initialize();
    fx.take_events();

    fx.counters.compile_fails.store(true, Ordering::SeqCst);
    fx.counters.build_fails.store(true, Ordering::SeqCst);
    orchestrator.handle_batch(&batch(&fx.source()));

    let events = fx.take_events();
    assert!(matches!(
        events.as_slice(),
        [RenderEvent::Failed {
            path: RenderPath::Full,
            stage: FailureStage::Build,
            ..
        }]
    ));
    assert_eq!(orchestrator.state(), State::Watching);
    assert!(orchestrator.session().classpath().is_none());

    // Without a cached classpath the next batch goes straight to a rebuild.
    fx.counters.compile_fails.store(false, Ordering::SeqCst);
    fx.counters.build_fails.store(false, Ordering::SeqCst);
    let compiles = fx.compiles();
    orchestrator.handle_batch(&batch(&fx.source()));
    assert_eq!(fx.compiles(), compiles);
    assert_eq!(rendered(&fx.take_events()[0]).0, RenderPath::Full);
}

#[test]
fn validation_errors_are_reported_without_invoking() {
    let fx = Fixture::new();
    let mut orchestrator = fx.orchestrator(fx.config());
    orchestrator.initialize();
    fx.take_events();

    fs::write(fx.source(), "invalid").unwrap();
    orchestrator.handle_batch(&batch(&fx.source()));

    let events = fx.take_events();
    let RenderEvent::Rendered(report) = &events[0] else {
        panic!("expected a report");
    };
    assert!(report.functions.is_empty());
    assert_eq!(report.validation_errors.len(), 1);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn function_filter_limits_rendering() {
    let fx = Fixture::new();
    let mut config = fx.config();
    config.filter = Some("plain".into());
    let mut orchestrator = fx.orchestrator(config);
    orchestrator.initialize();

    let events = fx.take_events();
    assert_eq!(rendered(&events[0]).1, vec!["plain".to_string()]);
}

#[test]
fn teardown_deletes_scratch_once() {
    let fx = Fixture::new();
    let mut orchestrator = fx.orchestrator(fx.config());
    orchestrator.initialize();
    assert_eq!(fx.scratch_dirs(), 1);

    orchestrator.teardown();
    orchestrator.teardown();
    assert_eq!(fx.scratch_dirs(), 0);
    assert_eq!(orchestrator.state(), State::Terminated);

    orchestrator.handle_batch(&batch(&fx.source()));
    assert_eq!(fx.take_events().len(), 1, "only the initial render");
}

#[test]
fn render_once_renders_and_cleans_up() {
    let fx = Fixture::new();
    render_once(fx.config(), fx.collaborators(), fx.sink()).unwrap();
    let events = fx.take_events();
    assert_eq!(events.len(), 1);
    assert_eq!(rendered(&events[0]).0, RenderPath::Initial);
    assert_eq!(fx.scratch_dirs(), 0);
}

#[test]
fn concurrent_shutdown_tears_down_once() {
    let fx = Fixture::new();
    let handle = start(fx.config(), fx.collaborators(), fx.sink()).unwrap();
    assert_eq!(fx.take_events().len(), 1);
    assert_eq!(fx.scratch_dirs(), 1);

    let waiter = {
        let handle = handle.clone();
        thread::spawn(move || handle.wait())
    };
    let callers: Vec<_> = (0..4)
        .map(|_| {
            let handle = handle.clone();
            thread::spawn(move || handle.shutdown())
        })
        .collect();
    let performed = callers
        .into_iter()
        .map(|caller| caller.join().unwrap())
        .filter(|ran| *ran)
        .count();

    assert_eq!(performed, 1);
    waiter.join().unwrap();
    assert!(handle.is_shut_down());
    assert!(!handle.shutdown());
    assert_eq!(fx.scratch_dirs(), 0);
}

#[test]
fn file_change_triggers_fast_render() {
    let fx = Fixture::new();
    let handle = start(fx.config(), fx.collaborators(), fx.sink()).unwrap();
    fx.take_events();

    fs::write(fx.source(), "fun card(size: Int) = 1").unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut events = Vec::new();
    while events.is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(25));
        events = fx.take_events();
    }
    handle.shutdown();

    assert!(!events.is_empty(), "no render after the file changed");
    assert_eq!(rendered(&events[0]).0, RenderPath::Fast);
}

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(20));
    }
    true
}

#[test]
fn drain_timeout_leaves_scratch_to_the_busy_worker() {
    let fx = Fixture::new();
    let mut config = fx.config();
    config.drain_timeout = Duration::from_millis(100);
    let handle = start(config, fx.collaborators(), fx.sink()).unwrap();
    fx.take_events();

    let gate = &fx.counters.gate;
    gate.armed.store(true, Ordering::SeqCst);
    fs::write(fx.source(), "fun card(size: Int) = 2").unwrap();
    assert!(wait_until(|| gate.entered.load(Ordering::SeqCst)), "render never started");

    assert!(handle.shutdown());
    // The render holding the overlay is still running; its files stay put.
    assert_eq!(fx.scratch_dirs(), 1);

    gate.released.store(true, Ordering::SeqCst);
    assert!(wait_until(|| fx.scratch_dirs() == 0), "worker did not clean up");
}
