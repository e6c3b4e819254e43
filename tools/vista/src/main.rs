//! Vista preview runner CLI.

use std::io::Write;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use vista::{init_tracing, write_event, Mode, OutputFormat, PreviewConfig};
use vista_reload::{render_once, start, RenderEvent};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "watch" | "render" => {
            let mode = if command == "watch" {
                Mode::Watch
            } else {
                Mode::Render
            };
            let config = match PreviewConfig::from_args(mode, &args[2..], |key| {
                std::env::var(key).ok()
            }) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("error: {e}");
                    eprintln!("Usage: vista {command} <file> [options]");
                    std::process::exit(1);
                }
            };
            init_tracing(config.log_tree);
            let code = match mode {
                Mode::Watch => watch(&config),
                Mode::Render => render(&config),
            };
            std::process::exit(code);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-v" => {
            println!("Vista preview runner {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

/// Sink printing every event to stdout.
fn printer(format: OutputFormat) -> impl FnMut(RenderEvent) + Send + 'static {
    move |event| {
        let mut stdout = std::io::stdout().lock();
        let written = write_event(&mut stdout, &event, format).and_then(|()| stdout.flush());
        if let Err(e) = written {
            tracing::warn!("failed to write render output: {e}");
        }
    }
}

fn watch(config: &PreviewConfig) -> i32 {
    let collaborators = match config.collaborators() {
        Ok(collaborators) => collaborators,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let handle = match start(config.reload_config(), collaborators, printer(config.format)) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let on_signal = handle.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        on_signal.shutdown();
    }) {
        tracing::warn!("cannot install Ctrl-C handler: {e}");
    }

    handle.wait();
    handle.shutdown();
    0
}

fn render(config: &PreviewConfig) -> i32 {
    let collaborators = match config.collaborators() {
        Ok(collaborators) => collaborators,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let code = Arc::new(AtomicI32::new(2));
    let sink = {
        let code = Arc::clone(&code);
        let mut print = printer(config.format);
        move |event: RenderEvent| {
            let exit = match &event {
                RenderEvent::Rendered(report) => report.exit_code(),
                RenderEvent::Failed { .. } => 1,
            };
            code.store(exit, Ordering::SeqCst);
            print(event);
        }
    };

    if let Err(e) = render_once(config.reload_config(), collaborators, sink) {
        eprintln!("error: {e}");
        return 1;
    }
    code.load(Ordering::SeqCst)
}

fn print_usage() {
    println!("Vista preview runner");
    println!();
    println!("Usage: vista <command> [options]");
    println!();
    println!("Commands:");
    println!("  watch <file>         Render preview functions and re-render on change");
    println!("  render <file>        Render preview functions once and exit");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Collaborator commands (required):");
    println!("  --discover=<cmd>     Print the file's preview functions as JSON");
    println!("  --compile=<cmd>      Compile {{sources}} into {{out}} against {{classpath}}");
    println!("  --target=<cmd>       Print the build target owning {{file}}");
    println!("  --classpath=<cmd>    Build {{target}} and print its artifacts, one per line");
    println!();
    println!("Options:");
    println!("  --root=<dir>         Project root (default: .)");
    println!("  --host=<name>        Host entry on the search path (default: vista-host)");
    println!("  --format=<fmt>       Output: text (default), json");
    println!("  --filter=<pattern>   Only render functions whose name contains pattern");
    println!("  --parallel           Render functions on a thread pool");
    println!("  --profile            Time every invocation");
    println!("  --limit=<n>          Combination limit per function (default: 100)");
    println!("  --debounce=<ms>      Quiet period before reloading (default: 150)");
    println!("  --scratch=<dir>      Parent of the scratch directory (default: temp dir)");
    println!("  --log-tree           Hierarchical log output");
    println!();
    println!("Environment:");
    println!("  VISTA_LOG            Log filter (falls back to RUST_LOG)");
    println!("  VISTA_DISCOVER, VISTA_COMPILE, VISTA_TARGET, VISTA_CLASSPATH");
    println!("                       Defaults for the collaborator commands");
    println!("  VISTA_DEBOUNCE_MS    Default debounce window");
    println!("  VISTA_PROFILE        Set to 1 to enable profiling");
    println!();
    println!("Examples:");
    println!("  vista render src/Card.kt --format=json");
    println!("  vista watch src/Card.kt --filter=card --parallel");
}
