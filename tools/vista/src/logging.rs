//! Tracing subscriber setup for the binary.

use std::sync::Once;

/// Filter used when neither `VISTA_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str =
    "warn,vista=info,vista_reload=info,vista_invoke=info,vista_overlay=info";

static TRACING_INIT: Once = Once::new();

/// Install the global subscriber. Later calls do nothing.
///
/// Logs go to stderr; stdout carries render output only. With `tree` the
/// flat formatter is replaced by an indented span tree.
pub fn init_tracing(tree: bool) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_env("VISTA_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let flat = (!tree).then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
        });
        let hierarchical = tree.then(|| {
            tracing_tree::HierarchicalLayer::new(2)
                .with_writer(std::io::stderr)
                .with_targets(true)
        });

        let installed = tracing_subscriber::registry()
            .with(flat)
            .with(hierarchical)
            .with(filter)
            .try_init();
        if let Err(e) = installed {
            eprintln!("warning: logging not initialized: {e}");
        }
    });
}
