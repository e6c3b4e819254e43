//! Preview runner driver.
//!
//! Wires the reload pipeline to external tools: discovery, compilation and
//! the build system are shell commands (see `command`), and preview modules
//! run inside a host process (see `host`).

mod build_system;
mod command;
mod compiler;
mod config;
mod discovery;
mod host;
mod logging;
mod output;

pub use build_system::CommandBuildSystem;
pub use command::{CommandError, CommandTemplate, Vars};
pub use compiler::{parse_diagnostic, CommandCompiler};
pub use config::{ConfigError, Mode, PreviewConfig};
pub use discovery::CommandDiscovery;
pub use host::{HostChannel, HostError, HostModule, HostModuleLoader, DEFAULT_HOST_ENTRY};
pub use logging::{init_tracing, DEFAULT_FILTER};
pub use output::{event_json, write_event, OutputFormat};
