//! Driver configuration: command-line flags and environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use vista_reload::{Collaborators, ReloadConfig, DEFAULT_DEBOUNCE};

use crate::build_system::CommandBuildSystem;
use crate::command::{CommandError, CommandTemplate};
use crate::compiler::CommandCompiler;
use crate::discovery::CommandDiscovery;
use crate::host::{HostModuleLoader, DEFAULT_HOST_ENTRY};
use crate::output::OutputFormat;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing source file")]
    MissingFile,
    #[error("unknown option `{0}`")]
    UnknownFlag(String),
    #[error("invalid value `{value}` for {flag}")]
    InvalidValue { flag: String, value: String },
    #[error("no command given for {flag}")]
    MissingCommand { flag: &'static str },
    #[error("bad command for {flag}: {source}")]
    Template {
        flag: &'static str,
        #[source]
        source: CommandError,
    },
}

/// What the binary does after setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Render, then re-render on every change until interrupted.
    Watch,
    /// Render once and exit.
    Render,
}

#[derive(Clone, Debug)]
pub struct PreviewConfig {
    pub mode: Mode,
    pub file: PathBuf,
    pub root: PathBuf,
    pub format: OutputFormat,
    /// Hierarchical log output instead of flat lines.
    pub log_tree: bool,
    pub parallel: bool,
    pub filter: Option<String>,
    pub profile: bool,
    pub debounce: Duration,
    /// Overrides the hard combination limit.
    pub limit: Option<usize>,
    pub scratch_parent: Option<PathBuf>,
    pub discover: Option<String>,
    pub compile: Option<String>,
    pub target: Option<String>,
    pub classpath: Option<String>,
    pub host: String,
}

impl PreviewConfig {
    fn new(mode: Mode) -> Self {
        PreviewConfig {
            mode,
            file: PathBuf::new(),
            root: PathBuf::from("."),
            format: OutputFormat::default(),
            log_tree: false,
            parallel: false,
            filter: None,
            profile: false,
            debounce: DEFAULT_DEBOUNCE,
            limit: None,
            scratch_parent: None,
            discover: None,
            compile: None,
            target: None,
            classpath: None,
            host: DEFAULT_HOST_ENTRY.to_string(),
        }
    }

    /// Parse the arguments following the command name.
    ///
    /// `env` is consulted first; flags override it.
    pub fn from_args(
        mode: Mode,
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = PreviewConfig::new(mode);
        config.apply_env(env)?;

        let mut file = None;
        for arg in args {
            if let Some(root) = arg.strip_prefix("--root=") {
                config.root = PathBuf::from(root);
            } else if let Some(format) = arg.strip_prefix("--format=") {
                config.format = format.parse().map_err(|_| invalid("--format", format))?;
            } else if let Some(filter) = arg.strip_prefix("--filter=") {
                config.filter = Some(filter.to_string());
            } else if arg == "--parallel" {
                config.parallel = true;
            } else if arg == "--profile" {
                config.profile = true;
            } else if arg == "--log-tree" {
                config.log_tree = true;
            } else if let Some(ms) = arg.strip_prefix("--debounce=") {
                config.debounce = parse_millis("--debounce", ms)?;
            } else if let Some(limit) = arg.strip_prefix("--limit=") {
                config.limit = Some(limit.parse().map_err(|_| invalid("--limit", limit))?);
            } else if let Some(dir) = arg.strip_prefix("--scratch=") {
                config.scratch_parent = Some(PathBuf::from(dir));
            } else if let Some(cmd) = arg.strip_prefix("--discover=") {
                config.discover = Some(cmd.to_string());
            } else if let Some(cmd) = arg.strip_prefix("--compile=") {
                config.compile = Some(cmd.to_string());
            } else if let Some(cmd) = arg.strip_prefix("--target=") {
                config.target = Some(cmd.to_string());
            } else if let Some(cmd) = arg.strip_prefix("--classpath=") {
                config.classpath = Some(cmd.to_string());
            } else if let Some(host) = arg.strip_prefix("--host=") {
                config.host = host.to_string();
            } else if arg.starts_with('-') {
                return Err(ConfigError::UnknownFlag(arg.clone()));
            } else if file.is_none() {
                file = Some(PathBuf::from(arg));
            } else {
                return Err(ConfigError::UnknownFlag(arg.clone()));
            }
        }

        config.file = file.ok_or(ConfigError::MissingFile)?;
        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(ms) = env("VISTA_DEBOUNCE_MS") {
            self.debounce = parse_millis("VISTA_DEBOUNCE_MS", &ms)?;
        }
        if let Some(profile) = env("VISTA_PROFILE") {
            self.profile = match profile.as_str() {
                "1" | "true" | "yes" => true,
                "" | "0" | "false" | "no" => false,
                _ => return Err(invalid("VISTA_PROFILE", &profile)),
            };
        }
        self.discover = env("VISTA_DISCOVER").or(self.discover.take());
        self.compile = env("VISTA_COMPILE").or(self.compile.take());
        self.target = env("VISTA_TARGET").or(self.target.take());
        self.classpath = env("VISTA_CLASSPATH").or(self.classpath.take());
        Ok(())
    }

    pub fn reload_config(&self) -> ReloadConfig {
        let mut reload = ReloadConfig::new(&self.file, &self.root);
        reload.debounce = self.debounce;
        reload.parallel = self.parallel;
        reload.filter.clone_from(&self.filter);
        if let Some(parent) = &self.scratch_parent {
            reload.scratch_parent.clone_from(parent);
        }
        reload.invoke.profile = self.profile;
        if let Some(limit) = self.limit {
            reload.invoke.max_combinations = limit;
        }
        reload
    }

    /// Build the command-backed collaborators. Every command is required.
    pub fn collaborators(&self) -> Result<Collaborators, ConfigError> {
        let discover = template("--discover", self.discover.as_deref())?;
        let compile = template("--compile", self.compile.as_deref())?;
        let target = template("--target", self.target.as_deref())?;
        let classpath = template("--classpath", self.classpath.as_deref())?;

        Ok(Collaborators {
            discovery: Box::new(CommandDiscovery::new(discover, &self.root)),
            compiler: Box::new(CommandCompiler::new(compile)),
            build: Box::new(CommandBuildSystem::new(target, classpath)),
            loader: Box::new(HostModuleLoader::new(self.host.clone())),
        })
    }
}

fn template(flag: &'static str, command: Option<&str>) -> Result<CommandTemplate, ConfigError> {
    let command = command.ok_or(ConfigError::MissingCommand { flag })?;
    CommandTemplate::parse(command).map_err(|source| ConfigError::Template { flag, source })
}

fn parse_millis(flag: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse()
        .map(Duration::from_millis)
        .map_err(|_| invalid(flag, value))
}

fn invalid(flag: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    }
}
