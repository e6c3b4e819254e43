//! Loading preview modules into a host process.
//!
//! The host is an executable found on the active search path. It is started
//! once per render cycle and driven over stdin/stdout with one JSON object
//! per line.
//!
//! Requests carry an `op` field:
//!
//! ```text
//! {"op":"describe","function":"app.ui.Previews.card"}   -> {"ok":{"overloads":[["User"],["str"]]}}
//! {"op":"describe","provider":"app.ui.Users"}           -> {"ok":{"instance":1}}
//! {"op":"values","instance":1,"offset":0,"count":32}    -> {"ok":[...]}
//! {"op":"display_name","instance":1,"index":0}          -> {"ok":"Alice"} | {"ok":null}
//! {"op":"invoke","function":"...","overload":0,"args":[...]}
//! ```
//!
//! Every reply is `{"ok": value}`, `{"rejected": reason}` or
//! `{"raised": message}`. A `rejected` describe means "no such symbol".

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use vista_invoke::{CallError, Callable, Module, Provider, ProviderLookupError};
use vista_ir::{FunctionDescriptor, Value};
use vista_overlay::Resolver;
use vista_reload::{LoadError, ModuleLoader};

/// Default artifact name of the host executable.
pub const DEFAULT_HOST_ENTRY: &str = "vista-host";

/// Values requested from the host per `values` round trip.
const VALUES_CHUNK: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("host i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("host protocol error: {0}")]
    Protocol(String),
    #[error("host process closed the channel")]
    Closed,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Describe {
        #[serde(skip_serializing_if = "Option::is_none")]
        function: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider: Option<&'a str>,
    },
    Values {
        instance: u64,
        offset: usize,
        count: usize,
    },
    DisplayName {
        instance: u64,
        index: usize,
    },
    Invoke {
        function: &'a str,
        overload: usize,
        args: &'a [Value],
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Reply {
    Ok(serde_json::Value),
    Rejected(String),
    Raised(String),
}

#[derive(Debug, Deserialize)]
struct FunctionShape {
    overloads: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ProviderShape {
    instance: u64,
}

struct Pipes {
    reader: Box<dyn BufRead + Send>,
    writer: Box<dyn Write + Send>,
    child: Option<Child>,
    closed: bool,
}

/// Line-oriented request/reply channel to the host.
pub struct HostChannel {
    pipes: Mutex<Pipes>,
}

impl HostChannel {
    pub fn new(reader: Box<dyn BufRead + Send>, writer: Box<dyn Write + Send>) -> Self {
        HostChannel {
            pipes: Mutex::new(Pipes {
                reader,
                writer,
                child: None,
                closed: false,
            }),
        }
    }

    fn spawned(mut child: Child) -> Result<Self, HostError> {
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(HostError::Protocol("host pipes unavailable".to_string()));
        };
        let channel = HostChannel::new(Box::new(BufReader::new(stdout)), Box::new(stdin));
        channel.pipes.lock().child = Some(child);
        Ok(channel)
    }

    fn request(&self, request: &Request<'_>) -> Result<Reply, HostError> {
        let mut pipes = self.pipes.lock();
        if pipes.closed {
            return Err(HostError::Closed);
        }
        let mut line =
            serde_json::to_string(request).map_err(|e| HostError::Protocol(e.to_string()))?;
        line.push('\n');
        pipes.writer.write_all(line.as_bytes())?;
        pipes.writer.flush()?;

        let mut reply = String::new();
        if pipes.reader.read_line(&mut reply)? == 0 {
            pipes.closed = true;
            return Err(HostError::Closed);
        }
        serde_json::from_str(reply.trim())
            .map_err(|e| HostError::Protocol(format!("bad reply `{}`: {e}", reply.trim())))
    }

    /// Stop the host process. Later requests fail with `Closed`.
    pub fn close(&self) {
        let mut pipes = self.pipes.lock();
        pipes.closed = true;
        if let Some(mut child) = pipes.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!("host already exited: {e}");
            }
            let _ = child.wait();
        }
    }
}

impl Drop for HostChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Starts the host entry found through the resolver.
#[derive(Clone, Debug)]
pub struct HostModuleLoader {
    entry: String,
}

impl Default for HostModuleLoader {
    fn default() -> Self {
        HostModuleLoader::new(DEFAULT_HOST_ENTRY)
    }
}

impl HostModuleLoader {
    pub fn new(entry: impl Into<String>) -> Self {
        HostModuleLoader {
            entry: entry.into(),
        }
    }
}

impl ModuleLoader for HostModuleLoader {
    fn load(&self, resolver: &dyn Resolver, file: &Path) -> Result<Box<dyn Module>, LoadError> {
        let artifact = resolver.resolve(&self.entry).ok_or_else(|| {
            LoadError::new(file, format!("host entry `{}` not found on the search path", self.entry))
        })?;
        let search_path = std::env::join_paths(resolver.search_path())
            .map_err(|e| LoadError::new(file, format!("unusable search path: {e}")))?;

        tracing::debug!(host = %artifact.path.display(), origin = ?artifact.origin, "starting host");
        let child = Command::new(&artifact.path)
            .env("VISTA_PATH", search_path)
            .env("VISTA_FILE", file)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| LoadError::new(file, format!("cannot start host: {e}")))?;
        let channel = HostChannel::spawned(child).map_err(|e| LoadError::new(file, e.to_string()))?;
        Ok(Box::new(HostModule::new(channel)))
    }
}

/// A module living in a host process. Dropping it stops the process.
pub struct HostModule {
    channel: Arc<HostChannel>,
}

impl HostModule {
    pub fn new(channel: HostChannel) -> Self {
        HostModule {
            channel: Arc::new(channel),
        }
    }
}

impl Drop for HostModule {
    fn drop(&mut self) {
        self.channel.close();
    }
}

impl Module for HostModule {
    fn candidates(&self, descriptor: &FunctionDescriptor) -> Vec<Arc<dyn Callable>> {
        let function = descriptor.qualified_name();
        let request = Request::Describe {
            function: Some(&function),
            provider: None,
        };
        let shape = match self.channel.request(&request) {
            Ok(Reply::Ok(value)) => serde_json::from_value::<FunctionShape>(value)
                .map_err(|e| format!("bad describe reply: {e}")),
            Ok(Reply::Rejected(_)) => return Vec::new(),
            Ok(Reply::Raised(message)) => Err(message),
            Err(e) => Err(e.to_string()),
        };
        match shape {
            Ok(shape) => shape
                .overloads
                .into_iter()
                .enumerate()
                .map(|(overload, param_types)| {
                    let callable: Arc<dyn Callable> = Arc::new(HostCallable {
                        channel: Arc::clone(&self.channel),
                        function: function.clone(),
                        overload,
                        param_types,
                    });
                    callable
                })
                .collect(),
            Err(message) => {
                tracing::warn!(function = %function, "describe failed: {message}");
                Vec::new()
            }
        }
    }

    fn instantiate_provider(&self, reference: &str) -> Result<Arc<dyn Provider>, ProviderLookupError> {
        let request = Request::Describe {
            function: None,
            provider: Some(reference),
        };
        match self.channel.request(&request) {
            Ok(Reply::Ok(value)) => {
                let shape: ProviderShape = serde_json::from_value(value)
                    .map_err(|e| ProviderLookupError::Failed(format!("bad describe reply: {e}")))?;
                Ok(Arc::new(HostProvider {
                    channel: Arc::clone(&self.channel),
                    instance: shape.instance,
                }))
            }
            Ok(Reply::Rejected(_)) => Err(ProviderLookupError::NotFound),
            Ok(Reply::Raised(message)) => Err(ProviderLookupError::Failed(message)),
            Err(e) => Err(ProviderLookupError::Failed(e.to_string())),
        }
    }
}

struct HostCallable {
    channel: Arc<HostChannel>,
    function: String,
    overload: usize,
    param_types: Vec<String>,
}

impl Callable for HostCallable {
    fn param_types(&self) -> &[String] {
        &self.param_types
    }

    fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        let request = Request::Invoke {
            function: &self.function,
            overload: self.overload,
            args,
        };
        match self.channel.request(&request) {
            Ok(Reply::Ok(value)) => serde_json::from_value(value)
                .map_err(|e| CallError::Raised(format!("unrepresentable result: {e}"))),
            Ok(Reply::Rejected(reason)) => Err(CallError::Rejected(reason)),
            Ok(Reply::Raised(message)) => Err(CallError::Raised(message)),
            Err(e) => Err(CallError::Raised(e.to_string())),
        }
    }
}

struct HostProvider {
    channel: Arc<HostChannel>,
    instance: u64,
}

impl Provider for HostProvider {
    fn values(&self) -> Box<dyn Iterator<Item = Value> + '_> {
        Box::new(HostValues::new(self))
    }

    fn take_values(&self, limit: usize) -> Result<Vec<Value>, String> {
        let mut values = HostValues::new(self);
        let taken: Vec<Value> = values.by_ref().take(limit).collect();
        match values.error {
            Some(cause) => Err(cause),
            None => Ok(taken),
        }
    }

    fn display_name(&self, index: usize) -> Result<Option<String>, String> {
        let request = Request::DisplayName {
            instance: self.instance,
            index,
        };
        match self.channel.request(&request) {
            Ok(Reply::Ok(serde_json::Value::Null)) => Ok(None),
            Ok(Reply::Ok(serde_json::Value::String(name))) => Ok(Some(name)),
            Ok(Reply::Ok(other)) => Err(format!("display name is not a string: {other}")),
            Ok(Reply::Rejected(message) | Reply::Raised(message)) => Err(message),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Pulls provider values from the host in chunks, on demand.
///
/// A failed fetch ends the sequence and is kept in `error`.
struct HostValues<'a> {
    provider: &'a HostProvider,
    buffer: VecDeque<Value>,
    offset: usize,
    exhausted: bool,
    error: Option<String>,
}

impl<'a> HostValues<'a> {
    fn new(provider: &'a HostProvider) -> Self {
        HostValues {
            provider,
            buffer: VecDeque::new(),
            offset: 0,
            exhausted: false,
            error: None,
        }
    }

    fn fetch(&mut self) {
        let request = Request::Values {
            instance: self.provider.instance,
            offset: self.offset,
            count: VALUES_CHUNK,
        };
        let chunk = match self.provider.channel.request(&request) {
            Ok(Reply::Ok(value)) => {
                serde_json::from_value::<Vec<Value>>(value).map_err(|e| e.to_string())
            }
            Ok(Reply::Rejected(message) | Reply::Raised(message)) => Err(message),
            Err(e) => Err(e.to_string()),
        };
        match chunk {
            Ok(values) => {
                self.exhausted = values.len() < VALUES_CHUNK;
                self.offset += values.len();
                self.buffer.extend(values);
            }
            Err(message) => {
                tracing::warn!(instance = self.provider.instance, "provider values failed: {message}");
                self.exhausted = true;
                self.error = Some(message);
            }
        }
    }
}

impl Iterator for HostValues<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch();
        }
        self.buffer.pop_front()
    }
}
