//! Command templates for external collaborators.
//!
//! A template is a command line with placeholders:
//!
//! | Placeholder   | Value                                           |
//! |---------------|-------------------------------------------------|
//! | `{file}`      | the previewed file                              |
//! | `{root}`      | the project root                                |
//! | `{target}`    | the resolved build target                       |
//! | `{classpath}` | classpath entries joined with the OS separator  |
//! | `{out}`       | compiler output directory                       |
//! | `{sources}`   | source files; as a whole word, one argument each |
//!
//! `{{` and `}}` produce literal braces. Words are split on whitespace;
//! single or double quotes group a word.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const PLACEHOLDERS: &[&str] = &["file", "root", "target", "classpath", "out", "sources"];

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("empty command template")]
    Empty,
    #[error("unbalanced quote in command template `{0}`")]
    UnbalancedQuote(String),
    #[error("unknown placeholder `{{{name}}}` in command template")]
    UnknownPlaceholder { name: String },
    #[error("placeholder `{{{name}}}` has no value here")]
    MissingValue { name: String },
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("`{program}` produced unusable output: {message}")]
    Output { program: String, message: String },
}

/// Values substituted into a template.
#[derive(Clone, Debug, Default)]
pub struct Vars {
    scalars: BTreeMap<&'static str, String>,
    sources: Option<Vec<String>>,
}

impl Vars {
    pub fn new() -> Self {
        Vars::default()
    }

    #[must_use]
    pub fn file(self, file: &Path) -> Self {
        self.scalar("file", file.display().to_string())
    }

    #[must_use]
    pub fn root(self, root: &Path) -> Self {
        self.scalar("root", root.display().to_string())
    }

    #[must_use]
    pub fn target(self, target: &str) -> Self {
        self.scalar("target", target.to_string())
    }

    #[must_use]
    pub fn out(self, out: &Path) -> Self {
        self.scalar("out", out.display().to_string())
    }

    #[must_use]
    pub fn classpath(self, entries: &[PathBuf]) -> Self {
        let joined = std::env::join_paths(entries).map_or_else(
            |_| {
                entries
                    .iter()
                    .map(|e| e.display().to_string())
                    .collect::<Vec<_>>()
                    .join(":")
            },
            |joined: OsString| joined.to_string_lossy().into_owned(),
        );
        self.scalar("classpath", joined)
    }

    #[must_use]
    pub fn sources(mut self, sources: &[PathBuf]) -> Self {
        self.sources = Some(sources.iter().map(|s| s.display().to_string()).collect());
        self
    }

    fn scalar(mut self, name: &'static str, value: String) -> Self {
        self.scalars.insert(name, value);
        self
    }

    fn lookup(&self, name: &str) -> Result<String, CommandError> {
        if name == "sources" {
            return self
                .sources
                .as_ref()
                .map(|sources| sources.join(" "))
                .ok_or_else(|| missing(name));
        }
        self.scalars.get(name).cloned().ok_or_else(|| missing(name))
    }
}

fn missing(name: &str) -> CommandError {
    CommandError::MissingValue {
        name: name.to_string(),
    }
}

/// A parsed command line with placeholders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandTemplate {
    words: Vec<String>,
}

impl CommandTemplate {
    /// Split `template` into words and check its placeholders.
    pub fn parse(template: &str) -> Result<Self, CommandError> {
        let words = split_words(template)?;
        if words.is_empty() {
            return Err(CommandError::Empty);
        }
        for word in &words {
            for name in placeholders(word) {
                if !PLACEHOLDERS.contains(&name.as_str()) {
                    return Err(CommandError::UnknownPlaceholder { name });
                }
            }
        }
        Ok(CommandTemplate { words })
    }

    pub fn program(&self) -> &str {
        &self.words[0]
    }

    /// Substitute placeholders, producing the argument vector.
    pub fn expand(&self, vars: &Vars) -> Result<Vec<String>, CommandError> {
        let mut argv = Vec::with_capacity(self.words.len());
        for word in &self.words {
            if word == "{sources}" {
                let sources = vars.sources.as_ref().ok_or_else(|| missing("sources"))?;
                argv.extend(sources.iter().cloned());
            } else {
                argv.push(substitute(word, vars)?);
            }
        }
        Ok(argv)
    }

    /// Build a ready-to-run command with piped stdout and stderr.
    pub fn command(&self, vars: &Vars) -> Result<Command, CommandError> {
        let argv = self.expand(vars)?;
        let Some((program, args)) = argv.split_first() else {
            return Err(CommandError::Empty);
        };
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Ok(command)
    }

    /// Run to completion and return its output, whatever the exit status.
    pub fn output(&self, vars: &Vars) -> Result<Output, CommandError> {
        let mut command = self.command(vars)?;
        tracing::debug!(command = ?command, "running collaborator");
        command.output().map_err(|source| CommandError::Spawn {
            program: self.program().to_string(),
            source,
        })
    }

    /// Run and return stdout, failing on a non-zero exit.
    pub fn run(&self, vars: &Vars) -> Result<String, CommandError> {
        let output = self.output(vars)?;
        if !output.status.success() {
            return Err(CommandError::Failed {
                program: self.program().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        String::from_utf8(output.stdout).map_err(|e| CommandError::Output {
            program: self.program().to_string(),
            message: e.to_string(),
        })
    }
}

fn substitute(word: &str, vars: &Vars) -> Result<String, CommandError> {
    let mut out = String::with_capacity(word.len());
    let mut rest = word;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if let Some(after) = tail.strip_prefix('{') {
            match after.split_once('}') {
                Some((name, after)) => {
                    out.push_str(&vars.lookup(name)?);
                    rest = after;
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        } else {
            out.push('}');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn placeholders(word: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = word;
    while let Some(pos) = rest.find('{') {
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("{{") {
            rest = after;
            continue;
        }
        match tail[1..].split_once('}') {
            Some((name, after)) => {
                names.push(name.to_string());
                rest = after;
            }
            None => break,
        }
    }
    names
}

fn split_words(template: &str) -> Result<Vec<String>, CommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in template.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err(CommandError::UnbalancedQuote(template.to_string()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
