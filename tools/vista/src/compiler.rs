//! Compilation through an external command.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use vista_ir::{Diagnostic, Location, Severity};
use vista_reload::{CompileOutcome, Compiler};

use crate::command::{CommandTemplate, Vars};

/// Runs a compile command and reads diagnostics from its stderr.
#[derive(Clone, Debug)]
pub struct CommandCompiler {
    template: CommandTemplate,
}

impl CommandCompiler {
    pub fn new(template: CommandTemplate) -> Self {
        CommandCompiler { template }
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, sources: &[PathBuf], classpath: &[PathBuf], output_dir: &Path) -> CompileOutcome {
        if let Err(e) = clear_dir(output_dir) {
            return CompileOutcome::failed(vec![Diagnostic::error(format!(
                "cannot clear {}: {e}",
                output_dir.display()
            ))]);
        }
        let vars = Vars::new()
            .sources(sources)
            .classpath(classpath)
            .out(output_dir);
        let output = match self.template.output(&vars) {
            Ok(output) => output,
            Err(e) => return CompileOutcome::failed(vec![Diagnostic::error(e.to_string())]),
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut diagnostics: Vec<Diagnostic> = stderr.lines().filter_map(parse_diagnostic).collect();
        let success = output.status.success() && !diagnostics.iter().any(Diagnostic::is_error);
        if !output.status.success() && !diagnostics.iter().any(Diagnostic::is_error) {
            diagnostics.push(Diagnostic::error(format!(
                "`{}` exited with {}",
                self.template.program(),
                output.status
            )));
        }
        CompileOutcome {
            success,
            diagnostics,
        }
    }
}

fn clear_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(dir)
}

/// Parse one stderr line of the form `[path:line[:col]: ]severity: message`.
pub fn parse_diagnostic(line: &str) -> Option<Diagnostic> {
    let line = line.trim();
    let (head, rest) = line.split_once(": ")?;
    if let Some(severity) = Severity::parse(head) {
        return Some(Diagnostic {
            severity,
            message: rest.to_string(),
            location: None,
        });
    }
    let location = parse_location(head)?;
    let (word, message) = rest.split_once(": ")?;
    let severity = Severity::parse(word)?;
    Some(Diagnostic {
        severity,
        message: message.to_string(),
        location: Some(location),
    })
}

fn parse_location(head: &str) -> Option<Location> {
    let (rest, last) = head.rsplit_once(':')?;
    let last: u32 = last.parse().ok()?;
    let with_column = rest
        .rsplit_once(':')
        .and_then(|(file, line)| line.parse::<u32>().ok().map(|line| (file, line)));
    let (file, line, column) = match with_column {
        Some((file, line)) => (file, line, Some(last)),
        None => (rest, last, None),
    };
    if file.is_empty() {
        return None;
    }
    Some(Location {
        file: PathBuf::from(file),
        line,
        column,
    })
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
