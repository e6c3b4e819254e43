//! Build-system queries through external commands.

use std::path::{Path, PathBuf};

use vista_reload::{BuildError, BuildSystem, TargetId};

use crate::command::{CommandTemplate, Vars};

/// Resolves the owning target and its classpath with two commands.
///
/// The target command prints exactly one target id. The classpath command
/// prints one artifact path per line; relative paths are taken from the
/// project root.
#[derive(Clone, Debug)]
pub struct CommandBuildSystem {
    target: CommandTemplate,
    classpath: CommandTemplate,
}

impl CommandBuildSystem {
    pub fn new(target: CommandTemplate, classpath: CommandTemplate) -> Self {
        CommandBuildSystem { target, classpath }
    }
}

impl BuildSystem for CommandBuildSystem {
    fn find_target(&self, root: &Path, file: &Path) -> Result<TargetId, BuildError> {
        let vars = Vars::new().root(root).file(file);
        let stdout = self.target.run(&vars).map_err(|e| BuildError::Failed {
            target: file.display().to_string(),
            message: e.to_string(),
        })?;
        single_target(file, &stdout)
    }

    fn resolve_classpath(&self, root: &Path, target: &TargetId) -> Result<Vec<PathBuf>, BuildError> {
        let vars = Vars::new().root(root).target(&target.0);
        let stdout = self.classpath.run(&vars).map_err(|e| BuildError::Failed {
            target: target.to_string(),
            message: e.to_string(),
        })?;
        Ok(classpath_lines(root, &stdout))
    }
}

fn non_empty_lines(stdout: &str) -> impl Iterator<Item = &str> {
    stdout.lines().map(str::trim).filter(|line| !line.is_empty())
}

pub(crate) fn single_target(file: &Path, stdout: &str) -> Result<TargetId, BuildError> {
    let candidates: Vec<&str> = non_empty_lines(stdout).collect();
    match candidates.as_slice() {
        [] => Err(BuildError::NoTarget {
            file: file.to_path_buf(),
        }),
        [only] => Ok(TargetId((*only).to_string())),
        _ => Err(BuildError::AmbiguousTarget {
            file: file.to_path_buf(),
            candidates: candidates.iter().map(ToString::to_string).collect(),
        }),
    }
}

pub(crate) fn classpath_lines(root: &Path, stdout: &str) -> Vec<PathBuf> {
    non_empty_lines(stdout)
        .map(|line| {
            let path = PathBuf::from(line);
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        })
        .collect()
}
