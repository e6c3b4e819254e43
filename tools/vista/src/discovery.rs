//! Discovery through an external command.

use std::path::Path;

use serde::Deserialize;
use vista_ir::{FunctionDescriptor, ValidationError};
use vista_reload::Discovery;

use crate::command::{CommandTemplate, Vars};

/// Runs a discovery command on the previewed file.
///
/// The command prints one JSON object: `{"functions": [...]}` on success or
/// `{"errors": [...]}` when the file's preview declarations are invalid.
#[derive(Clone, Debug)]
pub struct CommandDiscovery {
    template: CommandTemplate,
    root: std::path::PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct DiscoveryOutput {
    #[serde(default)]
    functions: Vec<FunctionDescriptor>,
    #[serde(default)]
    errors: Vec<ValidationError>,
}

impl CommandDiscovery {
    pub fn new(template: CommandTemplate, root: &Path) -> Self {
        CommandDiscovery {
            template,
            root: root.to_path_buf(),
        }
    }
}

impl Discovery for CommandDiscovery {
    fn discover(
        &self,
        _source: &str,
        file: &Path,
    ) -> Result<Vec<FunctionDescriptor>, Vec<ValidationError>> {
        let vars = Vars::new().file(file).root(&self.root);
        let stdout = self
            .template
            .run(&vars)
            .map_err(|e| vec![tool_failure(file, e.to_string())])?;
        parse_output(&stdout).map_err(|e| vec![tool_failure(file, e)])?
    }
}

/// Decode discovery output. The outer error is a malformed document.
pub(crate) fn parse_output(
    stdout: &str,
) -> Result<Result<Vec<FunctionDescriptor>, Vec<ValidationError>>, String> {
    let output: DiscoveryOutput = serde_json::from_str(stdout.trim())
        .map_err(|e| format!("invalid discovery output: {e}"))?;
    if output.errors.is_empty() {
        Ok(Ok(output.functions))
    } else {
        Ok(Err(output.errors))
    }
}

/// A discovery failure presented as a validation error against the file.
fn tool_failure(file: &Path, message: String) -> ValidationError {
    ValidationError {
        function: file
            .file_name()
            .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned()),
        parameter: String::new(),
        message,
        line: None,
        suggestion: "check the discovery command".to_string(),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use pretty_assertions::assert_eq;
    use vista_ir::ContainerKind;

    use super::*;

    #[test]
    fn functions_document() {
        let json = r#"{"functions": [
            {"name": "card", "module_path": "app.ui", "containers": ["Previews"],
             "kind": "singleton",
             "params": [{"name": "user", "type_name": "User", "provider": "app.Users", "limit": 3}]},
            {"name": "plain", "module_path": "app.ui"}
        ]}"#;
        let functions = parse_output(json).unwrap().unwrap();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].kind, ContainerKind::Singleton);
        assert_eq!(functions[0].qualified_name(), "app.ui.Previews.card");
        assert_eq!(functions[0].params[0].limit, Some(3));
        assert!(functions[1].params.is_empty());
    }

    #[test]
    fn errors_document() {
        let json = r#"{"errors": [{"function": "card", "parameter": "user",
            "message": "provider is not a class", "line": 4,
            "suggestion": "declare Users as a class"}]}"#;
        let errors = parse_output(json).unwrap().unwrap_err();
        assert_eq!(errors[0].line, Some(4));
    }

    #[test]
    fn malformed_document() {
        assert!(parse_output("not json").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn command_failure_becomes_validation_error() {
        let discovery = CommandDiscovery::new(
            CommandTemplate::parse("sh -c 'exit 1'").unwrap(),
            Path::new("."),
        );
        let errors = discovery.discover("", Path::new("src/Card.kt")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].function, "Card.kt");
    }
}
