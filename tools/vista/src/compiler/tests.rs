use pretty_assertions::assert_eq;
use tempfile::tempdir;

use super::*;

#[test]
fn located_diagnostic_with_column() {
    let diag = parse_diagnostic("src/ui/Card.kt:12:5: error: unresolved reference: Siez").unwrap();
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.message, "unresolved reference: Siez");
    assert_eq!(
        diag.location,
        Some(Location {
            file: PathBuf::from("src/ui/Card.kt"),
            line: 12,
            column: Some(5),
        })
    );
}

#[test]
fn located_diagnostic_without_column() {
    let diag = parse_diagnostic("Card.kt:3: warning: unused variable").unwrap();
    assert_eq!(diag.severity, Severity::Warning);
    let location = diag.location.unwrap();
    assert_eq!((location.line, location.column), (3, None));
}

#[test]
fn bare_severity() {
    let diag = parse_diagnostic("error: no sources").unwrap();
    assert_eq!(diag.location, None);
    assert_eq!(diag.to_string(), "error: no sources");
}

#[test]
fn unrelated_lines_are_skipped() {
    assert!(parse_diagnostic("Compiling 3 files").is_none());
    assert!(parse_diagnostic("note to self: nothing").is_none());
    assert!(parse_diagnostic("").is_none());
}

#[cfg(unix)]
#[test]
fn compile_clears_output_and_collects_diagnostics() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("Stale.unit"), "old").unwrap();

    let compiler = CommandCompiler::new(
        CommandTemplate::parse("sh -c 'echo \"A.kt:1:2: error: boom\" >&2; exit 1'").unwrap(),
    );
    let outcome = compiler.compile(&[PathBuf::from("A.kt")], &[], &out);

    assert!(!outcome.success);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].message, "boom");
    assert!(out.is_dir());
    assert!(!out.join("Stale.unit").exists());
}

#[cfg(unix)]
#[test]
fn failing_exit_without_diagnostics_still_fails() {
    let dir = tempdir().unwrap();
    let compiler = CommandCompiler::new(CommandTemplate::parse("sh -c 'exit 2'").unwrap());
    let outcome = compiler.compile(&[], &[], dir.path());
    assert!(!outcome.success);
    assert_eq!(outcome.diagnostics.len(), 1);
}

#[cfg(unix)]
#[test]
fn successful_compile_with_warnings() {
    let dir = tempdir().unwrap();
    let compiler = CommandCompiler::new(
        CommandTemplate::parse("sh -c 'echo \"warning: deprecated\" >&2'").unwrap(),
    );
    let outcome = compiler.compile(&[], &[], dir.path());
    assert!(outcome.success);
    assert_eq!(outcome.diagnostics[0].severity, Severity::Warning);
}
