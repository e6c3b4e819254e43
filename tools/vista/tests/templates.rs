//! Command templates as seen by collaborator implementations.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use vista::{CommandError, CommandTemplate, Vars};

#[test]
fn sources_word_expands_to_one_argument_per_file() {
    let template = CommandTemplate::parse("kotlinc -d {out} {sources}").unwrap();
    let vars = Vars::new()
        .out(Path::new("/tmp/out"))
        .sources(&[PathBuf::from("A.kt"), PathBuf::from("B.kt")]);
    assert_eq!(
        template.expand(&vars).unwrap(),
        vec!["kotlinc", "-d", "/tmp/out", "A.kt", "B.kt"]
    );
}

#[test]
fn embedded_sources_are_space_joined() {
    let template = CommandTemplate::parse("tool --files={sources}").unwrap();
    let vars = Vars::new().sources(&[PathBuf::from("A.kt"), PathBuf::from("B.kt")]);
    assert_eq!(template.expand(&vars).unwrap(), vec!["tool", "--files=A.kt B.kt"]);
}

#[cfg(unix)]
#[test]
fn classpath_uses_the_path_separator() {
    let template = CommandTemplate::parse("java -cp {classpath}").unwrap();
    let vars = Vars::new().classpath(&[PathBuf::from("/a"), PathBuf::from("/b.jar")]);
    assert_eq!(template.expand(&vars).unwrap(), vec!["java", "-cp", "/a:/b.jar"]);
}

#[test]
fn unknown_placeholders_are_rejected_at_parse_time() {
    let err = CommandTemplate::parse("build {targte}").unwrap_err();
    assert!(matches!(err, CommandError::UnknownPlaceholder { ref name } if name == "targte"));
    assert_eq!(err.to_string(), "unknown placeholder `{targte}` in command template");
}

#[test]
fn empty_template_is_rejected() {
    assert!(matches!(CommandTemplate::parse(""), Err(CommandError::Empty)));
}

#[test]
fn missing_value_is_reported_on_expand() {
    let template = CommandTemplate::parse("bazel query {target}").unwrap();
    let err = template.expand(&Vars::new()).unwrap_err();
    assert_eq!(err.to_string(), "placeholder `{target}` has no value here");
}

#[cfg(unix)]
#[test]
fn run_captures_stdout() {
    let template = CommandTemplate::parse("echo {file}").unwrap();
    let out = template.run(&Vars::new().file(Path::new("Card.kt"))).unwrap();
    assert_eq!(out, "Card.kt\n");
}

#[cfg(unix)]
#[test]
fn non_zero_exit_is_a_failure() {
    let template = CommandTemplate::parse("sh -c 'echo broken >&2; exit 3'").unwrap();
    let err = template.run(&Vars::new()).unwrap_err();
    match err {
        CommandError::Failed { program, stderr, .. } => {
            assert_eq!(program, "sh");
            assert_eq!(stderr, "broken");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_program_is_a_spawn_error() {
    let template = CommandTemplate::parse("vista-no-such-program-xyz").unwrap();
    assert!(matches!(
        template.run(&Vars::new()),
        Err(CommandError::Spawn { .. })
    ));
}
