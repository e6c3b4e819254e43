//! Printing render events.

use std::io::{self, Write};
use std::str::FromStr;

use serde_json::{json, Value as Json};
use vista_invoke::{EngineWarning, InvocationResult};
use vista_reload::{FunctionReport, RenderEvent, RenderReport};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary per render.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format `{other}` (expected text or json)")),
        }
    }
}

/// Write one event in `format`.
pub fn write_event(out: &mut dyn Write, event: &RenderEvent, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Text => write_text(out, event),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &event_json(event)).map_err(io::Error::other)?;
            writeln!(out)
        }
    }
}

fn write_text(out: &mut dyn Write, event: &RenderEvent) -> io::Result<()> {
    let report = match event {
        RenderEvent::Rendered(report) => report,
        RenderEvent::Failed {
            path,
            stage,
            message,
        } => {
            return writeln!(out, "[{path}] {stage} failed: {message}");
        }
    };

    writeln!(
        out,
        "[{}] {} ({} functions, {} ok, {} failed, {}ms)",
        report.path,
        report.file.display(),
        report.functions.len(),
        report.successes(),
        report.failures(),
        report.duration.as_millis()
    )?;
    for error in &report.validation_errors {
        writeln!(out, "  invalid  {error}")?;
    }
    for function in &report.functions {
        for warning in &function.warnings {
            writeln!(out, "  warning  {}", warning_text(warning))?;
        }
        for result in &function.results {
            write_result(out, result)?;
        }
    }
    Ok(())
}

fn write_result(out: &mut dyn Write, result: &InvocationResult) -> io::Result<()> {
    let name = result.display_name();
    let timing = result
        .elapsed
        .map(|elapsed| format!(" ({}ms)", elapsed.as_millis()))
        .unwrap_or_default();
    match (result.payload(), result.error()) {
        (Some(payload), _) => writeln!(out, "  ok       {name}{timing}: {payload}"),
        (None, Some(error)) => writeln!(
            out,
            "  FAIL     {name}{timing}: {}: {}",
            error.category(),
            error.message()
        ),
        (None, None) => Ok(()),
    }
}

fn warning_text(warning: &EngineWarning) -> String {
    match warning {
        EngineWarning::CombinationCount {
            function,
            total,
            breakdown,
        } => format!("{function}: {total} combinations ({breakdown})"),
        EngineWarning::DisplayName {
            provider,
            index,
            cause,
        } => format!("{provider}: display name for index {index} failed: {cause}"),
        EngineWarning::SlowInvocation {
            display_name,
            elapsed,
        } => format!("{display_name}: slow invocation ({}ms)", elapsed.as_millis()),
    }
}

/// JSON view of an event.
pub fn event_json(event: &RenderEvent) -> Json {
    match event {
        RenderEvent::Rendered(report) => report_json(report),
        RenderEvent::Failed {
            path,
            stage,
            message,
        } => json!({
            "event": "failed",
            "path": path.as_str(),
            "stage": stage.to_string(),
            "message": message,
        }),
    }
}

fn report_json(report: &RenderReport) -> Json {
    json!({
        "event": "rendered",
        "path": report.path.as_str(),
        "file": report.file.display().to_string(),
        "duration_ms": u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
        "successes": report.successes(),
        "failures": report.failures(),
        "validation_errors": report.validation_errors,
        "functions": report.functions.iter().map(function_json).collect::<Vec<_>>(),
    })
}

fn function_json(function: &FunctionReport) -> Json {
    json!({
        "name": function.descriptor.name,
        "qualified_name": function.descriptor.qualified_name(),
        "results": function.results.iter().map(result_json).collect::<Vec<_>>(),
        "warnings": function.warnings.iter().map(warning_text).collect::<Vec<_>>(),
    })
}

fn result_json(result: &InvocationResult) -> Json {
    let mut entry = json!({ "display_name": result.display_name() });
    if let Some(elapsed) = result.elapsed {
        entry["elapsed_ms"] = json!(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    }
    match (result.payload(), result.error()) {
        (Some(payload), _) => entry["ok"] = json!(payload),
        (None, Some(error)) => {
            entry["error"] = json!({
                "category": error.category().as_str(),
                "message": error.message(),
            });
        }
        (None, None) => {}
    }
    entry
}
