use crate::domain::constants::{FAIL_GLYPH, OK_GLYPH};
use crate::domain::models::{
    ErrorBody, InspectReport, JsonErr, JsonOut, LifecycleReport, StatusReport, Step, StepStatus,
};
use crate::services::engine::EngineError;
use serde::Serialize;
use std::io::Write;

pub const CODE_VALIDATION: &str = "VALIDATION";
pub const CODE_NOT_CONFIGURED: &str = "NOT_CONFIGURED";
pub const CODE_CONFIRM_REQUIRED: &str = "CONFIRM_REQUIRED";
pub const CODE_ENGINE_UNREACHABLE: &str = "ENGINE_UNREACHABLE";
pub const CODE_ENGINE: &str = "ENGINE";

pub fn print_one<T: Serialize>(
    out: &mut dyn Write,
    json: bool,
    data: T,
    render: impl Fn(&T) -> Vec<String>,
) -> anyhow::Result<()> {
    if json {
        writeln!(
            out,
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        )?;
    } else {
        for line in render(&data) {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

pub fn error(out: &mut dyn Write, json: bool, code: &str, message: &str) -> anyhow::Result<()> {
    if json {
        let body = JsonErr {
            ok: false,
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
    } else {
        writeln!(out, "! error: {}", message)?;
    }
    Ok(())
}

pub fn engine_error(out: &mut dyn Write, json: bool, err: &EngineError) -> anyhow::Result<()> {
    match err {
        EngineError::Unreachable(detail) => error(
            out,
            json,
            CODE_ENGINE_UNREACHABLE,
            &format!(
                "could not access the docker daemon ({}), check that it is running and reachable",
                detail
            ),
        ),
        other => error(out, json, CODE_ENGINE, &other.to_string()),
    }
}

pub fn step_line(step: &Step) -> String {
    let subject = format!("{} {}", step.action, step.resource);
    match (&step.status, &step.detail) {
        (StepStatus::Failed, Some(reason)) => format!("  {} {}: {}", FAIL_GLYPH, subject, reason),
        (StepStatus::Failed, None) => format!("  {} {}", FAIL_GLYPH, subject),
        (_, Some(note)) => format!("  {} {} ({})", OK_GLYPH, subject, note),
        (_, None) => format!("  {} {}", OK_GLYPH, subject),
    }
}

pub fn report_lines(report: &LifecycleReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .warnings
        .iter()
        .map(|w| format!("! warning: {}", w))
        .collect();
    lines.push(format!("{} fullnode {}:", report.action.verb(), report.node));
    lines.extend(report.steps.iter().map(step_line));
    if let Some(state) = report.state {
        lines.push(format!("fullnode {} is {}", report.node, state.as_str()));
    }
    lines
}

pub fn status_lines(report: &StatusReport) -> Vec<String> {
    let mut lines = vec![format!("fullnode {} status:", report.node)];
    for r in &report.resources {
        lines.push(format!("  {:<10} {:<28} {}", r.kind, r.name, r.state));
    }
    lines.push(format!("  network: {}", report.net));
    lines.push(format!("  state: {}", report.state.as_str()));
    lines
}

pub fn inspect_lines(report: &InspectReport) -> Vec<String> {
    let mut lines = vec![format!("fullnode {} details:", report.node)];
    for c in &report.containers {
        match &c.metadata {
            Some(metadata) => {
                lines.push(format!("  {} {}:", c.role, c.name));
                let pretty =
                    serde_json::to_string_pretty(metadata).unwrap_or_else(|_| metadata.to_string());
                lines.extend(pretty.lines().map(|l| format!("    {}", l)));
            }
            None => lines.push(format!("  {} {}: absent", c.role, c.name)),
        }
    }
    lines
}
