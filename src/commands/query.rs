use super::{Context, NOT_CONFIGURED};
use crate::domain::constants::{DOCS_MESSAGE, DOCS_URL};
use crate::services::orchestrator::Orchestrator;
use crate::services::output::{self, CODE_NOT_CONFIGURED};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct DocsLink {
    message: &'static str,
    url: &'static str,
}

pub fn status(ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let Some(identity) = ctx.store.load()? else {
        return output::error(out, ctx.json, CODE_NOT_CONFIGURED, NOT_CONFIGURED);
    };
    match Orchestrator::new(ctx.engine, ctx.registry).status(&identity) {
        Ok(report) => output::print_one(out, ctx.json, report, output::status_lines),
        Err(err) => output::engine_error(out, ctx.json, &err),
    }
}

pub fn inspect(ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let Some(identity) = ctx.store.load()? else {
        return output::error(out, ctx.json, CODE_NOT_CONFIGURED, NOT_CONFIGURED);
    };
    match Orchestrator::new(ctx.engine, ctx.registry).inspect(&identity) {
        Ok(report) => output::print_one(out, ctx.json, report, output::inspect_lines),
        Err(err) => output::engine_error(out, ctx.json, &err),
    }
}

pub fn docs(ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let link = DocsLink {
        message: DOCS_MESSAGE,
        url: DOCS_URL,
    };
    output::print_one(out, ctx.json, link, |l| {
        vec![format!("{} {}", l.message, l.url)]
    })
}
