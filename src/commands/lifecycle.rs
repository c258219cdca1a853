use super::{Context, NOT_CONFIGURED};
use crate::domain::models::{Action, LifecycleReport, NodeIdentity};
use crate::services::engine::EngineResult;
use crate::services::orchestrator::Orchestrator;
use crate::services::output::{
    self, CODE_CONFIRM_REQUIRED, CODE_NOT_CONFIGURED, CODE_VALIDATION,
};
use crate::services::storage::Field;
use crate::services::validation::{resolve_start, validate_name, StartArgs, StartIntent};
use std::io::Write;
use tracing::info;

pub fn start(ctx: &Context, args: &StartArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let remembered = ctx.store.load()?;
    let intent = match resolve_start(remembered, args, ctx.registry) {
        Ok(intent) => intent,
        Err(e) => {
            if let (false, Some(name)) = (ctx.json, args.name.as_deref()) {
                writeln!(out, "{} fullnode {}:", Action::Start.verb(), name)?;
            }
            return output::error(out, ctx.json, CODE_VALIDATION, &e.to_string());
        }
    };
    let orchestrator = Orchestrator::new(ctx.engine, ctx.registry);

    match intent {
        StartIntent::Configure { identity, pkey } => {
            let mut report = LifecycleReport::new(Action::Start, &identity.name);
            let result = orchestrator.start_new(&identity, &pkey, &mut report);
            if result.is_ok() {
                ctx.store.save(&identity)?;
                info!(node = %identity.name, net = %identity.net, "fullnode configured");
            }
            finish(ctx, out, &report, result)
        }
        StartIntent::Reuse {
            identity,
            warning,
            repair_pkey,
        } => {
            let mut report = LifecycleReport::new(Action::Start, &identity.name);
            if let Some(w) = warning {
                report.warnings.push(w.to_string());
            }
            let result = orchestrator.start_existing(&identity, repair_pkey.as_deref(), &mut report);
            finish(ctx, out, &report, result)
        }
    }
}

pub fn stop(ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let Some(identity) = remembered(ctx, out)? else {
        return Ok(());
    };
    let mut report = LifecycleReport::new(Action::Stop, &identity.name);
    let result = Orchestrator::new(ctx.engine, ctx.registry).stop(&identity, &mut report);
    finish(ctx, out, &report, result)
}

pub fn update(ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    let Some(identity) = remembered(ctx, out)? else {
        return Ok(());
    };
    let mut report = LifecycleReport::new(Action::Update, &identity.name);
    let result = Orchestrator::new(ctx.engine, ctx.registry).update(&identity, &mut report);
    finish(ctx, out, &report, result)
}

pub fn remove(
    ctx: &Context,
    confirm: bool,
    name: Option<&str>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let identity = match (ctx.store.load()?, name) {
        (Some(identity), Some(requested)) if requested != identity.name => {
            return output::error(
                out,
                ctx.json,
                CODE_VALIDATION,
                &format!(
                    "--name {} does not match the configured fullnode {}",
                    requested, identity.name
                ),
            );
        }
        (Some(identity), _) => identity,
        (None, Some(requested)) => {
            if let Err(e) = validate_name(requested) {
                return output::error(out, ctx.json, CODE_VALIDATION, &e.to_string());
            }
            // Removal only needs the resource prefix, not the network.
            NodeIdentity::new(requested, "")
        }
        (None, None) => return output::error(out, ctx.json, CODE_NOT_CONFIGURED, NOT_CONFIGURED),
    };

    if !confirm {
        return output::error(
            out,
            ctx.json,
            CODE_CONFIRM_REQUIRED,
            &format!("--confirm is required to remove fullnode {}", identity.name),
        );
    }

    let mut report = LifecycleReport::new(Action::Remove, &identity.name);
    let result = Orchestrator::new(ctx.engine, ctx.registry).remove(&identity, &mut report);
    if result.is_ok() && !report.has_failures() {
        ctx.store.clear(&Field::ALL)?;
        info!(node = %identity.name, "fullnode removed");
    }
    finish(ctx, out, &report, result)
}

fn remembered(ctx: &Context, out: &mut dyn Write) -> anyhow::Result<Option<NodeIdentity>> {
    let identity = ctx.store.load()?;
    if identity.is_none() {
        output::error(out, ctx.json, CODE_NOT_CONFIGURED, NOT_CONFIGURED)?;
    }
    Ok(identity)
}

/// Render the steps collected so far; an aborted transition adds the engine error.
fn finish(
    ctx: &Context,
    out: &mut dyn Write,
    report: &LifecycleReport,
    result: EngineResult<()>,
) -> anyhow::Result<()> {
    match result {
        Ok(()) => output::print_one(out, ctx.json, report, |r| output::report_lines(r)),
        Err(err) => {
            if !ctx.json {
                for line in output::report_lines(report) {
                    writeln!(out, "{}", line)?;
                }
            }
            output::engine_error(out, ctx.json, &err)
        }
    }
}
