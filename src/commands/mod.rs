//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `lifecycle.rs` — start/stop/update/remove.
//! - `query.rs` — status/inspect/docs.
//!
//! ## Principles
//! - Resolve the target identity here (fresh input or the remembered one).
//! - Delegate validation and engine work to `services/*`.
//! - Keep behavior and output schema stable.

pub mod lifecycle;
pub mod query;

use crate::cli::Commands;
use crate::services::engine::Engine;
use crate::services::environments::EnvironmentRegistry;
use crate::services::storage::ResourceStore;
use crate::services::validation::StartArgs;
use std::io::Write;

pub const NOT_CONFIGURED: &str =
    "fullnode is not configured, run start with --name, --net and --pkey first";

/// Everything a command needs for one invocation.
pub struct Context<'a> {
    pub engine: &'a dyn Engine,
    pub store: &'a ResourceStore,
    pub registry: &'a EnvironmentRegistry,
    pub json: bool,
}

pub fn run(command: &Commands, ctx: &Context, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Commands::Start { name, net, pkey } => {
            let args = StartArgs {
                name: name.clone(),
                net: net.clone(),
                pkey: pkey.clone(),
            };
            lifecycle::start(ctx, &args, out)
        }
        Commands::Stop => lifecycle::stop(ctx, out),
        Commands::Update => lifecycle::update(ctx, out),
        Commands::Remove { confirm, name } => lifecycle::remove(ctx, *confirm, name.as_deref(), out),
        Commands::Status => query::status(ctx, out),
        Commands::Inspect => query::inspect(ctx, out),
        Commands::Docs => query::docs(ctx, out),
    }
}
