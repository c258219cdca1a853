use clap::{CommandFactory, Parser};
use tmnd::cli::Cli;
use tmnd::commands::{self, Context};
use tmnd::services::docker::DockerEngine;
use tmnd::services::engine::{Engine, EngineError, Unavailable};
use tmnd::services::environments::EnvironmentRegistry;
use tmnd::services::settings::{settings_path, Settings};
use tmnd::services::storage::ResourceStore;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("TMND_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let settings = Settings::load(&settings_path()?)?;
    let registry = EnvironmentRegistry::builtin().with_overrides(&settings.networks)?;
    let store = ResourceStore::default_location()?;

    let endpoint = cli.docker.as_deref().or(settings.engine.endpoint.as_deref());
    let docker = DockerEngine::connect(
        endpoint,
        settings.engine.timeout(),
        settings.engine.pull_timeout(),
    );
    let unavailable;
    let engine: &dyn Engine = match &docker {
        Ok(docker) => docker,
        Err(e) => {
            tracing::debug!(error = %e, "docker client unavailable");
            let reason = match e {
                EngineError::Unreachable(detail) => detail.clone(),
                other => other.to_string(),
            };
            unavailable = Unavailable::new(reason);
            &unavailable
        }
    };

    let ctx = Context {
        engine,
        store: &store,
        registry: &registry,
        json: cli.json,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(command, &ctx, &mut out)
}
