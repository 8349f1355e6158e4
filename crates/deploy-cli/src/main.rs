use std::path::PathBuf;

use clap::Parser;
use deploy_core::{Action, Environment};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "ecs-deploy",
    about = "ECS service management tool",
    version,
)]
struct Cli {
    /// What to do: stop, start, upgrade, switch-to-holding or switch-to-app.
    action: Action,

    /// Target environment: test, demo, testnet or prod.
    #[arg(long)]
    env: Environment,

    /// Comma-separated subset of services (default: all in the env config).
    #[arg(long)]
    services: Option<String>,

    /// Image tag to deploy on upgrade.
    #[arg(long, default_value = "latest")]
    tag: String,

    /// Directory containing `envs/<env>.yml`.
    #[arg(long, env = "ECS_DEPLOY_CONFIG_DIR", default_value = ".")]
    config_dir: PathBuf,

    /// Directory containing the holding-page rule JSON files.
    #[arg(long, env = "ECS_DEPLOY_HOLDING_DIR", default_value = "holding_page")]
    holding_dir: PathBuf,

    /// Override the environment's default region.
    #[arg(long)]
    region: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    commands::run(commands::Invocation {
        action: cli.action,
        env: cli.env,
        services: cli.services,
        tag: cli.tag,
        config_dir: cli.config_dir,
        holding_dir: cli.holding_dir,
        region: cli.region,
    })
    .await
}
