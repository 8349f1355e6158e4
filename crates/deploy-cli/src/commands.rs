//! Action dispatch for `ecs-deploy`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use deploy_control::{DeploymentContext, DeploymentManager, EcsCluster, ElbLoadBalancer};
use deploy_core::{select_services, Action, EnvConfig, Environment, ServiceName};

/// Parsed command line.
#[derive(Debug)]
pub struct Invocation {
    pub action: Action,
    pub env: Environment,
    pub services: Option<String>,
    pub tag: String,
    pub config_dir: PathBuf,
    pub holding_dir: PathBuf,
    pub region: Option<String>,
}

/// Build the AWS-backed manager for `inv` and run its action.
pub async fn run(inv: Invocation) -> anyhow::Result<()> {
    let mut ctx = DeploymentContext::for_env(inv.env).with_holding_dir(&inv.holding_dir);
    if let Some(region) = &inv.region {
        ctx = ctx.with_region(region);
    }

    let sdk_config = deploy_control::load_sdk_config(&ctx.region).await;
    info!(env = %inv.env, region = %ctx.region, cluster = %ctx.cluster, action = %inv.action, "deploying");

    let manager = DeploymentManager::new(
        Arc::new(EcsCluster::new(&sdk_config)),
        Arc::new(ElbLoadBalancer::new(&sdk_config)),
        ctx,
    );
    dispatch(&manager, &inv).await
}

/// Run the invocation's action on `manager`.
///
/// Holding-page switches act on the environment as a whole and never read
/// the env config. Service actions with an empty selection do nothing.
pub async fn dispatch(manager: &DeploymentManager, inv: &Invocation) -> anyhow::Result<()> {
    match inv.action {
        Action::SwitchToHolding => manager.switch_to_holding().await?,
        Action::SwitchToApp => manager.switch_to_app().await?,
        Action::Start | Action::Stop | Action::Upgrade => {
            let config_path = EnvConfig::path_for(&inv.config_dir, inv.env);
            let config = EnvConfig::from_file(&config_path)
                .with_context(|| format!("loading {}", config_path.display()))?;

            let services: Vec<ServiceName> =
                select_services(&config, inv.env, inv.services.as_deref())
                    .into_iter()
                    .collect();
            if services.is_empty() {
                warn!(env = %inv.env, filter = ?inv.services, "no services selected, nothing to do");
                return Ok(());
            }

            match inv.action {
                Action::Start => manager.start_services(&services, &config).await?,
                Action::Stop => manager.stop_services(&services, &config).await?,
                _ => {
                    info!("UPGRADE");
                    manager.update_services(&services, &config, &inv.tag).await?
                }
            }
        }
    }

    Ok(())
}
