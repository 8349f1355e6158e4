//! Deployment manager — drives services and the holding page through
//! stop, start and upgrade.
//!
//! Every operation is a linear sequence of provider calls. Stopping an
//! essential service puts the holding page up first; starting one takes
//! it down last, once the services are stable again.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use deploy_core::holding::{
    HOLDING_LISTENER_PORT, HOLDING_RULE_PRIORITY, HOLDING_TAG_KEY, HOLDING_TAG_VALUE,
};
use deploy_core::{
    display_names, DeployError, DeployResult, EnvConfig, Environment, HoldingPage,
    RevisionPatch, ServiceName,
};

use crate::api::{ClusterApi, ListenerRef, LoadBalancerApi, TaskDefinitionRef};
use crate::waiter::{wait_until_stable, WaiterConfig};

/// Where a manager operates.
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    pub env: Environment,
    pub region: String,
    pub cluster: String,
    /// Directory holding `api-conditions.json` and `api-actions.json`.
    pub holding_dir: PathBuf,
    pub waiter: WaiterConfig,
}

impl DeploymentContext {
    /// Context for `env` with its default region and cluster name.
    pub fn for_env(env: Environment) -> Self {
        Self {
            env,
            region: env.default_region().to_string(),
            cluster: env.cluster_name(),
            holding_dir: PathBuf::from("holding_page"),
            waiter: WaiterConfig::default(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_holding_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.holding_dir = dir.into();
        self
    }

    pub fn with_waiter(mut self, waiter: WaiterConfig) -> Self {
        self.waiter = waiter;
        self
    }
}

/// Runs deployment actions against a cluster and its load balancer.
pub struct DeploymentManager {
    cluster: Arc<dyn ClusterApi>,
    load_balancer: Arc<dyn LoadBalancerApi>,
    ctx: DeploymentContext,
}

impl DeploymentManager {
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        load_balancer: Arc<dyn LoadBalancerApi>,
        ctx: DeploymentContext,
    ) -> Self {
        Self {
            cluster,
            load_balancer,
            ctx,
        }
    }

    pub fn context(&self) -> &DeploymentContext {
        &self.ctx
    }

    // ── Cluster primitives ─────────────────────────────────────────

    /// Wait for every service to settle.
    pub async fn wait_for_stable_state(&self, services: &[ServiceName]) -> DeployResult<()> {
        info!(
            "Waiting for {} to reach a stable state in region {}...",
            display_names(services),
            self.ctx.region
        );
        let names: Vec<String> = services.iter().map(|s| s.to_string()).collect();
        wait_until_stable(
            self.cluster.as_ref(),
            &self.ctx.cluster,
            &names,
            self.ctx.waiter,
        )
        .await
    }

    /// Desired count the cluster currently holds for a service.
    pub async fn desired_count(&self, service: &ServiceName) -> DeployResult<i32> {
        let described = self
            .cluster
            .describe_services(&self.ctx.cluster, &[service.to_string()])
            .await?;
        described
            .services
            .iter()
            .find(|s| s.name == service.as_str())
            .map(|s| s.desired_count)
            .ok_or_else(|| DeployError::UnknownService(service.to_string()))
    }

    pub async fn update_instances_count(
        &self,
        services: &[ServiceName],
        desired_count: i32,
    ) -> DeployResult<()> {
        info!(
            "Updating {} instances count to {} in region {}",
            display_names(services),
            desired_count,
            self.ctx.region
        );
        for service in services {
            self.cluster
                .set_desired_count(&self.ctx.cluster, service.as_str(), desired_count)
                .await?;
        }
        Ok(())
    }

    // ── Actions ────────────────────────────────────────────────────

    /// Scale services to zero, putting the holding page up first when an
    /// essential service is among them.
    pub async fn stop_services(
        &self,
        services: &[ServiceName],
        config: &EnvConfig,
    ) -> DeployResult<()> {
        if config.contains_essential(self.ctx.env, services)? {
            self.switch_to_holding().await?;
        }
        self.update_instances_count(services, 0).await?;
        self.wait_for_stable_state(services).await
    }

    /// Scale services back to their configured counts, removing the
    /// holding page once they are stable.
    pub async fn start_services(
        &self,
        services: &[ServiceName],
        config: &EnvConfig,
    ) -> DeployResult<()> {
        self.wait_for_stable_state(services).await?;
        for service in services {
            let count = config.service_for(self.ctx.env, service)?.count;
            self.update_instances_count(std::slice::from_ref(service), count)
                .await?;
        }
        self.wait_for_stable_state(services).await?;
        if config.contains_essential(self.ctx.env, services)? {
            self.switch_to_app().await?;
        }
        Ok(())
    }

    /// Latest task-definition revision for each service, in `services`
    /// order. Services the cluster does not report are skipped.
    pub async fn latest_task_definitions(
        &self,
        services: &[ServiceName],
    ) -> DeployResult<Vec<(ServiceName, TaskDefinitionRef)>> {
        let names: Vec<String> = services.iter().map(|s| s.to_string()).collect();
        let described = self
            .cluster
            .describe_services(&self.ctx.cluster, &names)
            .await?;

        let mut latest = Vec::with_capacity(services.len());
        for service in services {
            let Some(state) = described.services.iter().find(|s| s.name == service.as_str())
            else {
                warn!(%service, cluster = %self.ctx.cluster, "service not reported by cluster, skipping");
                continue;
            };
            let task_def = self
                .cluster
                .latest_task_definition(&state.task_definition)
                .await?;
            latest.push((service.clone(), task_def));
        }
        Ok(latest)
    }

    /// Roll every service onto a new task-definition revision running
    /// `image_tag`.
    ///
    /// Services flagged `no_rolling_upgrade` that are currently running
    /// are scaled to zero first and restored afterwards.
    pub async fn update_services(
        &self,
        services: &[ServiceName],
        config: &EnvConfig,
        image_tag: &str,
    ) -> DeployResult<()> {
        self.wait_for_stable_state(services).await?;

        info!("Updating {} services", display_names(services));
        let task_defs = self.latest_task_definitions(services).await?;

        for (service, task_def) in &task_defs {
            let config_name = service.config_name(self.ctx.env);
            let service_config = config.service(config_name)?;

            let restart_required =
                service_config.no_rolling_upgrade && self.desired_count(service).await? > 0;

            if restart_required {
                self.update_instances_count(std::slice::from_ref(service), 0)
                    .await?;
                self.wait_for_stable_state(services).await?;
            }

            let patch = RevisionPatch::build(
                self.ctx.env,
                config_name,
                service_config,
                config,
                image_tag,
            );
            let new_arn = self.cluster.register_revision(task_def, &patch).await?;
            info!(
                %service,
                family = %task_def.family,
                from_revision = task_def.revision,
                task_definition = %new_arn,
                image = %patch.image,
                "registered task definition"
            );

            self.cluster
                .set_task_definition(&self.ctx.cluster, service.as_str(), &new_arn)
                .await?;

            if restart_required {
                self.update_instances_count(std::slice::from_ref(service), service_config.count)
                    .await?;
            }
        }

        self.wait_for_stable_state(services).await
    }

    // ── Holding page ───────────────────────────────────────────────

    /// Put the maintenance rule in front of the environment's listener.
    pub async fn switch_to_holding(&self) -> DeployResult<()> {
        info!("Setting up holding page for environment: {}", self.ctx.env);

        let listener = self.resolve_listener().await?;
        let page = HoldingPage::load(&self.ctx.holding_dir)?;

        let rule_arn = self
            .load_balancer
            .create_rule(
                &listener.listener_arn,
                HOLDING_RULE_PRIORITY,
                &page.conditions,
                &page.actions,
            )
            .await?;
        self.load_balancer
            .tag_resource(&rule_arn, HOLDING_TAG_KEY, HOLDING_TAG_VALUE)
            .await?;

        info!("Holding page rule was added successfully.");
        Ok(())
    }

    /// Delete every holding rule from the environment's listener.
    pub async fn switch_to_app(&self) -> DeployResult<()> {
        info!("Removing holding page for environment: {}", self.ctx.env);

        let listener = self.resolve_listener().await?;
        let rules = self.load_balancer.list_rules(&listener.listener_arn).await?;

        for rule_arn in rules {
            let tags = self.load_balancer.rule_tags(&rule_arn).await?;
            if HoldingPage::is_holding_tagged(tags.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            {
                info!("Deleting rule with 'purpose=holding': {}", rule_arn);
                self.load_balancer.delete_rule(&rule_arn).await?;
            }
        }

        info!("Holding page rule was removed successfully.");
        Ok(())
    }

    async fn resolve_listener(&self) -> DeployResult<ListenerRef> {
        let lb_name = self.ctx.env.load_balancer_name();
        let found = self
            .load_balancer
            .find_listener(&lb_name, HOLDING_LISTENER_PORT)
            .await?;
        let listener = found.ok_or(DeployError::ListenerNotFound {
            load_balancer: lb_name,
            port: HOLDING_LISTENER_PORT,
        })?;
        info!(
            "LB ARN: {}, Listener ARN: {}",
            listener.load_balancer_arn, listener.listener_arn
        );
        Ok(listener)
    }
}
