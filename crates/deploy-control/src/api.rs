//! Provider seams.
//!
//! The deployment manager only talks to the cluster and the load balancer
//! through these traits. `crate::aws` implements them on top of the AWS
//! SDK; tests use in-memory fakes.

use async_trait::async_trait;

use deploy_core::{RevisionPatch, RuleAction, RuleCondition};

/// Observed state of one cluster service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceState {
    pub name: String,
    /// ARN of the task definition the service currently runs.
    pub task_definition: String,
    pub desired_count: i32,
    pub running_count: i32,
    /// Number of deployments in flight (1 when settled).
    pub deployment_count: usize,
    /// `ACTIVE`, `DRAINING` or `INACTIVE`.
    pub status: String,
}

impl ServiceState {
    /// A service is stable when a single deployment runs the desired count.
    pub fn is_stable(&self) -> bool {
        self.deployment_count == 1 && self.running_count == self.desired_count
    }
}

/// A service the provider could not describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFailure {
    pub arn: String,
    /// e.g. `MISSING`.
    pub reason: String,
}

/// Result of describing a set of services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribedServices {
    pub services: Vec<ServiceState>,
    pub failures: Vec<ServiceFailure>,
}

/// The latest revision of a service's task-definition family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinitionRef {
    pub family: String,
    pub arn: String,
    pub revision: i32,
}

/// A load balancer listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerRef {
    pub load_balancer_arn: String,
    pub listener_arn: String,
}

/// Container-cluster control plane.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn describe_services(
        &self,
        cluster: &str,
        services: &[String],
    ) -> anyhow::Result<DescribedServices>;

    async fn set_desired_count(
        &self,
        cluster: &str,
        service: &str,
        desired_count: i32,
    ) -> anyhow::Result<()>;

    async fn set_task_definition(
        &self,
        cluster: &str,
        service: &str,
        task_definition_arn: &str,
    ) -> anyhow::Result<()>;

    /// Resolve the latest revision in the family of `task_definition_arn`.
    async fn latest_task_definition(
        &self,
        task_definition_arn: &str,
    ) -> anyhow::Result<TaskDefinitionRef>;

    /// Register a copy of `base` with `patch` applied to its primary
    /// container. Returns the new revision's ARN.
    async fn register_revision(
        &self,
        base: &TaskDefinitionRef,
        patch: &RevisionPatch,
    ) -> anyhow::Result<String>;
}

/// Load balancer control plane.
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    /// Find the listener on `port` of the load balancer named `name`.
    /// `Ok(None)` means the load balancer exists but has no such listener.
    async fn find_listener(&self, name: &str, port: u16) -> anyhow::Result<Option<ListenerRef>>;

    /// Create a rule and return its ARN.
    async fn create_rule(
        &self,
        listener_arn: &str,
        priority: i32,
        conditions: &[RuleCondition],
        actions: &[RuleAction],
    ) -> anyhow::Result<String>;

    async fn tag_resource(&self, arn: &str, key: &str, value: &str) -> anyhow::Result<()>;

    /// ARNs of every rule on the listener.
    async fn list_rules(&self, listener_arn: &str) -> anyhow::Result<Vec<String>>;

    async fn rule_tags(&self, rule_arn: &str) -> anyhow::Result<Vec<(String, String)>>;

    async fn delete_rule(&self, rule_arn: &str) -> anyhow::Result<()>;
}
