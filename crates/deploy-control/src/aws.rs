//! AWS-backed implementations of the provider seams: ECS for the cluster,
//! Elastic Load Balancing v2 for the holding-page rule.

use std::collections::{BTreeMap, HashMap};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_sdk_ecs as ecs;
use aws_sdk_ecs::operation::register_task_definition::builders::RegisterTaskDefinitionFluentBuilder;
use aws_sdk_elasticloadbalancingv2 as elb;
use tracing::debug;

use deploy_core::holding::{RuleAction, RuleCondition};
use deploy_core::{RevisionPatch, REVISION_FIELDS};

use crate::api::{
    ClusterApi, DescribedServices, ListenerRef, LoadBalancerApi, ServiceFailure, ServiceState,
    TaskDefinitionRef,
};

/// Services accepted by a single `DescribeServices` call.
const DESCRIBE_SERVICES_LIMIT: usize = 10;

/// Load shared SDK config for `region` from the default credential chain.
pub async fn load_sdk_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(ecs::config::Region::new(region.to_string()))
        .load()
        .await
}

fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items.to_vec())
    }
}

// ── ECS ────────────────────────────────────────────────────────────

/// Cluster control through the ECS API.
pub struct EcsCluster {
    client: ecs::Client,
}

impl EcsCluster {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: ecs::Client::new(config),
        }
    }
}

#[async_trait]
impl ClusterApi for EcsCluster {
    async fn describe_services(
        &self,
        cluster: &str,
        services: &[String],
    ) -> anyhow::Result<DescribedServices> {
        let mut described = DescribedServices::default();

        for chunk in services.chunks(DESCRIBE_SERVICES_LIMIT) {
            let output = self
                .client
                .describe_services()
                .cluster(cluster)
                .set_services(Some(chunk.to_vec()))
                .send()
                .await
                .with_context(|| format!("describe services {chunk:?} in {cluster}"))?;

            described
                .services
                .extend(output.services().iter().map(|s| ServiceState {
                    name: s.service_name().unwrap_or_default().to_string(),
                    task_definition: s.task_definition().unwrap_or_default().to_string(),
                    desired_count: s.desired_count(),
                    running_count: s.running_count(),
                    deployment_count: s.deployments().len(),
                    status: s.status().unwrap_or_default().to_string(),
                }));
            described
                .failures
                .extend(output.failures().iter().map(|f| ServiceFailure {
                    arn: f.arn().unwrap_or_default().to_string(),
                    reason: f.reason().unwrap_or_default().to_string(),
                }));
        }

        Ok(described)
    }

    async fn set_desired_count(
        &self,
        cluster: &str,
        service: &str,
        desired_count: i32,
    ) -> anyhow::Result<()> {
        self.client
            .update_service()
            .cluster(cluster)
            .service(service)
            .desired_count(desired_count)
            .send()
            .await
            .with_context(|| format!("set desired count of {service} to {desired_count}"))?;
        Ok(())
    }

    async fn set_task_definition(
        &self,
        cluster: &str,
        service: &str,
        task_definition_arn: &str,
    ) -> anyhow::Result<()> {
        self.client
            .update_service()
            .cluster(cluster)
            .service(service)
            .task_definition(task_definition_arn)
            .send()
            .await
            .with_context(|| format!("point {service} at {task_definition_arn}"))?;
        Ok(())
    }

    async fn latest_task_definition(
        &self,
        task_definition_arn: &str,
    ) -> anyhow::Result<TaskDefinitionRef> {
        let current = self
            .client
            .describe_task_definition()
            .task_definition(task_definition_arn)
            .send()
            .await
            .with_context(|| format!("describe task definition {task_definition_arn}"))?;
        let family = current
            .task_definition()
            .and_then(|td| td.family())
            .ok_or_else(|| anyhow!("task definition {task_definition_arn} has no family"))?
            .to_string();

        // Describing by family name yields the latest ACTIVE revision.
        let latest = self
            .client
            .describe_task_definition()
            .task_definition(&family)
            .send()
            .await
            .with_context(|| format!("describe task definition family {family}"))?;
        let td = latest
            .task_definition()
            .ok_or_else(|| anyhow!("task definition family {family} has no revisions"))?;

        Ok(TaskDefinitionRef {
            arn: td.task_definition_arn().unwrap_or_default().to_string(),
            revision: td.revision(),
            family,
        })
    }

    async fn register_revision(
        &self,
        base: &TaskDefinitionRef,
        patch: &RevisionPatch,
    ) -> anyhow::Result<String> {
        let described = self
            .client
            .describe_task_definition()
            .task_definition(&base.arn)
            .include(ecs::types::TaskDefinitionField::Tags)
            .send()
            .await
            .with_context(|| format!("describe task definition {}", base.arn))?;
        let td = described
            .task_definition()
            .ok_or_else(|| anyhow!("task definition {} not found", base.arn))?;

        let mut containers = td.container_definitions().to_vec();
        let primary = containers
            .first_mut()
            .ok_or_else(|| anyhow!("task definition {} has no containers", base.arn))?;
        primary.image = Some(patch.image.clone());
        primary.environment = Some(
            patch
                .environment
                .iter()
                .map(|(name, value)| {
                    ecs::types::KeyValuePair::builder()
                        .name(name)
                        .value(value)
                        .build()
                })
                .collect(),
        );
        primary.secrets = Some(
            patch
                .secrets
                .iter()
                .map(|(name, value_from)| {
                    ecs::types::Secret::builder()
                        .name(name)
                        .value_from(value_from)
                        .build()
                })
                .collect::<Result<Vec<_>, _>>()?,
        );

        debug!(family = %base.family, fields = ?REVISION_FIELDS, "copying task definition");
        let request = copy_revision_fields(
            self.client.register_task_definition(),
            td,
            containers,
            described.tags(),
        );

        let registered = request
            .send()
            .await
            .with_context(|| format!("register task definition for {}", base.family))?;

        registered
            .task_definition()
            .and_then(|td| td.task_definition_arn())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("registered task definition for {} has no ARN", base.family))
    }
}

/// Carry every `REVISION_FIELDS` entry of `td` over into a registration
/// request, with `containers` replacing its container definitions. Tags are
/// only set when the described revision has any.
fn copy_revision_fields(
    request: RegisterTaskDefinitionFluentBuilder,
    td: &ecs::types::TaskDefinition,
    containers: Vec<ecs::types::ContainerDefinition>,
    tags: &[ecs::types::Tag],
) -> RegisterTaskDefinitionFluentBuilder {
    request
        .set_family(td.family().map(str::to_string))
        .set_task_role_arn(td.task_role_arn().map(str::to_string))
        .set_execution_role_arn(td.execution_role_arn().map(str::to_string))
        .set_network_mode(td.network_mode().cloned())
        .set_container_definitions(Some(containers))
        .set_volumes(non_empty(td.volumes()))
        .set_placement_constraints(non_empty(td.placement_constraints()))
        .set_requires_compatibilities(non_empty(td.requires_compatibilities()))
        .set_cpu(td.cpu().map(str::to_string))
        .set_memory(td.memory().map(str::to_string))
        .set_tags(non_empty(tags))
        .set_pid_mode(td.pid_mode().cloned())
        .set_ipc_mode(td.ipc_mode().cloned())
        .set_proxy_configuration(td.proxy_configuration().cloned())
        .set_inference_accelerators(non_empty(td.inference_accelerators()))
}

// ── Elastic Load Balancing v2 ──────────────────────────────────────

/// Listener-rule control through the ELBv2 API.
pub struct ElbLoadBalancer {
    client: elb::Client,
}

impl ElbLoadBalancer {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: elb::Client::new(config),
        }
    }
}

fn to_sdk_condition(condition: &RuleCondition) -> elb::types::RuleCondition {
    use elb::types::{
        HostHeaderConditionConfig, HttpHeaderConditionConfig, HttpRequestMethodConditionConfig,
        PathPatternConditionConfig, QueryStringConditionConfig, QueryStringKeyValuePair,
        SourceIpConditionConfig,
    };

    elb::types::RuleCondition::builder()
        .set_field(condition.field.clone())
        .set_values(non_empty(&condition.values))
        .set_host_header_config(condition.host_header_config.as_ref().map(|cfg| {
            HostHeaderConditionConfig::builder()
                .set_values(Some(cfg.values.clone()))
                .build()
        }))
        .set_path_pattern_config(condition.path_pattern_config.as_ref().map(|cfg| {
            PathPatternConditionConfig::builder()
                .set_values(Some(cfg.values.clone()))
                .build()
        }))
        .set_http_request_method_config(condition.http_request_method_config.as_ref().map(
            |cfg| {
                HttpRequestMethodConditionConfig::builder()
                    .set_values(Some(cfg.values.clone()))
                    .build()
            },
        ))
        .set_source_ip_config(condition.source_ip_config.as_ref().map(|cfg| {
            SourceIpConditionConfig::builder()
                .set_values(Some(cfg.values.clone()))
                .build()
        }))
        .set_http_header_config(condition.http_header_config.as_ref().map(|cfg| {
            HttpHeaderConditionConfig::builder()
                .set_http_header_name(cfg.http_header_name.clone())
                .set_values(Some(cfg.values.clone()))
                .build()
        }))
        .set_query_string_config(condition.query_string_config.as_ref().map(|cfg| {
            QueryStringConditionConfig::builder()
                .set_values(Some(
                    cfg.values
                        .iter()
                        .map(|pair| {
                            QueryStringKeyValuePair::builder()
                                .set_key(pair.key.clone())
                                .set_value(pair.value.clone())
                                .build()
                        })
                        .collect(),
                ))
                .build()
        }))
        .build()
}

fn to_sdk_action(action: &RuleAction) -> anyhow::Result<elb::types::Action> {
    use elb::types::{
        ActionTypeEnum, AuthenticateCognitoActionConditionalBehaviorEnum,
        AuthenticateCognitoActionConfig, AuthenticateOidcActionConditionalBehaviorEnum,
        AuthenticateOidcActionConfig, FixedResponseActionConfig, ForwardActionConfig,
        RedirectActionConfig, RedirectActionStatusCodeEnum, TargetGroupStickinessConfig,
        TargetGroupTuple,
    };

    let forward = action.forward_config.as_ref().map(|cfg| {
        ForwardActionConfig::builder()
            .set_target_groups(Some(
                cfg.target_groups
                    .iter()
                    .map(|tg| {
                        TargetGroupTuple::builder()
                            .set_target_group_arn(tg.target_group_arn.clone())
                            .set_weight(tg.weight)
                            .build()
                    })
                    .collect(),
            ))
            .set_target_group_stickiness_config(cfg.target_group_stickiness_config.as_ref().map(
                |sticky| {
                    TargetGroupStickinessConfig::builder()
                        .set_enabled(sticky.enabled)
                        .set_duration_seconds(sticky.duration_seconds)
                        .build()
                },
            ))
            .build()
    });

    let fixed_response = action
        .fixed_response_config
        .as_ref()
        .map(|cfg| {
            FixedResponseActionConfig::builder()
                .status_code(&cfg.status_code)
                .set_content_type(cfg.content_type.clone())
                .set_message_body(cfg.message_body.clone())
                .build()
        });

    let redirect = action
        .redirect_config
        .as_ref()
        .map(|cfg| {
            RedirectActionConfig::builder()
                .status_code(RedirectActionStatusCodeEnum::from(cfg.status_code.as_str()))
                .set_protocol(cfg.protocol.clone())
                .set_port(cfg.port.clone())
                .set_host(cfg.host.clone())
                .set_path(cfg.path.clone())
                .set_query(cfg.query.clone())
                .build()
        });

    let oidc = action
        .authenticate_oidc_config
        .as_ref()
        .map(|cfg| {
            AuthenticateOidcActionConfig::builder()
                .issuer(&cfg.issuer)
                .authorization_endpoint(&cfg.authorization_endpoint)
                .token_endpoint(&cfg.token_endpoint)
                .user_info_endpoint(&cfg.user_info_endpoint)
                .client_id(&cfg.client_id)
                .set_client_secret(cfg.client_secret.clone())
                .set_session_cookie_name(cfg.session_cookie_name.clone())
                .set_scope(cfg.scope.clone())
                .set_session_timeout(cfg.session_timeout)
                .set_authentication_request_extra_params(non_empty_params(
                    &cfg.authentication_request_extra_params,
                ))
                .set_on_unauthenticated_request(
                    cfg.on_unauthenticated_request
                        .as_deref()
                        .map(AuthenticateOidcActionConditionalBehaviorEnum::from),
                )
                .set_use_existing_client_secret(cfg.use_existing_client_secret)
                .build()
        });

    let cognito = action
        .authenticate_cognito_config
        .as_ref()
        .map(|cfg| {
            AuthenticateCognitoActionConfig::builder()
                .user_pool_arn(&cfg.user_pool_arn)
                .user_pool_client_id(&cfg.user_pool_client_id)
                .user_pool_domain(&cfg.user_pool_domain)
                .set_session_cookie_name(cfg.session_cookie_name.clone())
                .set_scope(cfg.scope.clone())
                .set_session_timeout(cfg.session_timeout)
                .set_authentication_request_extra_params(non_empty_params(
                    &cfg.authentication_request_extra_params,
                ))
                .set_on_unauthenticated_request(
                    cfg.on_unauthenticated_request
                        .as_deref()
                        .map(AuthenticateCognitoActionConditionalBehaviorEnum::from),
                )
                .build()
        });

    Ok(elb::types::Action::builder()
        .r#type(ActionTypeEnum::from(action.kind.as_str()))
        .set_order(action.order)
        .set_target_group_arn(action.target_group_arn.clone())
        .set_forward_config(forward)
        .set_fixed_response_config(fixed_response)
        .set_redirect_config(redirect)
        .set_authenticate_oidc_config(oidc)
        .set_authenticate_cognito_config(cognito)
        .build())
}

fn non_empty_params(params: &BTreeMap<String, String>) -> Option<HashMap<String, String>> {
    if params.is_empty() {
        None
    } else {
        Some(params.clone().into_iter().collect())
    }
}

#[async_trait]
impl LoadBalancerApi for ElbLoadBalancer {
    async fn find_listener(&self, name: &str, port: u16) -> anyhow::Result<Option<ListenerRef>> {
        let lbs = self
            .client
            .describe_load_balancers()
            .names(name)
            .send()
            .await
            .with_context(|| format!("describe load balancer {name}"))?;
        let load_balancer_arn = lbs
            .load_balancers()
            .first()
            .and_then(|lb| lb.load_balancer_arn())
            .ok_or_else(|| anyhow!("load balancer {name} not found"))?
            .to_string();

        let listeners = self
            .client
            .describe_listeners()
            .load_balancer_arn(&load_balancer_arn)
            .send()
            .await
            .with_context(|| format!("describe listeners of {load_balancer_arn}"))?;

        let listener_arn = listeners
            .listeners()
            .iter()
            .find(|listener| listener.port() == Some(i32::from(port)))
            .and_then(|listener| listener.listener_arn())
            .map(str::to_string);

        Ok(listener_arn.map(|listener_arn| ListenerRef {
            load_balancer_arn,
            listener_arn,
        }))
    }

    async fn create_rule(
        &self,
        listener_arn: &str,
        priority: i32,
        conditions: &[RuleCondition],
        actions: &[RuleAction],
    ) -> anyhow::Result<String> {
        let actions = actions
            .iter()
            .map(to_sdk_action)
            .collect::<anyhow::Result<Vec<_>>>()?;

        let output = self
            .client
            .create_rule()
            .listener_arn(listener_arn)
            .priority(priority)
            .set_conditions(Some(conditions.iter().map(to_sdk_condition).collect()))
            .set_actions(Some(actions))
            .send()
            .await
            .with_context(|| format!("create rule on {listener_arn}"))?;

        output
            .rules()
            .first()
            .and_then(|rule| rule.rule_arn())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("create rule on {listener_arn} returned no rule"))
    }

    async fn tag_resource(&self, arn: &str, key: &str, value: &str) -> anyhow::Result<()> {
        let tag = elb::types::Tag::builder().key(key).value(value).build();
        self.client
            .add_tags()
            .resource_arns(arn)
            .tags(tag)
            .send()
            .await
            .with_context(|| format!("tag {arn} with {key}={value}"))?;
        Ok(())
    }

    async fn list_rules(&self, listener_arn: &str) -> anyhow::Result<Vec<String>> {
        let output = self
            .client
            .describe_rules()
            .listener_arn(listener_arn)
            .send()
            .await
            .with_context(|| format!("describe rules of {listener_arn}"))?;
        Ok(output
            .rules()
            .iter()
            .filter_map(|rule| rule.rule_arn())
            .map(str::to_string)
            .collect())
    }

    async fn rule_tags(&self, rule_arn: &str) -> anyhow::Result<Vec<(String, String)>> {
        let output = self
            .client
            .describe_tags()
            .resource_arns(rule_arn)
            .send()
            .await
            .with_context(|| format!("describe tags of {rule_arn}"))?;
        Ok(output
            .tag_descriptions()
            .first()
            .map(|description| {
                description
                    .tags()
                    .iter()
                    .map(|tag| {
                        (
                            tag.key().unwrap_or_default().to_string(),
                            tag.value().unwrap_or_default().to_string(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_rule(&self, rule_arn: &str) -> anyhow::Result<()> {
        self.client
            .delete_rule()
            .rule_arn(rule_arn)
            .send()
            .await
            .with_context(|| format!("delete rule {rule_arn}"))?;
        Ok(())
    }
}
