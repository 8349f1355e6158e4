//! Service stability waiter.
//!
//! Polls the cluster at a fixed interval until every service has settled
//! on a single deployment running its desired count. There is no backoff:
//! the poll either succeeds, hits a terminal failure, or runs out of
//! attempts.

use std::time::Duration;

use tracing::debug;

use deploy_core::{DeployError, DeployResult};

use crate::api::{ClusterApi, DescribedServices};

/// Poll cadence for the waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiterConfig {
    /// Delay between polls. The first poll is immediate.
    pub delay: Duration,
    /// Polls before giving up.
    pub max_attempts: u32,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Stable,
    Pending,
    Failed(String),
}

/// Classify a describe result.
pub fn evaluate(requested: &[String], described: &DescribedServices) -> PollOutcome {
    if let Some(failure) = described.failures.iter().find(|f| f.reason == "MISSING") {
        return PollOutcome::Failed(format!("service {} is missing", failure.arn));
    }

    if let Some(service) = described
        .services
        .iter()
        .find(|s| s.status == "DRAINING" || s.status == "INACTIVE")
    {
        return PollOutcome::Failed(format!("service {} is {}", service.name, service.status));
    }

    let all_present = requested
        .iter()
        .all(|name| described.services.iter().any(|s| &s.name == name));

    if all_present && described.services.iter().all(|s| s.is_stable()) {
        PollOutcome::Stable
    } else {
        PollOutcome::Pending
    }
}

/// Block until `services` are stable on `cluster`.
pub async fn wait_until_stable(
    api: &dyn ClusterApi,
    cluster: &str,
    services: &[String],
    config: WaiterConfig,
) -> DeployResult<()> {
    if services.is_empty() {
        return Ok(());
    }

    for attempt in 1..=config.max_attempts {
        let described = api.describe_services(cluster, services).await?;
        match evaluate(services, &described) {
            PollOutcome::Stable => {
                debug!(attempt, ?services, "services stable");
                return Ok(());
            }
            PollOutcome::Failed(reason) => return Err(DeployError::WaiterFailed(reason)),
            PollOutcome::Pending => {
                debug!(
                    attempt,
                    max_attempts = config.max_attempts,
                    ?services,
                    "services not yet stable"
                );
                if attempt < config.max_attempts {
                    tokio::time::sleep(config.delay).await;
                }
            }
        }
    }

    Err(DeployError::WaiterTimeout {
        services: services.to_vec(),
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::api::{ServiceFailure, ServiceState, TaskDefinitionRef};
    use deploy_core::RevisionPatch;

    /// Reports every service with fixed counts and counts the polls.
    struct FixedCluster {
        running: i32,
        polls: AtomicU32,
    }

    #[async_trait]
    impl ClusterApi for FixedCluster {
        async fn describe_services(
            &self,
            _cluster: &str,
            services: &[String],
        ) -> anyhow::Result<DescribedServices> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(DescribedServices {
                services: services
                    .iter()
                    .map(|name| service(name, 1, self.running, "ACTIVE"))
                    .collect(),
                failures: vec![],
            })
        }

        async fn set_desired_count(
            &self,
            _cluster: &str,
            _service: &str,
            _desired_count: i32,
        ) -> anyhow::Result<()> {
            unreachable!()
        }

        async fn set_task_definition(
            &self,
            _cluster: &str,
            _service: &str,
            _arn: &str,
        ) -> anyhow::Result<()> {
            unreachable!()
        }

        async fn latest_task_definition(&self, _arn: &str) -> anyhow::Result<TaskDefinitionRef> {
            unreachable!()
        }

        async fn register_revision(
            &self,
            _base: &TaskDefinitionRef,
            _patch: &RevisionPatch,
        ) -> anyhow::Result<String> {
            unreachable!()
        }
    }

    fn service(name: &str, desired: i32, running: i32, status: &str) -> ServiceState {
        ServiceState {
            name: name.to_string(),
            task_definition: format!("arn:td/{name}:1"),
            desired_count: desired,
            running_count: running,
            deployment_count: 1,
            status: status.to_string(),
        }
    }

    fn requested() -> Vec<String> {
        vec!["test-a".to_string(), "test-b".to_string()]
    }

    #[test]
    fn default_cadence() {
        let cfg = WaiterConfig::default();
        assert_eq!(cfg.delay, Duration::from_secs(5));
        assert_eq!(cfg.max_attempts, 120);
    }

    #[test]
    fn stable_when_all_settled() {
        let described = DescribedServices {
            services: vec![
                service("test-a", 1, 1, "ACTIVE"),
                service("test-b", 0, 0, "ACTIVE"),
            ],
            failures: vec![],
        };
        assert_eq!(evaluate(&requested(), &described), PollOutcome::Stable);
    }

    #[test]
    fn pending_while_scaling() {
        let described = DescribedServices {
            services: vec![
                service("test-a", 2, 1, "ACTIVE"),
                service("test-b", 0, 0, "ACTIVE"),
            ],
            failures: vec![],
        };
        assert_eq!(evaluate(&requested(), &described), PollOutcome::Pending);
    }

    #[test]
    fn pending_when_a_service_is_not_reported() {
        let described = DescribedServices {
            services: vec![service("test-a", 1, 1, "ACTIVE")],
            failures: vec![],
        };
        assert_eq!(evaluate(&requested(), &described), PollOutcome::Pending);
    }

    #[test]
    fn missing_service_fails() {
        let described = DescribedServices {
            services: vec![service("test-a", 1, 1, "ACTIVE")],
            failures: vec![ServiceFailure {
                arn: "arn:service/test-b".to_string(),
                reason: "MISSING".to_string(),
            }],
        };
        assert!(matches!(evaluate(&requested(), &described), PollOutcome::Failed(_)));
    }

    #[test]
    fn draining_service_fails() {
        let described = DescribedServices {
            services: vec![
                service("test-a", 1, 1, "ACTIVE"),
                service("test-b", 1, 1, "DRAINING"),
            ],
            failures: vec![],
        };
        match evaluate(&requested(), &described) {
            PollOutcome::Failed(reason) => assert!(reason.contains("DRAINING")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn first_poll_is_immediate() {
        let cluster = FixedCluster {
            running: 1,
            polls: AtomicU32::new(0),
        };
        let config = WaiterConfig {
            delay: Duration::from_secs(3600),
            max_attempts: 120,
        };

        tokio::time::timeout(
            Duration::from_secs(5),
            wait_until_stable(&cluster, "test-cluster", &requested(), config),
        )
        .await
        .expect("already-stable services must not wait out a delay")
        .unwrap();
        assert_eq!(cluster.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn times_out_after_max_attempts() {
        let cluster = FixedCluster {
            running: 0,
            polls: AtomicU32::new(0),
        };
        let config = WaiterConfig {
            delay: Duration::from_millis(1),
            max_attempts: 3,
        };

        let err = wait_until_stable(&cluster, "test-cluster", &requested(), config)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::WaiterTimeout { attempts: 3, .. }));
        assert_eq!(cluster.polls.load(Ordering::SeqCst), 3);
    }
}
