//! Task-definition revision patch.
//!
//! An upgrade registers a new revision of each service's task definition
//! family. Everything is copied from the latest revision except the
//! primary (first) container's image, environment and secrets, which are
//! rebuilt from the environment config.

use serde::Serialize;

use crate::config::{EnvConfig, ServiceConfig};
use crate::types::Environment;

/// Task-definition fields carried over into a new revision.
pub const REVISION_FIELDS: &[&str] = &[
    "family",
    "taskRoleArn",
    "executionRoleArn",
    "networkMode",
    "containerDefinitions",
    "volumes",
    "placementConstraints",
    "requiresCompatibilities",
    "cpu",
    "memory",
    "tags",
    "pidMode",
    "ipcMode",
    "proxyConfiguration",
    "inferenceAccelerators",
];

/// Variable naming the environment a container runs in.
pub const ENV_NAME_VAR: &str = "ENV_NAME";
/// Variable naming the config service a container runs as.
pub const APP_NAME_VAR: &str = "APP_NAME";

/// Changes applied to the primary container of a new revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionPatch {
    /// `<image>:<tag>`.
    pub image: String,
    /// Replaces the container's environment entirely.
    pub environment: Vec<(String, String)>,
    /// Replaces the container's secrets entirely; `(name, valueFrom)`.
    pub secrets: Vec<(String, String)>,
}

impl RevisionPatch {
    pub fn build(
        env: Environment,
        config_name: &str,
        service: &ServiceConfig,
        config: &EnvConfig,
        image_tag: &str,
    ) -> Self {
        let mut environment = config.resolve_environment(service);
        environment.push((ENV_NAME_VAR.to_string(), env.as_str().to_string()));
        environment.push((APP_NAME_VAR.to_string(), config_name.to_string()));

        let secrets = service
            .secrets
            .as_ref()
            .map(|pairs| pairs.0.clone())
            .unwrap_or_default();

        Self {
            image: format!("{}:{}", service.image, image_tag),
            environment,
            secrets,
        }
    }
}
