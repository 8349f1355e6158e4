//! Deployment error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while planning or running a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid environment config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid holding page rules {path}: {source}")]
    HoldingPage {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("service not present in environment config: {0}")]
    UnknownService(String),

    #[error("task definition has no container definitions: {0}")]
    NoPrimaryContainer(String),

    #[error("load balancer not found: {0}")]
    LoadBalancerNotFound(String),

    #[error("no listener on port {port} for load balancer {load_balancer}")]
    ListenerNotFound { load_balancer: String, port: u16 },

    #[error("services failed to stabilize: {0}")]
    WaiterFailed(String),

    #[error("services {services:?} not stable after {attempts} attempts")]
    WaiterTimeout { services: Vec<String>, attempts: u32 },

    #[error("provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

pub type DeployResult<T> = Result<T, DeployError>;
