//! deploy-core — config, naming and payload construction for cluster
//! deployments.
//!
//! Nothing in this crate talks to the provider. It turns the
//! per-environment YAML config, the CLI selection and the holding-page
//! rule files into the values `deploy-control` sends to the cluster and
//! load balancer.
//!
//! # Components
//!
//! - **`config`** — `envs/<env>.yml` parsing and environment resolution
//! - **`types`** — environments, actions, environment-prefixed service names
//! - **`selection`** — which services an action applies to
//! - **`revision`** — changes applied to the primary container on upgrade
//! - **`holding`** — holding-page listener rule conditions and actions

pub mod config;
pub mod error;
pub mod holding;
pub mod revision;
pub mod selection;
pub mod types;

pub use config::{EnvConfig, EnvironmentRef, OrderedPairs, ServiceConfig};
pub use error::{DeployError, DeployResult};
pub use holding::{HoldingPage, RuleAction, RuleCondition};
pub use revision::{RevisionPatch, REVISION_FIELDS};
pub use selection::select_services;
pub use types::*;
