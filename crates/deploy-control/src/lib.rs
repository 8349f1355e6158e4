//! deploy-control — stop, start and upgrade cluster services and toggle
//! the maintenance holding page.
//!
//! # Architecture
//!
//! ```text
//! DeploymentManager
//!   ├── ClusterApi        describe/update services, task-definition revisions
//!   │     └── EcsCluster  (aws-sdk-ecs)
//!   ├── LoadBalancerApi   listener lookup, holding rule create/tag/delete
//!   │     └── ElbLoadBalancer (aws-sdk-elasticloadbalancingv2)
//!   └── waiter            fixed-interval poll until services are stable
//! ```

pub mod api;
pub mod aws;
pub mod manager;
pub mod waiter;

pub use api::{
    ClusterApi, DescribedServices, ListenerRef, LoadBalancerApi, ServiceFailure, ServiceState,
    TaskDefinitionRef,
};
pub use aws::{load_sdk_config, EcsCluster, ElbLoadBalancer};
pub use manager::{DeploymentContext, DeploymentManager};
pub use waiter::{wait_until_stable, PollOutcome, WaiterConfig};
