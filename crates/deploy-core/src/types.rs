//! Environments, actions and the naming conventions that tie config
//! service names to cluster resources.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A deployment target environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    Demo,
    Testnet,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 4] = [Self::Test, Self::Demo, Self::Testnet, Self::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Demo => "demo",
            Self::Testnet => "testnet",
            Self::Prod => "prod",
        }
    }

    /// Region the environment's cluster and load balancer live in.
    pub fn default_region(&self) -> &'static str {
        match self {
            Self::Test | Self::Demo | Self::Testnet => "us-east-2",
            Self::Prod => "eu-central-2",
        }
    }

    pub fn cluster_name(&self) -> String {
        format!("{}-cluster", self.as_str())
    }

    pub fn load_balancer_name(&self) -> String {
        format!("{}-lb", self.as_str())
    }

    /// Cluster-side name of a config service (`<env>-<service>`).
    pub fn service_name(&self, config_name: &str) -> ServiceName {
        ServiceName(format!("{}-{}", self.as_str(), config_name))
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| format!("unknown environment '{s}' (expected test, demo, testnet or prod)"))
    }
}

/// An environment-prefixed service name as known to the cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The config key this service was derived from. Names without the
    /// environment prefix are returned unchanged.
    pub fn config_name(&self, env: Environment) -> &str {
        self.0
            .strip_prefix(env.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What the deploy tool has been asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Stop,
    Start,
    Upgrade,
    SwitchToHolding,
    SwitchToApp,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Self::Stop,
        Self::Start,
        Self::Upgrade,
        Self::SwitchToHolding,
        Self::SwitchToApp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Start => "start",
            Self::Upgrade => "upgrade",
            Self::SwitchToHolding => "switch-to-holding",
            Self::SwitchToApp => "switch-to-app",
        }
    }

    /// Whether the action operates on the selected services rather than
    /// the load balancer alone.
    pub fn targets_services(&self) -> bool {
        matches!(self, Self::Stop | Self::Start | Self::Upgrade)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown action '{s}' (expected stop, start, upgrade, switch-to-holding or switch-to-app)"
                )
            })
    }
}

/// Render a list of service names the way status lines print them.
pub fn display_names<'a>(names: impl IntoIterator<Item = &'a ServiceName>) -> String {
    let names: Vec<&str> = names.into_iter().map(ServiceName::as_str).collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_per_environment() {
        assert_eq!(Environment::Test.default_region(), "us-east-2");
        assert_eq!(Environment::Demo.default_region(), "us-east-2");
        assert_eq!(Environment::Testnet.default_region(), "us-east-2");
        assert_eq!(Environment::Prod.default_region(), "eu-central-2");
    }

    #[test]
    fn resource_names() {
        let env = Environment::Testnet;
        assert_eq!(env.cluster_name(), "testnet-cluster");
        assert_eq!(env.load_balancer_name(), "testnet-lb");
        assert_eq!(env.service_name("api").as_str(), "testnet-api");
    }

    #[test]
    fn config_name_strips_only_own_prefix() {
        assert_eq!(ServiceName::new("test-api").config_name(Environment::Test), "api");
        // "testnet-api" must not become "net-api" under the test env.
        assert_eq!(
            ServiceName::new("testnet-api").config_name(Environment::Test),
            "testnet-api"
        );
        assert_eq!(
            ServiceName::new("testnet-api").config_name(Environment::Testnet),
            "api"
        );
        assert_eq!(ServiceName::new("other").config_name(Environment::Prod), "other");
    }

    #[test]
    fn parse_environment_and_action() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("staging".parse::<Environment>().is_err());
        assert_eq!(
            "switch-to-holding".parse::<Action>().unwrap(),
            Action::SwitchToHolding
        );
        assert!("restart".parse::<Action>().is_err());
    }

    #[test]
    fn only_service_actions_target_services() {
        assert!(Action::Upgrade.targets_services());
        assert!(!Action::SwitchToApp.targets_services());
    }

    #[test]
    fn display_names_format() {
        let names = [ServiceName::new("test-a"), ServiceName::new("test-b")];
        assert_eq!(display_names(&names), "[test-a, test-b]");
    }
}
