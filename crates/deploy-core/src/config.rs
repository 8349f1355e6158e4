//! Environment config parser (`envs/<env>.yml`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{DeployError, DeployResult};
use crate::types::{Environment, ServiceName};

/// Per-environment deployment config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvConfig {
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
    /// Named blocks of environment variables services can refer to.
    #[serde(default)]
    pub environment: BTreeMap<String, OrderedPairs>,
}

/// How a single service is deployed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Image repository without a tag.
    pub image: String,
    pub environment: Option<EnvironmentRef>,
    pub secrets: Option<OrderedPairs>,
    /// Desired instance count when the service is started. Required, so a
    /// service cannot be started into zero instances by omission.
    pub count: i32,
    /// Stopping or starting an essential service toggles the holding page.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_essential: bool,
    /// Scale to zero before switching revisions instead of rolling.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub no_rolling_upgrade: bool,
}

/// A service's environment: either the name of a top-level block or an
/// inline map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvironmentRef {
    Named(String),
    Inline(OrderedPairs),
}

/// String key/value pairs in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedPairs(pub Vec<(String, String)>);

impl OrderedPairs {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for OrderedPairs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mapping = serde_yaml::Mapping::deserialize(deserializer)?;
        let mut pairs = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let key = scalar_to_string(&key).map_err(de::Error::custom)?;
            let value = scalar_to_string(&value)
                .map_err(|e| de::Error::custom(format!("{key}: {e}")))?;
            pairs.push((key, value));
        }
        Ok(Self(pairs))
    }
}

impl Serialize for OrderedPairs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Result<String, String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        other => Err(format!("expected a scalar value, got {other:?}")),
    }
}

/// Accepts `true`/`false` as YAML booleans or as strings.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

impl EnvConfig {
    pub fn from_file(path: &Path) -> DeployResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DeployError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| DeployError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Location of an environment's config under `config_dir`.
    pub fn path_for(config_dir: &Path, env: Environment) -> std::path::PathBuf {
        config_dir.join("envs").join(format!("{}.yml", env.as_str()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn service(&self, config_name: &str) -> DeployResult<&ServiceConfig> {
        self.services
            .get(config_name)
            .ok_or_else(|| DeployError::UnknownService(config_name.to_string()))
    }

    /// Config for a cluster-side service name.
    pub fn service_for(&self, env: Environment, service: &ServiceName) -> DeployResult<&ServiceConfig> {
        self.service(service.config_name(env))
    }

    /// Environment variables for a service, in declaration order.
    ///
    /// A named reference to a block that does not exist resolves to no
    /// variables.
    pub fn resolve_environment(&self, service: &ServiceConfig) -> Vec<(String, String)> {
        match &service.environment {
            Some(EnvironmentRef::Named(name)) => self
                .environment
                .get(name)
                .map(|block| block.0.clone())
                .unwrap_or_default(),
            Some(EnvironmentRef::Inline(pairs)) => pairs.0.clone(),
            None => Vec::new(),
        }
    }

    /// True if any of the given services is marked essential.
    pub fn contains_essential<'a>(
        &self,
        env: Environment,
        services: impl IntoIterator<Item = &'a ServiceName>,
    ) -> DeployResult<bool> {
        for service in services {
            if self.service_for(env, service)?.is_essential {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
services:
  api:
    image: 123456789.dkr.ecr.us-east-2.amazonaws.com/backend
    environment: backend
    secrets:
      DB_PASSWORD: arn:aws:secretsmanager:us-east-2:123456789:secret:db
      API_KEY: arn:aws:secretsmanager:us-east-2:123456789:secret:key
    count: 2
    is_essential: 'true'
  sequencer:
    image: 123456789.dkr.ecr.us-east-2.amazonaws.com/sequencer
    environment:
      QUEUE_HOME: /data/queues
      PORT: 5337
    count: 1
    no_rolling_upgrade: true
  telegrambot:
    image: 123456789.dkr.ecr.us-east-2.amazonaws.com/telegrambot
    environment: missing-block
    count: 0
environment:
  backend:
    ZETA: last
    ALPHA: first
    DEBUG: false
"#;

    fn sample() -> EnvConfig {
        EnvConfig::from_yaml_str(SAMPLE).unwrap()
    }

    #[test]
    fn parses_services_and_flags() {
        let config = sample();
        assert_eq!(config.services.len(), 3);

        let api = config.service("api").unwrap();
        assert_eq!(api.count, 2);
        assert!(api.is_essential);
        assert!(!api.no_rolling_upgrade);

        let sequencer = config.service("sequencer").unwrap();
        assert!(!sequencer.is_essential);
        assert!(sequencer.no_rolling_upgrade);

        let bot = config.service("telegrambot").unwrap();
        assert_eq!(bot.count, 0);
        assert!(bot.secrets.is_none());
    }

    #[test]
    fn named_environment_keeps_declaration_order() {
        let config = sample();
        let vars = config.resolve_environment(config.service("api").unwrap());
        assert_eq!(
            vars,
            vec![
                ("ZETA".to_string(), "last".to_string()),
                ("ALPHA".to_string(), "first".to_string()),
                ("DEBUG".to_string(), "false".to_string()),
            ]
        );
    }

    #[test]
    fn inline_environment_renders_scalars() {
        let config = sample();
        let vars = config.resolve_environment(config.service("sequencer").unwrap());
        assert_eq!(vars[1], ("PORT".to_string(), "5337".to_string()));
    }

    #[test]
    fn missing_named_block_resolves_empty() {
        let config = sample();
        let vars = config.resolve_environment(config.service("telegrambot").unwrap());
        assert!(vars.is_empty());
    }

    #[test]
    fn unknown_service_is_an_error() {
        let err = sample().service("web").unwrap_err();
        assert!(matches!(err, DeployError::UnknownService(name) if name == "web"));
    }

    #[test]
    fn essential_detection_uses_prefixed_names() {
        let config = sample();
        let env = Environment::Test;
        let with_api = [env.service_name("sequencer"), env.service_name("api")];
        let without = [env.service_name("sequencer")];
        assert!(config.contains_essential(env, &with_api).unwrap());
        assert!(!config.contains_essential(env, &without).unwrap());
    }

    #[test]
    fn rejects_bad_flag_value() {
        let yaml = "services:\n  a:\n    image: x\n    count: 1\n    is_essential: maybe\n";
        assert!(EnvConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn count_is_required() {
        let yaml = "services:\n  api:\n    image: a\n    is_essential: 'true'\n";
        let err = EnvConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("missing field `count`"), "{err}");
    }

    #[test]
    fn from_file_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = EnvConfig::path_for(dir.path(), Environment::Demo);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "services: [not, a, map]\n").unwrap();

        let err = EnvConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, DeployError::Config { .. }));
        assert!(err.to_string().contains("demo.yml"));
    }

    #[test]
    fn from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnvConfig::from_file(&dir.path().join("nope.yml")).unwrap_err();
        assert!(matches!(err, DeployError::Io { .. }));
    }
}
