//! Holding-page listener rule.
//!
//! While essential services are down, a high-priority rule on the load
//! balancer's HTTPS listener answers traffic with a maintenance response.
//! The rule's conditions and actions live in two JSON files using the
//! provider's PascalCase shape:
//!
//! ```text
//! holding_page/
//!   api-conditions.json   [{"Field": "host-header", "HostHeaderConfig": {"Values": [...]}}]
//!   api-actions.json      [{"Type": "fixed-response", "FixedResponseConfig": {...}}]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};

/// Priority of the holding rule; it must win over every app rule.
pub const HOLDING_RULE_PRIORITY: i32 = 1;
/// Port of the listener the holding rule is attached to.
pub const HOLDING_LISTENER_PORT: u16 = 443;
/// Tag marking rules created by this tool.
pub const HOLDING_TAG_KEY: &str = "purpose";
pub const HOLDING_TAG_VALUE: &str = "holding";

pub const CONDITIONS_FILE: &str = "api-conditions.json";
pub const ACTIONS_FILE: &str = "api-actions.json";

/// Conditions and actions for the holding rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingPage {
    pub conditions: Vec<RuleCondition>,
    pub actions: Vec<RuleAction>,
}

impl HoldingPage {
    /// Load both rule files from `dir`.
    pub fn load(dir: &Path) -> DeployResult<Self> {
        Ok(Self {
            conditions: read_json(&dir.join(CONDITIONS_FILE))?,
            actions: read_json(&dir.join(ACTIONS_FILE))?,
        })
    }

    /// Whether a tag set marks a rule as the holding rule.
    pub fn is_holding_tagged<'a>(tags: impl IntoIterator<Item = (&'a str, &'a str)>) -> bool {
        tags.into_iter()
            .any(|(key, value)| key == HOLDING_TAG_KEY && value == HOLDING_TAG_VALUE)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> DeployResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| DeployError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DeployError::HoldingPage {
        path: path.to_path_buf(),
        source,
    })
}

// ── Conditions ─────────────────────────────────────────────────────

/// A listener rule condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct RuleCondition {
    /// `host-header`, `path-pattern`, `http-header`, `http-request-method`,
    /// `query-string` or `source-ip`.
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    pub host_header_config: Option<ValuesConfig>,
    pub path_pattern_config: Option<ValuesConfig>,
    pub http_request_method_config: Option<ValuesConfig>,
    pub source_ip_config: Option<ValuesConfig>,
    pub http_header_config: Option<HttpHeaderConfig>,
    pub query_string_config: Option<QueryStringConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ValuesConfig {
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct HttpHeaderConfig {
    pub http_header_name: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct QueryStringConfig {
    #[serde(default)]
    pub values: Vec<QueryStringPair>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct QueryStringPair {
    pub key: Option<String>,
    pub value: Option<String>,
}

// ── Actions ────────────────────────────────────────────────────────

/// A listener rule action.
///
/// Keys the model does not know are rejected rather than dropped, so a
/// rule is never created with less than the file asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct RuleAction {
    /// `forward`, `fixed-response`, `redirect`, `authenticate-oidc` or
    /// `authenticate-cognito`.
    #[serde(rename = "Type")]
    pub kind: String,
    pub order: Option<i32>,
    pub target_group_arn: Option<String>,
    pub forward_config: Option<ForwardConfig>,
    pub fixed_response_config: Option<FixedResponseConfig>,
    pub redirect_config: Option<RedirectConfig>,
    pub authenticate_oidc_config: Option<AuthenticateOidcConfig>,
    pub authenticate_cognito_config: Option<AuthenticateCognitoConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ForwardConfig {
    #[serde(default)]
    pub target_groups: Vec<TargetGroupWeight>,
    pub target_group_stickiness_config: Option<StickinessConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct TargetGroupWeight {
    pub target_group_arn: Option<String>,
    pub weight: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct StickinessConfig {
    pub enabled: Option<bool>,
    pub duration_seconds: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AuthenticateOidcConfig {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub user_info_endpoint: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub session_cookie_name: Option<String>,
    pub scope: Option<String>,
    pub session_timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub authentication_request_extra_params: BTreeMap<String, String>,
    /// `deny`, `allow` or `authenticate`.
    pub on_unauthenticated_request: Option<String>,
    pub use_existing_client_secret: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct AuthenticateCognitoConfig {
    pub user_pool_arn: String,
    pub user_pool_client_id: String,
    pub user_pool_domain: String,
    pub session_cookie_name: Option<String>,
    pub scope: Option<String>,
    pub session_timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub authentication_request_extra_params: BTreeMap<String, String>,
    pub on_unauthenticated_request: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FixedResponseConfig {
    pub status_code: String,
    pub content_type: Option<String>,
    pub message_body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct RedirectConfig {
    /// `HTTP_301` or `HTTP_302`.
    pub status_code: String,
    pub protocol: Option<String>,
    pub port: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
    pub query: Option<String>,
}
