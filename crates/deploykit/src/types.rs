//! Core types for deployment processing.

use crate::error::Error;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Lifecycle action requested for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Mint a new deployment
    Create,
    /// Re-address an existing deployment
    Update,
    /// Tear down an existing deployment
    Delete,
}

impl ActionKind {
    /// All supported actions, in declaration order.
    pub const ALL: [ActionKind; 3] = [Self::Create, Self::Update, Self::Delete];

    /// Lowercase name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::validation(format!(
                "invalid action type: '{other}'. Supported: create, update, delete"
            ))),
        }
    }
}

/// One logical resource from the resource config.
///
/// `type` and `resource_name` are always present and non-empty; every other
/// key is carried in `attributes` without validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceEntry {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub resource_name: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ResourceEntry {
    /// Create an entry with no extra attributes.
    pub fn new(resource_type: impl Into<String>, resource_name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_name: resource_name.into(),
            attributes: Map::new(),
        }
    }

    /// Add an attribute (builder style).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up a string attribute.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Validated, non-empty, ordered list of resource entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceConfig {
    entries: Vec<ResourceEntry>,
}

impl ResourceConfig {
    /// Build a config from entries. Fails if there are none.
    pub fn new(entries: Vec<ResourceEntry>) -> crate::Result<Self> {
        if entries.is_empty() {
            return Err(Error::parsing("\"entries\" must contain at least one entry"));
        }
        Ok(Self { entries })
    }

    /// Entries in configuration order.
    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    /// Number of entries (always at least one).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries; never true for a validated config.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the entries, keeping the non-empty invariant.
    pub fn map_entries<F>(self, f: F) -> crate::Result<Self>
    where
        F: FnMut(ResourceEntry) -> crate::Result<ResourceEntry>,
    {
        let entries = self
            .entries
            .into_iter()
            .map(f)
            .collect::<crate::Result<Vec<_>>>()?;
        Self::new(entries)
    }

    /// Compact JSON form, `{"entries":[...]}`.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One workspace ID and the entry it addresses.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceItem {
    pub workspace_id: String,
    pub entry: ResourceEntry,
}

// Serialized as a single-key object: {"<workspace_id>": {...entry}}
impl Serialize for WorkspaceItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.workspace_id, &self.entry)?;
        map.end()
    }
}

/// Ordered mapping from workspace ID to resource entry.
pub type WorkspaceMapping = Vec<WorkspaceItem>;

/// Outcome of a processed action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub action: ActionKind,
    pub owner: String,
    pub deployment_name: String,
    pub workspace_ids: Vec<String>,
    #[serde(flatten)]
    pub details: ActionDetails,
}

/// Action-specific part of an [`ActionResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionDetails {
    /// A freshly minted deployment
    Created {
        user_defined_deployment_name: String,
        item_map: WorkspaceMapping,
    },
    /// An existing deployment being updated or deleted
    Existing { resource_config: ResourceConfig },
}

/// Retry and timeout policy for action processing.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Additional attempts after the first one
    pub retry_attempts: u32,
    /// Time budget for a single attempt
    pub attempt_timeout: Duration,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(300))
    }
}

impl RetryConfig {
    /// Create a retry config with the default backoff schedule.
    pub fn new(retry_attempts: u32, attempt_timeout: Duration) -> Self {
        Self {
            retry_attempts,
            attempt_timeout,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }

    /// Calculate the delay after a failed attempt (0-indexed).
    ///
    /// Never shorter than the previous delay, never longer than `max_delay`
    /// or the per-attempt timeout.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let cap = self.max_delay.min(self.attempt_timeout).as_secs_f64();
        Duration::from_secs_f64(delay.min(cap))
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            retry_attempts: 0,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_kind_from_str() {
        assert_eq!("create".parse::<ActionKind>().unwrap(), ActionKind::Create);
        assert_eq!(" UPDATE ".parse::<ActionKind>().unwrap(), ActionKind::Update);
        assert_eq!("Delete".parse::<ActionKind>().unwrap(), ActionKind::Delete);

        let err = "destroy".parse::<ActionKind>().unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Validation);
        assert!(err.to_string().contains("destroy"));
    }

    #[test]
    fn test_resource_config_rejects_empty() {
        let err = ResourceConfig::new(Vec::new()).unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Parsing);
    }

    #[test]
    fn test_resource_config_json_keeps_type_first() {
        let config = ResourceConfig::new(vec![
            ResourceEntry::new("s3", "bucket").with_attribute("region", "us-east-1"),
        ])
        .unwrap();

        assert_eq!(
            config.to_json().unwrap(),
            r#"{"entries":[{"type":"s3","resource_name":"bucket","region":"us-east-1"}]}"#
        );
    }

    #[test]
    fn test_workspace_item_serializes_as_single_key_object() {
        let item = WorkspaceItem {
            workspace_id: "s3-bucket-deployment_x".to_string(),
            entry: ResourceEntry::new("s3", "bucket").with_attribute("versioning", true),
        };

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            json!({"s3-bucket-deployment_x": {"type": "s3", "resource_name": "bucket", "versioning": true}})
        );
    }

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.max_attempts(), 4);
        assert_eq!(config.attempt_timeout, Duration::from_secs(300));
        assert_eq!(RetryConfig::no_retry().max_attempts(), 1);
    }

    #[test]
    fn test_retry_delay_is_monotonic_and_capped() {
        let config = RetryConfig::default();

        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(30));

        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = config.delay_for_attempt(attempt);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn test_retry_delay_capped_by_attempt_timeout() {
        let config = RetryConfig::new(5, Duration::from_secs(3));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(3));
    }
}
