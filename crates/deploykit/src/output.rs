//! Output emission.
//!
//! Turns an [`ActionResult`] into the key/value pairs downstream pipeline
//! steps read. The key set depends only on the action.

use crate::error::Result;
use crate::types::{ActionDetails, ActionResult};

pub const RESOURCE_OWNER: &str = "RESOURCE_OWNER";
pub const DEPLOYMENT_NAME: &str = "DEPLOYMENT_NAME";
pub const USER_DEFINED_DEPLOYMENT_NAME: &str = "USER_DEFINED_DEPLOYMENT_NAME";
pub const RESOURCE_CONFIG: &str = "RESOURCE_CONFIG";
pub const ITEM_MAP: &str = "item_map";
pub const WORKSPACE_IDS: &str = "workspace_ids";

/// One output variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub key: &'static str,
    pub value: String,
}

impl Output {
    fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Serialize a result into ordered output variables.
///
/// Only fails if a result value cannot be serialized, which indicates a
/// bug upstream rather than bad input.
pub fn emit(result: &ActionResult) -> Result<Vec<Output>> {
    let workspace_ids = result.workspace_ids.join(",");

    match &result.details {
        ActionDetails::Created {
            user_defined_deployment_name,
            item_map,
        } => Ok(vec![
            Output::new(RESOURCE_OWNER, &result.owner),
            Output::new(DEPLOYMENT_NAME, &result.deployment_name),
            Output::new(USER_DEFINED_DEPLOYMENT_NAME, user_defined_deployment_name),
            Output::new(ITEM_MAP, serde_json::to_string(item_map)?),
            Output::new(WORKSPACE_IDS, workspace_ids),
        ]),
        ActionDetails::Existing { resource_config } => Ok(vec![
            Output::new(RESOURCE_OWNER, &result.owner),
            Output::new(RESOURCE_CONFIG, resource_config.to_json()?),
            Output::new(DEPLOYMENT_NAME, &result.deployment_name),
            Output::new(WORKSPACE_IDS, workspace_ids),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ValidatedAction;
    use crate::config::ActionInputs;
    use crate::types::ActionKind;
    use serde_json::{Value, json};

    const CONFIG: &str = r#"{"entries":[
        {"type":"s3","resource_name":"bucket","region":"us-east-1"},
        {"type":"rds","resource_name":"db"}
    ]}"#;

    fn outputs(action: ActionKind, inputs: ActionInputs) -> Vec<Output> {
        let result = ValidatedAction::validate(action, &inputs)
            .unwrap()
            .process()
            .unwrap();
        emit(&result).unwrap()
    }

    fn keys(outputs: &[Output]) -> Vec<&'static str> {
        outputs.iter().map(|o| o.key).collect()
    }

    fn value<'a>(outputs: &'a [Output], key: &str) -> &'a str {
        &outputs.iter().find(|o| o.key == key).unwrap().value
    }

    #[test]
    fn test_emit_create() {
        let out = outputs(
            ActionKind::Create,
            ActionInputs {
                execution_id: Some("abc-123".to_string()),
                triggered_by_email: Some("u@x.com".to_string()),
                resource_config: Some(CONFIG.to_string()),
                ..Default::default()
            },
        );

        assert_eq!(
            keys(&out),
            vec![
                "RESOURCE_OWNER",
                "DEPLOYMENT_NAME",
                "USER_DEFINED_DEPLOYMENT_NAME",
                "item_map",
                "workspace_ids"
            ]
        );
        assert_eq!(value(&out, RESOURCE_OWNER), "user:account/u@x.com");
        assert_eq!(value(&out, DEPLOYMENT_NAME), "deployment_abc_123");
        assert_eq!(value(&out, USER_DEFINED_DEPLOYMENT_NAME), "deployment_abc_123");
        assert_eq!(
            value(&out, WORKSPACE_IDS),
            "s3-bucket-deployment_abc_123,rds-db-deployment_abc_123"
        );

        let item_map: Value = serde_json::from_str(value(&out, ITEM_MAP)).unwrap();
        assert_eq!(
            item_map,
            json!([
                {"s3-bucket-deployment_abc_123": {
                    "type": "s3",
                    "resource_name": "bucket",
                    "region": "us-east-1",
                    "cdk_deployment_owner": "user:account/u@x.com",
                    "cdk_deployment_id": "deployment_abc_123"
                }},
                {"rds-db-deployment_abc_123": {
                    "type": "rds",
                    "resource_name": "db",
                    "cdk_deployment_owner": "user:account/u@x.com",
                    "cdk_deployment_id": "deployment_abc_123"
                }}
            ])
        );
        assert!(!value(&out, ITEM_MAP).contains(' '));
    }

    #[test]
    fn test_emit_update() {
        let out = outputs(
            ActionKind::Update,
            ActionInputs {
                primary_owner: Some("user:account/u@x.com".to_string()),
                deployment_name: Some("deployment_abc_123".to_string()),
                component_name: Some("rds-db-deployment_abc_123".to_string()),
                resource_config: Some(CONFIG.to_string()),
                ..Default::default()
            },
        );

        assert_eq!(
            keys(&out),
            vec!["RESOURCE_OWNER", "RESOURCE_CONFIG", "DEPLOYMENT_NAME", "workspace_ids"]
        );
        assert_eq!(value(&out, WORKSPACE_IDS), "rds-db-deployment_abc_123");
        assert_eq!(
            value(&out, RESOURCE_CONFIG),
            r#"{"entries":[{"type":"s3","resource_name":"bucket","region":"us-east-1"},{"type":"rds","resource_name":"db"}]}"#
        );
    }

    #[test]
    fn test_emit_delete_has_update_keys() {
        let out = outputs(
            ActionKind::Delete,
            ActionInputs {
                primary_owner: Some("user:account/u@x.com".to_string()),
                deployment_name: Some("deployment_abc_123".to_string()),
                resource_config: Some(CONFIG.to_string()),
                ..Default::default()
            },
        );

        assert_eq!(
            keys(&out),
            vec!["RESOURCE_OWNER", "RESOURCE_CONFIG", "DEPLOYMENT_NAME", "workspace_ids"]
        );
        assert_eq!(
            value(&out, WORKSPACE_IDS),
            "s3-bucket-deployment_abc_123,rds-db-deployment_abc_123"
        );
    }
}
