//! # deploykit
//!
//! Deployment identity engine for CI/CD pipeline steps.
//!
//! This crate provides functionality for:
//! - Parsing declarative resource configs
//! - Deriving owners, deployment names, and per-resource workspace IDs
//! - Running create, update, and delete actions with retry and timeout
//! - Layering product defaults and overrides onto resource entries
//! - Emitting results as key/value outputs for downstream steps
//!
//! ## Example
//!
//! ```no_run
//! use deploykit::{PartialConfig, Plugin, PluginConfig, merge};
//!
//! let env = PartialConfig::from_env(std::env::vars()).expect("bad environment");
//! let config = PluginConfig::resolve(merge(PartialConfig::default(), env)).expect("bad config");
//!
//! let outcome = Plugin::new(config).run().expect("action failed");
//! for output in &outcome.outputs {
//!     println!("{}={}", output.key, output.value);
//! }
//! ```
//!
//! ## Retry Logic
//!
//! Runtime failures (including attempts that exceed the timeout) are retried
//! with exponential backoff. Parsing, validation, and configuration errors
//! are never retried. See [`retry::with_retry`].

#![warn(missing_docs)]
#![warn(clippy::all)]

#[allow(missing_docs)]
pub mod action;
#[allow(missing_docs)]
pub mod config;
#[allow(missing_docs)]
pub mod defaults;
pub mod error;
pub mod identity;
#[allow(missing_docs)]
pub mod output;
pub mod resource_config;
pub mod retry;
#[allow(missing_docs)]
pub mod types;

pub use action::ValidatedAction;
pub use config::{LogLevel, PartialConfig, PluginConfig, merge};
pub use defaults::{DefaultsLayering, DefaultsSettings};
pub use error::{Error, ErrorCategory, Result};
pub use output::{Output, emit};
pub use types::{
    ActionDetails, ActionKind, ActionResult, ResourceConfig, ResourceEntry, RetryConfig,
    WorkspaceItem, WorkspaceMapping,
};

/// Result of a successful plugin run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Derived identifiers
    pub result: ActionResult,
    /// Output variables, in emission order
    pub outputs: Vec<Output>,
}

/// Runs one action from a resolved configuration.
pub struct Plugin {
    config: PluginConfig,
}

impl Plugin {
    /// Create a plugin for a resolved configuration.
    pub fn new(config: PluginConfig) -> Self {
        Self { config }
    }

    /// The configuration this plugin runs with.
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Validate inputs and apply configured defaults.
    pub fn validate(&self) -> Result<ValidatedAction> {
        log::debug!("Validating {} inputs...", self.config.action);
        let action = ValidatedAction::validate(self.config.action, &self.config.inputs)?;
        let action = action.apply_defaults(&DefaultsLayering::new(&self.config.defaults))?;
        log::info!(
            "Configuration validation completed ({} resource entries)",
            action.resource_config().len()
        );
        Ok(action)
    }

    /// Run the action, reporting retries through the log.
    pub fn run(&self) -> Result<RunOutcome> {
        self.run_with_callback(&retry::LogCallback)
    }

    /// Run the action with a custom retry callback.
    pub fn run_with_callback(&self, callback: &dyn retry::RetryCallback) -> Result<RunOutcome> {
        let action = self.validate()?;

        if self.config.dry_run {
            log::info!("DRY RUN MODE ENABLED - no changes will be recorded");
        }

        let retry_config = self.config.retry_config();
        let result = retry::with_retry(&retry_config, Some(callback), || action.process())?;
        let outputs = emit(&result)?;

        Ok(RunOutcome { result, outputs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActionInputs;

    fn create_config(dry_run: bool) -> PluginConfig {
        PluginConfig::resolve(PartialConfig {
            action: Some("create".to_string()),
            dry_run: Some(dry_run),
            execution_id: Some("abc-123".to_string()),
            triggered_by_email: Some("u@x.com".to_string()),
            resource_config: Some(
                r#"{"entries":[{"type":"s3","resource_name":"bucket"}]}"#.to_string(),
            ),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_run_create() {
        let outcome = Plugin::new(create_config(false)).run().unwrap();
        assert_eq!(outcome.result.deployment_name, "deployment_abc_123");
        assert_eq!(outcome.outputs.len(), 5);
    }

    #[test]
    fn test_dry_run_matches_normal_run() {
        let normal = Plugin::new(create_config(false)).run().unwrap();
        let dry = Plugin::new(create_config(true)).run().unwrap();

        assert_eq!(normal, dry);
        assert_eq!(
            serde_json::to_vec(&normal.result).unwrap(),
            serde_json::to_vec(&dry.result).unwrap()
        );
    }

    #[test]
    fn test_validation_error_surfaces_without_outputs() {
        let mut config = create_config(false);
        config.inputs = ActionInputs {
            execution_id: None,
            ..config.inputs
        };

        let err = Plugin::new(config).run().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_update_uses_supplied_identity() {
        let config = PluginConfig::resolve(PartialConfig {
            action: Some("update".to_string()),
            primary_owner: Some("user:account/u@x.com".to_string()),
            deployment_name: Some("deployment_abc_123".to_string()),
            component_name: Some("s3-bucket-deployment_abc_123".to_string()),
            resource_config: Some(
                r#"{"entries":[{"type":"s3","resource_name":"bucket"}]}"#.to_string(),
            ),
            ..Default::default()
        })
        .unwrap();

        let outcome = Plugin::new(config).run().unwrap();
        assert_eq!(outcome.result.owner, "user:account/u@x.com");
        assert_eq!(
            outcome.result.workspace_ids,
            vec!["s3-bucket-deployment_abc_123"]
        );
    }
}
