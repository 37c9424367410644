//! Identifier derivation.
//!
//! Workspace IDs are never stored: update and delete recompute them with
//! [`derive_workspace_id`], so the formula must stay the same for every
//! action.

use crate::error::{Error, Result};
use crate::types::ResourceEntry;

const OWNER_PREFIX: &str = "user:account/";
const DEPLOYMENT_PREFIX: &str = "deployment_";

/// Owner string for the user who triggered the pipeline.
pub fn derive_owner(email: &str) -> Result<String> {
    if email.trim().is_empty() {
        return Err(Error::validation(
            "triggered_by_email is required for create action",
        ));
    }
    Ok(format!("{OWNER_PREFIX}{email}"))
}

/// Deployment name for a pipeline execution.
pub fn derive_deployment_name(execution_id: &str) -> Result<String> {
    if execution_id.trim().is_empty() {
        return Err(Error::validation("execution_id is required for create action"));
    }
    Ok(format!("{DEPLOYMENT_PREFIX}{}", sanitize(execution_id)))
}

/// Workspace ID for one resource within a deployment.
pub fn derive_workspace_id(entry: &ResourceEntry, deployment_name: &str) -> String {
    format!(
        "{}-{}-{}",
        entry.resource_type, entry.resource_name, deployment_name
    )
}

/// Lower-case and replace anything outside `[a-z0-9_]` with `_`.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            _ => '_',
        })
        .collect()
}
