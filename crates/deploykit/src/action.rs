//! Action processing.
//!
//! Each run validates inputs once into a [`ValidatedAction`], then calls
//! [`ValidatedAction::process`] (possibly several times under the retry
//! executor). Processing is a pure function of the validated inputs.

use crate::config::ActionInputs;
use crate::defaults::DefaultsLayering;
use crate::error::{Error, Result};
use crate::identity::{derive_deployment_name, derive_owner, derive_workspace_id};
use crate::resource_config;
use crate::types::{
    ActionDetails, ActionKind, ActionResult, ResourceConfig, WorkspaceItem, WorkspaceMapping,
};

/// Attribute added to every `item_map` entry with the deployment owner.
pub const OWNER_ATTRIBUTE: &str = "cdk_deployment_owner";

/// Attribute added to every `item_map` entry with the deployment name.
pub const DEPLOYMENT_ATTRIBUTE: &str = "cdk_deployment_id";

/// Validated inputs for a create action.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateInputs {
    pub execution_id: String,
    pub triggered_by_email: String,
    pub user_defined_name: Option<String>,
    pub resource_config: ResourceConfig,
}

/// Validated inputs for an update or delete action.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingInputs {
    pub primary_owner: String,
    pub deployment_name: String,
    /// Workspace IDs to restrict output to, if a component filter was given
    pub component_filter: Option<Vec<String>>,
    pub resource_config: ResourceConfig,
}

/// An action whose inputs have passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedAction {
    Create(CreateInputs),
    Update(ExistingInputs),
    Delete(ExistingInputs),
}

impl ValidatedAction {
    /// Validate the inputs required by `action`.
    ///
    /// The resource config is parsed first, so a malformed or empty payload
    /// is reported as a parsing error whatever else is missing.
    pub fn validate(action: ActionKind, inputs: &ActionInputs) -> Result<Self> {
        let raw = inputs.resource_config.as_deref().unwrap_or_default();
        let resource_config = resource_config::parse(raw)?;

        match action {
            ActionKind::Create => Ok(Self::Create(validate_create(inputs, resource_config)?)),
            ActionKind::Update => Ok(Self::Update(validate_existing(
                action,
                inputs,
                resource_config,
            )?)),
            ActionKind::Delete => Ok(Self::Delete(validate_existing(
                action,
                inputs,
                resource_config,
            )?)),
        }
    }

    /// Which action this is.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Create(_) => ActionKind::Create,
            Self::Update(_) => ActionKind::Update,
            Self::Delete(_) => ActionKind::Delete,
        }
    }

    /// The validated resource config.
    pub fn resource_config(&self) -> &ResourceConfig {
        match self {
            Self::Create(inputs) => &inputs.resource_config,
            Self::Update(inputs) | Self::Delete(inputs) => &inputs.resource_config,
        }
    }

    /// Merge configured defaults into the entries of create and update
    /// actions. Delete actions are returned unchanged.
    pub fn apply_defaults(self, layering: &DefaultsLayering<'_>) -> Result<Self> {
        match self {
            Self::Create(mut inputs) => {
                inputs.resource_config = layering.apply(inputs.resource_config)?;
                Ok(Self::Create(inputs))
            }
            Self::Update(mut inputs) => {
                inputs.resource_config = layering.apply(inputs.resource_config)?;
                Ok(Self::Update(inputs))
            }
            Self::Delete(inputs) => Ok(Self::Delete(inputs)),
        }
    }

    /// Derive the identifiers for this action.
    pub fn process(&self) -> Result<ActionResult> {
        match self {
            Self::Create(inputs) => process_create(inputs),
            Self::Update(inputs) => process_existing(ActionKind::Update, inputs),
            Self::Delete(inputs) => process_existing(ActionKind::Delete, inputs),
        }
    }
}

// ============================================================================
// Create
// ============================================================================

fn validate_create(inputs: &ActionInputs, resource_config: ResourceConfig) -> Result<CreateInputs> {
    let execution_id = required(&inputs.execution_id, "execution_id", ActionKind::Create)?;
    let triggered_by_email =
        required(&inputs.triggered_by_email, "triggered_by_email", ActionKind::Create)?;
    check_single_line(&triggered_by_email, "triggered_by_email")?;

    let user_defined_name = inputs
        .user_defined_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    if let Some(name) = &user_defined_name {
        check_single_line(name, "user_defined_name")?;
    }

    Ok(CreateInputs {
        execution_id,
        triggered_by_email,
        user_defined_name,
        resource_config,
    })
}

fn process_create(inputs: &CreateInputs) -> Result<ActionResult> {
    log::info!("Starting CREATE action processing...");

    let owner = derive_owner(&inputs.triggered_by_email)?;
    let deployment_name = derive_deployment_name(&inputs.execution_id)?;
    log::info!("Generated deployment name: {deployment_name}");

    let user_defined_deployment_name = inputs
        .user_defined_name
        .clone()
        .unwrap_or_else(|| deployment_name.clone());

    let entries = inputs.resource_config.entries();
    let mut item_map: WorkspaceMapping = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let workspace_id = derive_workspace_id(entry, &deployment_name);
        log::debug!(
            "Entry {}/{}: workspace '{workspace_id}'",
            idx + 1,
            entries.len()
        );
        item_map.push(WorkspaceItem {
            workspace_id,
            entry: entry
                .clone()
                .with_attribute(OWNER_ATTRIBUTE, owner.as_str())
                .with_attribute(DEPLOYMENT_ATTRIBUTE, deployment_name.as_str()),
        });
    }

    let workspace_ids: Vec<String> = item_map.iter().map(|i| i.workspace_id.clone()).collect();
    log::info!("Created {} workspace(s)", workspace_ids.len());

    Ok(ActionResult {
        action: ActionKind::Create,
        owner,
        deployment_name,
        workspace_ids,
        details: ActionDetails::Created {
            user_defined_deployment_name,
            item_map,
        },
    })
}

// ============================================================================
// Update / Delete
// ============================================================================

fn validate_existing(
    action: ActionKind,
    inputs: &ActionInputs,
    resource_config: ResourceConfig,
) -> Result<ExistingInputs> {
    let primary_owner = required(&inputs.primary_owner, "primary_owner", action)?;
    check_well_formed(&primary_owner, "primary_owner")?;

    let deployment_name = required(&inputs.deployment_name, "deployment_name", action)?;
    check_well_formed(&deployment_name, "deployment_name")?;

    let component_filter = inputs
        .component_name
        .as_deref()
        .map(parse_component_filter)
        .filter(|targets| !targets.is_empty());

    if let Some(targets) = &component_filter {
        let derived: Vec<String> = resource_config
            .entries()
            .iter()
            .map(|entry| derive_workspace_id(entry, &deployment_name))
            .collect();
        let missing: Vec<String> = targets
            .iter()
            .filter(|target| !derived.contains(*target))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::ComponentNotFound { missing });
        }
    }

    Ok(ExistingInputs {
        primary_owner,
        deployment_name,
        component_filter,
        resource_config,
    })
}

fn process_existing(action: ActionKind, inputs: &ExistingInputs) -> Result<ActionResult> {
    log::info!(
        "Starting {} action processing...",
        action.as_str().to_uppercase()
    );

    let workspace_ids: Vec<String> = inputs
        .resource_config
        .entries()
        .iter()
        .map(|entry| derive_workspace_id(entry, &inputs.deployment_name))
        .filter(|id| match &inputs.component_filter {
            Some(targets) => targets.contains(id),
            None => true,
        })
        .collect();

    log::info!("Resource owner: {}", inputs.primary_owner);
    log::info!("Deployment name: {}", inputs.deployment_name);
    log::info!("Workspace IDs: {}", workspace_ids.join(","));

    Ok(ActionResult {
        action,
        owner: inputs.primary_owner.clone(),
        deployment_name: inputs.deployment_name.clone(),
        workspace_ids,
        details: ActionDetails::Existing {
            resource_config: inputs.resource_config.clone(),
        },
    })
}

/// Split a component filter on commas, dropping blanks.
pub fn parse_component_filter(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Helpers
// ============================================================================

/// Blank values count as missing. Present values are returned as given.
fn required(value: &Option<String>, field: &str, action: ActionKind) -> Result<String> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(Error::validation(format!(
            "{field} is required for {action} action"
        ))),
    }
}

/// Identifiers supplied by the caller must not contain whitespace, control
/// characters, or commas (which would corrupt comma-joined outputs).
fn check_well_formed(value: &str, field: &str) -> Result<()> {
    if let Some(bad) = value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || *c == ',')
    {
        return Err(Error::validation(format!(
            "{field} is malformed: unexpected character {bad:?} in '{value}'"
        )));
    }
    Ok(())
}

/// Values emitted unescaped as `KEY=value` lines must not span lines.
fn check_single_line(value: &str, field: &str) -> Result<()> {
    if value.chars().any(char::is_control) {
        return Err(Error::validation(format!(
            "{field} must be a single line without control characters"
        )));
    }
    Ok(())
}
