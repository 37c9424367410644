//! Plugin configuration.
//!
//! Settings arrive from two sources: command-line flags and `PLUGIN_*`
//! environment variables. Each source is read into a [`PartialConfig`],
//! the two are combined with [`merge`] (flags win), and the result is
//! checked by [`PluginConfig::resolve`].

use crate::defaults::{DEFAULT_PROJECT_NAME, DefaultsSettings};
use crate::error::{Error, Result};
use crate::types::{ActionKind, RetryConfig};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-attempt timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Environment variable the orchestrator uses for the step output file.
pub const OUTPUT_FILE_ENV: &str = "DRONE_OUTPUT";

// ============================================================================
// Log Level
// ============================================================================

/// Logging verbosity requested by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parse a level name (case-insensitive). Returns `None` if unknown.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARNING" | "WARN" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Warning => log::LevelFilter::Warn,
            Self::Error => log::LevelFilter::Error,
        }
    }
}

// ============================================================================
// Partial Config
// ============================================================================

/// Settings from one source. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialConfig {
    pub action: Option<String>,
    pub log_level: Option<String>,
    pub debug_mode: Option<bool>,
    pub dry_run: Option<bool>,
    pub timeout: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub execution_id: Option<String>,
    pub triggered_by_email: Option<String>,
    pub user_defined_name: Option<String>,
    pub primary_owner: Option<String>,
    pub deployment_name: Option<String>,
    pub component_name: Option<String>,
    pub resource_config: Option<String>,
    pub products_dir: Option<PathBuf>,
    pub overrides_dir: Option<PathBuf>,
    pub project_name: Option<String>,
    pub cloud_project: Option<String>,
    pub skip_missing_defaults: Option<bool>,
    pub output_file: Option<PathBuf>,
}

impl PartialConfig {
    /// Read settings from environment variables.
    ///
    /// Takes the variables as an iterator so callers can pass
    /// `std::env::vars()` or a fixed list in tests. Empty values count as
    /// unset.
    pub fn from_env<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();

        let string = |key: &str| vars.get(key).cloned();
        let path = |key: &str| vars.get(key).map(PathBuf::from);

        Ok(Self {
            action: string("PLUGIN_ACTION"),
            log_level: string("PLUGIN_LOG_LEVEL"),
            debug_mode: parse_env(&vars, "PLUGIN_DEBUG_MODE", parse_bool)?,
            dry_run: parse_env(&vars, "PLUGIN_DRY_RUN", parse_bool)?,
            timeout: parse_env(&vars, "PLUGIN_TIMEOUT", parse_number)?,
            retry_attempts: parse_env(&vars, "PLUGIN_RETRY_ATTEMPTS", parse_number)?,
            execution_id: string("PLUGIN_EXECUTION_ID"),
            triggered_by_email: string("PLUGIN_TRIGGERED_BY_EMAIL"),
            user_defined_name: string("PLUGIN_USER_DEFINED_NAME"),
            primary_owner: string("PLUGIN_PRIMARY_OWNER"),
            deployment_name: string("PLUGIN_DEPLOYMENT_NAME"),
            component_name: string("PLUGIN_COMPONENT_NAME"),
            resource_config: string("PLUGIN_RESOURCE_CONFIG"),
            products_dir: path("PLUGIN_PRODUCTS_DIR"),
            overrides_dir: path("PLUGIN_OVERRIDES_DIR"),
            project_name: string("PLUGIN_PROJECT_NAME"),
            cloud_project: string("PLUGIN_CLOUD_PROJECT"),
            skip_missing_defaults: parse_env(&vars, "PLUGIN_SKIP_MISSING_DEFAULTS", parse_bool)?,
            output_file: path(OUTPUT_FILE_ENV),
        })
    }
}

/// Combine two sources field by field; `flags` take precedence over `env`.
pub fn merge(flags: PartialConfig, env: PartialConfig) -> PartialConfig {
    PartialConfig {
        action: flags.action.or(env.action),
        log_level: flags.log_level.or(env.log_level),
        debug_mode: flags.debug_mode.or(env.debug_mode),
        dry_run: flags.dry_run.or(env.dry_run),
        timeout: flags.timeout.or(env.timeout),
        retry_attempts: flags.retry_attempts.or(env.retry_attempts),
        execution_id: flags.execution_id.or(env.execution_id),
        triggered_by_email: flags.triggered_by_email.or(env.triggered_by_email),
        user_defined_name: flags.user_defined_name.or(env.user_defined_name),
        primary_owner: flags.primary_owner.or(env.primary_owner),
        deployment_name: flags.deployment_name.or(env.deployment_name),
        component_name: flags.component_name.or(env.component_name),
        resource_config: flags.resource_config.or(env.resource_config),
        products_dir: flags.products_dir.or(env.products_dir),
        overrides_dir: flags.overrides_dir.or(env.overrides_dir),
        project_name: flags.project_name.or(env.project_name),
        cloud_project: flags.cloud_project.or(env.cloud_project),
        skip_missing_defaults: flags.skip_missing_defaults.or(env.skip_missing_defaults),
        output_file: flags.output_file.or(env.output_file),
    }
}

fn parse_env<T>(
    vars: &HashMap<String, String>,
    key: &str,
    parse: fn(&str) -> std::result::Result<T, String>,
) -> Result<Option<T>> {
    vars.get(key)
        .map(|raw| parse(raw).map_err(|e| Error::configuration(format!("{key}: {e}"))))
        .transpose()
}

/// Parse a boolean setting (`true/1/yes/on`, `false/0/no/off`).
pub fn parse_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("invalid boolean value '{other}'")),
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str) -> std::result::Result<T, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("expected a non-negative integer, got '{}'", raw.trim()))
}

// ============================================================================
// Resolved Config
// ============================================================================

/// Raw, action-specific inputs. Checked by the action processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionInputs {
    pub execution_id: Option<String>,
    pub triggered_by_email: Option<String>,
    pub user_defined_name: Option<String>,
    pub primary_owner: Option<String>,
    pub deployment_name: Option<String>,
    pub component_name: Option<String>,
    pub resource_config: Option<String>,
}

/// Fully resolved plugin configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    pub action: ActionKind,
    pub log_level: LogLevel,
    pub debug_mode: bool,
    pub dry_run: bool,
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub inputs: ActionInputs,
    pub defaults: DefaultsSettings,
    pub output_file: Option<PathBuf>,
}

impl PluginConfig {
    /// Check a merged configuration and fill in defaults.
    pub fn resolve(partial: PartialConfig) -> Result<Self> {
        let action = match non_blank(partial.action) {
            Some(action) => action.parse::<ActionKind>()?,
            None => {
                return Err(Error::configuration(
                    "action is required (set --action or PLUGIN_ACTION)",
                ));
            }
        };

        let log_level = match non_blank(partial.log_level) {
            Some(raw) => LogLevel::parse(&raw).unwrap_or_else(|| {
                log::warn!("Invalid log level '{raw}', using INFO");
                LogLevel::Info
            }),
            None => LogLevel::default(),
        };

        let timeout_secs = partial.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::configuration("timeout must be greater than 0 seconds"));
        }

        let defaults = DefaultsSettings {
            products_dir: partial.products_dir,
            overrides_dir: partial.overrides_dir,
            project_name: non_blank(partial.project_name)
                .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
            cloud_project: non_blank(partial.cloud_project),
            skip_missing_defaults: partial.skip_missing_defaults.unwrap_or(true),
        };

        Ok(Self {
            action,
            log_level,
            debug_mode: partial.debug_mode.unwrap_or(false),
            dry_run: partial.dry_run.unwrap_or(false),
            timeout: Duration::from_secs(timeout_secs),
            retry_attempts: partial.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            inputs: ActionInputs {
                execution_id: non_blank(partial.execution_id),
                triggered_by_email: non_blank(partial.triggered_by_email),
                user_defined_name: non_blank(partial.user_defined_name),
                primary_owner: non_blank(partial.primary_owner),
                deployment_name: non_blank(partial.deployment_name),
                component_name: non_blank(partial.component_name),
                resource_config: non_blank(partial.resource_config),
            },
            defaults,
            output_file: partial.output_file,
        })
    }

    /// Retry policy for action processing.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.retry_attempts, self.timeout)
    }

    /// Effective log filter; debug mode always logs at debug level.
    pub fn level_filter(&self) -> log::LevelFilter {
        if self.debug_mode {
            log::LevelFilter::Debug
        } else {
            self.log_level.to_level_filter()
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
