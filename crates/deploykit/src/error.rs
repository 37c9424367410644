//! Error types for deployment processing.
//!
//! Errors are categorized so the retry executor can tell transient failures
//! from input defects, and so the binary can map each category to a stable
//! process exit code.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Categories of plugin errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed resource-config payload
    Parsing,
    /// Missing or invalid caller input
    Validation,
    /// Missing or contradictory configuration sources
    Configuration,
    /// Failure while processing an action (transient, retryable)
    Runtime,
}

impl ErrorCategory {
    /// Whether this error category is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Runtime)
    }

    /// Process exit code for this category.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Runtime => 1,
            Self::Validation => 2,
            Self::Configuration => 3,
            Self::Parsing => 4,
        }
    }

    /// Get a user-friendly label for this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Parsing => "Parsing error",
            Self::Validation => "Validation error",
            Self::Configuration => "Configuration error",
            Self::Runtime => "Runtime error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Parsing => {
                "Check that PLUGIN_RESOURCE_CONFIG is valid JSON with a non-empty \"entries\" array"
            }
            Self::Validation => "Check the inputs required by the selected action",
            Self::Configuration => "Check the plugin settings and environment variables",
            Self::Runtime => "The action failed after all retries; re-run the step",
        }
    }
}

/// Errors that can occur while running the plugin.
#[derive(Debug, Error)]
pub enum Error {
    /// The resource config could not be parsed
    #[error("invalid resource config: {message}")]
    Parsing {
        /// What was wrong with the payload
        message: String,
    },

    /// A required input is missing or malformed
    #[error("{message}")]
    Validation {
        /// Which input failed and why
        message: String,
    },

    /// A component filter named a workspace that the deployment does not have
    #[error("component(s) not found in deployment: {}", .missing.join(", "))]
    ComponentNotFound {
        /// Filter targets with no matching workspace ID
        missing: Vec<String>,
    },

    /// Configuration is missing or contradictory
    #[error("{message}")]
    Configuration {
        /// Description of the configuration problem
        message: String,
    },

    /// A defaults layer could not be loaded
    #[error("failed to load defaults from {}: {message}", .path.display())]
    DefaultsLayer {
        /// Path of the defaults document
        path: PathBuf,
        /// Why loading failed
        message: String,
    },

    /// Processing failed for a reason unrelated to input shape
    #[error("{message}")]
    Runtime {
        /// Description of the failure
        message: String,
    },

    /// A single attempt ran past its time budget
    #[error("attempt exceeded timeout of {}s (took {:.1}s)", .limit.as_secs(), .elapsed.as_secs_f64())]
    Timeout {
        /// Time the attempt actually took
        elapsed: Duration,
        /// Per-attempt budget
        limit: Duration,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a parsing error.
    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing {
            message: message.into(),
        }
    }

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Shorthand for a runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Parsing { .. } => ErrorCategory::Parsing,
            Error::Validation { .. } | Error::ComponentNotFound { .. } => {
                ErrorCategory::Validation
            }
            Error::Configuration { .. } | Error::DefaultsLayer { .. } => {
                ErrorCategory::Configuration
            }
            Error::Runtime { .. } | Error::Timeout { .. } | Error::Json(_) => {
                ErrorCategory::Runtime
            }
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        self.category().exit_code()
    }
}

/// Result type for plugin operations.
pub type Result<T> = std::result::Result<T, Error>;
