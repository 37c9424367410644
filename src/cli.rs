use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use deploykit::PartialConfig;
use deploykit::config::parse_bool;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deploy-plugin")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Pipeline step that derives deployment names, owners, and workspace IDs", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Settings
// ============================================================================

/// Plugin settings. Each one can also come from a `PLUGIN_*` environment
/// variable; a flag always takes precedence.
#[derive(Args, Default)]
pub struct SettingsArgs {
    /// Action to perform: create, update, or delete
    #[arg(long)]
    pub action: Option<String>,

    /// Log level: DEBUG, INFO, WARNING, or ERROR
    #[arg(long)]
    pub log_level: Option<String>,

    /// Verbose log format with timestamps and module names
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_bool)]
    pub debug_mode: Option<bool>,

    /// Derive and print outputs without writing the output file
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_bool)]
    pub dry_run: Option<bool>,

    /// Per-attempt timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Retries after the first failed attempt
    #[arg(long)]
    pub retry_attempts: Option<u32>,

    /// Pipeline execution ID (create)
    #[arg(long)]
    pub execution_id: Option<String>,

    /// Email of the user who triggered the pipeline (create)
    #[arg(long)]
    pub triggered_by_email: Option<String>,

    /// Human-friendly deployment name (create)
    #[arg(long)]
    pub user_defined_name: Option<String>,

    /// Owner of the existing deployment (update, delete)
    #[arg(long)]
    pub primary_owner: Option<String>,

    /// Name of the existing deployment (update, delete)
    #[arg(long)]
    pub deployment_name: Option<String>,

    /// Comma-separated workspace IDs to restrict to (update, delete)
    #[arg(long)]
    pub component_name: Option<String>,

    /// Resource config JSON: {"entries":[{"type":..,"resource_name":..}]}
    #[arg(long)]
    pub resource_config: Option<String>,

    /// Root of the product defaults tree
    #[arg(long = "defaults-products-dir")]
    pub products_dir: Option<PathBuf>,

    /// Root of the overrides tree
    #[arg(long = "defaults-overrides-dir")]
    pub overrides_dir: Option<PathBuf>,

    /// Project directory inside the product defaults tree
    #[arg(long)]
    pub project_name: Option<String>,

    /// Cloud project used to select overrides
    #[arg(long)]
    pub cloud_project: Option<String>,

    /// Keep going without defaults when a defaults file is unreadable
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = parse_bool)]
    pub skip_missing_defaults: Option<bool>,

    /// File to append KEY=value outputs to (default: $DRONE_OUTPUT)
    #[arg(long)]
    pub output_file: Option<PathBuf>,
}

impl SettingsArgs {
    pub fn into_partial(self) -> PartialConfig {
        PartialConfig {
            action: self.action,
            log_level: self.log_level,
            debug_mode: self.debug_mode,
            dry_run: self.dry_run,
            timeout: self.timeout,
            retry_attempts: self.retry_attempts,
            execution_id: self.execution_id,
            triggered_by_email: self.triggered_by_email,
            user_defined_name: self.user_defined_name,
            primary_owner: self.primary_owner,
            deployment_name: self.deployment_name,
            component_name: self.component_name,
            resource_config: self.resource_config,
            products_dir: self.products_dir,
            overrides_dir: self.overrides_dir,
            project_name: self.project_name,
            cloud_project: self.cloud_project,
            skip_missing_defaults: self.skip_missing_defaults,
            output_file: self.output_file,
        }
    }
}
