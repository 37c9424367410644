mod cli;
mod sink;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use deploykit::{ActionDetails, LogLevel, PartialConfig, Plugin, PluginConfig, RunOutcome};
use std::io;
use std::process::ExitCode;

/// Display width for long output values in the summary.
const SUMMARY_VALUE_WIDTH: usize = 80;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Command::Completions { shell }) = &cli.command {
        generate(*shell, &mut Cli::command(), "deploy-plugin", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let env = PartialConfig::from_env(std::env::vars())?;
    let partial = deploykit::merge(cli.settings.into_partial(), env);

    init_logging(&partial, cli.verbose, cli.quiet);

    let config = PluginConfig::resolve(partial)?;
    let quiet = cli.quiet;

    if !quiet {
        ui::header(&format!("Deployment plugin: {}", config.action));
        ui::kv("Retry attempts", &config.retry_attempts.to_string());
        ui::kv("Timeout", &format!("{}s", config.timeout.as_secs()));
        if config.dry_run {
            ui::warn("Dry run: outputs will not be written to the output file");
        }
    }

    let plugin = Plugin::new(config);
    let outcome = plugin.run()?;
    let config = plugin.config();

    if config.debug_mode {
        log::debug!("Result: {}", serde_json::to_string(&outcome.result)?);
        for output in &outcome.outputs {
            log::debug!("Output {}={}", output.key, output.value);
        }
    }

    let output_file = match (&config.output_file, config.dry_run) {
        (Some(path), false) => Some(path.as_path()),
        (Some(path), true) => {
            log::info!("Dry run, skipping write to {}", path.display());
            None
        }
        (None, _) => {
            log::debug!("No output file configured");
            None
        }
    };
    sink::publish(&mut io::stdout().lock(), &outcome.outputs, output_file)?;

    if !quiet {
        summarize(&outcome);
    }

    Ok(())
}

/// Set up `env_logger` from the merged settings.
///
/// Runs before the configuration is resolved so warnings raised while
/// resolving are visible.
fn init_logging(partial: &PartialConfig, verbose: u8, quiet: bool) {
    let debug_mode = partial.debug_mode.unwrap_or(false);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_filter(partial, verbose, quiet));

    if debug_mode {
        builder.format_timestamp_millis().format_target(true);
    } else {
        builder.format_timestamp(None).format_target(false);
    }

    builder.init();
}

fn log_filter(partial: &PartialConfig, verbose: u8, quiet: bool) -> log::LevelFilter {
    if partial.debug_mode.unwrap_or(false) {
        return log::LevelFilter::Debug;
    }
    if quiet {
        return log::LevelFilter::Error;
    }

    let configured = partial
        .log_level
        .as_deref()
        .and_then(LogLevel::parse)
        .unwrap_or_default()
        .to_level_filter();

    let requested = match verbose {
        0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    configured.max(requested)
}

fn summarize(outcome: &RunOutcome) {
    let result = &outcome.result;

    ui::success(&format!(
        "{} completed for {} ({} workspace{})",
        result.action,
        result.deployment_name,
        result.workspace_ids.len(),
        if result.workspace_ids.len() == 1 { "" } else { "s" }
    ));
    ui::kv("Owner", &result.owner);
    if let ActionDetails::Created {
        user_defined_deployment_name,
        ..
    } = &result.details
    {
        ui::kv("Display name", user_defined_deployment_name);
    }
    for id in &result.workspace_ids {
        ui::dim(&ui::truncate_value(id, SUMMARY_VALUE_WIDTH));
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<deploykit::Error>() {
        Some(e) => {
            let category = e.category();
            ui::error(&format!("{}: {e}", category.description()));
            ui::info(category.advice());
        }
        None => ui::error(&format!("Unexpected error: {err:#}")),
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<deploykit::Error>()
        .map_or(1, deploykit::Error::exit_code)
}
