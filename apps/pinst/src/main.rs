//! pinst - pinned installer for single command-line tools
//!
//! Resolves a release, fetches its archive, verifies the digest, places the
//! executable atomically and smoke-tests it, all through the ops crate.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use pinst_config::Config;
use pinst_errors::UserFacingError;
use pinst_events::EventReceiver;
use pinst_ops::{InstallRequest, OperationResult, OpsContextBuilder};
use pinst_types::{ColorChoice, OutputFormat};
use std::path::Path;
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_flag = cli.global.json;

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Application error: {}", e);
            if json_flag {
                print_json_error(&e);
            } else {
                eprintln!("Error: {e}");
            }
            e.exit_code()
        }
    };
    process::exit(code);
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    // 1. file config (or defaults), 2. environment, 3. CLI flags
    let mut config = Config::load_or_default(&cli.global.config).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command);
    config.validate()?;

    let json_mode = cli.global.json || config.general.default_output == OutputFormat::Json;
    init_tracing(json_mode, cli.global.debug, &config.logs_dir());
    info!("Starting pinst v{}", env!("CARGO_PKG_VERSION"));

    let (event_sender, event_receiver) = pinst_events::channel();
    let color = cli.global.color.unwrap_or(config.general.color);
    let ops_ctx = OpsContextBuilder::new()
        .with_config(config)
        .with_event_sender(event_sender)
        .build()?;

    let renderer = OutputRenderer::new(json_mode, color);
    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let correlation = format!("{}:{}", cli.command.name(), identifier(&cli.command));
    let mut event_handler =
        EventHandler::new(colors_enabled, cli.global.debug, json_mode).with_correlation_id(correlation);

    let result =
        execute_command_with_events(cli.command, ops_ctx, event_receiver, &mut event_handler)
            .await?;

    renderer.render_result(&result)?;

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling.
///
/// Ctrl-C cancels the operation's token and keeps waiting for it: a copy in
/// progress stops at the next chunk, deletes its staging file and releases
/// the destination lock before the command returns, so the destination
/// keeps its previous content.
async fn execute_command_with_events(
    command: Commands,
    ops_ctx: pinst_ops::OpsCtx,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let cancel = ops_ctx.cancel.clone();
    let mut command_future = Box::pin(execute_command(command, ops_ctx));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return match result {
                    Err(_) if cancel.is_cancelled() => Err(CliError::Cancelled),
                    other => other,
                };
            }

            Some(event) = event_receiver.recv() => {
                event_handler.handle_event(event);
            }

            _ = &mut ctrl_c, if !cancel.is_cancelled() => {
                info!("Interrupted, waiting for cleanup");
                cancel.cancel();
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    ctx: pinst_ops::OpsCtx,
) -> Result<OperationResult, CliError> {
    match command {
        Commands::Install {
            identifier,
            source,
            dest,
            entry,
            bin,
            no_test,
            ..
        } => {
            let request = InstallRequest {
                destination: dest,
                entry,
                bin,
                skip_smoke_test: no_test,
                ..source.to_request(&identifier)
            };
            let report = pinst_ops::install(&ctx, &request).await?;
            Ok(OperationResult::InstallReport(report))
        }

        Commands::Resolve { identifier, source } => {
            let release = pinst_ops::resolve(&ctx, &source.to_request(&identifier)).await?;
            Ok(OperationResult::Resolved(release))
        }

        Commands::Info {
            identifier,
            formula,
        } => {
            let info = pinst_ops::info(&ctx, &identifier, formula.as_deref()).await?;
            Ok(OperationResult::FormulaInfo(info))
        }
    }
}

fn identifier(command: &Commands) -> &str {
    match command {
        Commands::Install { identifier, .. }
        | Commands::Resolve { identifier, .. }
        | Commands::Info { identifier, .. } => identifier,
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs, command: &Commands) {
    if let Some(color) = &global.color {
        config.general.color = *color;
    }
    if global.json {
        config.general.default_output = OutputFormat::Json;
    }

    if let Commands::Install {
        timeout, retries, ..
    } = command
    {
        if let Some(timeout) = timeout {
            config.network.timeout = *timeout;
        }
        if let Some(retries) = retries {
            config.network.retries = *retries;
        }
    }
}

/// One JSON object on stdout so `--json` consumers always get parseable output
fn print_json_error(error: &CliError) {
    let (stage, code, hint) = match error {
        CliError::Ops(e) => (e.stage(), e.user_code(), e.user_hint()),
        CliError::Cancelled => ("pinst", Some("cancelled"), None),
        CliError::Io(_) => ("pinst", None, None),
    };
    let body = serde_json::json!({
        "type": "Error",
        "data": {
            "stage": stage,
            "kind": error.kind().to_string(),
            "code": code,
            "message": error.to_string().lines().next().unwrap_or_default(),
            "hint": hint,
            "exit_code": error.exit_code(),
        }
    });
    println!("{body}");
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool, log_dir: &Path) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if debug_enabled {
        // structured JSON logs to a timestamped file
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            if !json_mode {
                eprintln!("Warning: Failed to create log directory: {e}");
            }
        }
        let log_file = log_dir.join(format!(
            "pinst-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                            |_| tracing_subscriber::EnvFilter::new("info,pinst=debug,pinst_ops=debug"),
                        ),
                    )
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    // status lines come from the event handler
    tracing_subscriber::fmt()
        .with_writer(std::io::sink)
        .with_env_filter("off")
        .init();
}
