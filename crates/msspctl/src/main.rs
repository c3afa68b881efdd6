use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use msspctl_core::Config;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;
mod progress;

use cli::{Cli, Commands};
use connection::ConnectionManager;
use error::{CliDiagnostic, CliError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    let (config, config_path) = match load_config(cli.config_file.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            CliDiagnostic::error("could not load configuration")
                .detail(&format!("{:#}", e))
                .tip(
                    "Check the file, or start over with",
                    &["msspctl profile set <name> --region <region>"],
                )
                .print();
            std::process::exit(CliError::from(e).exit_code());
        }
    };

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    debug!(
        "Creating ConnectionManager with config_path: {:?}",
        config_path
    );
    let conn_mgr = ConnectionManager::with_config_path(config, config_path)
        .with_max_wait(cli.max_wait.map(Duration::from_secs))
        .with_cancellation(cancel);

    if let Err(e) = execute_command(&cli, &conn_mgr).await {
        e.print_diagnostic();
        std::process::exit(e.exit_code());
    }
}

/// Load configuration from the explicit path or the default location
fn load_config(config_file: Option<&str>) -> anyhow::Result<(Config, Option<PathBuf>)> {
    match config_file {
        Some(config_file) => {
            let path = PathBuf::from(config_file);
            debug!("Loading config from explicit path: {:?}", path);
            let config = Config::load_from_path(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok((config, Some(path)))
        }
        None => {
            debug!("Loading config from default location");
            let config = Config::load().context("Failed to read the default config file")?;
            Ok((config, None))
        }
    }
}

/// Cancel in-flight waits on Ctrl-C; the remote operation keeps running
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, cancelling");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
        }
    });
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "msspctl=warn,msspctl_core=warn",
            1 => "msspctl=info,msspctl_core=info",
            2 => "msspctl=debug,msspctl_core=debug",
            _ => "msspctl=trace,msspctl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    // Logs go to stderr so `-o json` output stays parseable
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<(), CliError> {
    info!("Command: {}", format_command(&cli.command));

    let profile = cli.profile.as_deref();
    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Version => {
            debug!("Showing version information");
            match cli.output {
                cli::OutputFormat::Json | cli::OutputFormat::Table => {
                    let output_data = serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "name": env!("CARGO_PKG_NAME"),
                    });
                    let fmt = if cli.output.is_json() {
                        output::OutputFormat::Json
                    } else {
                        output::OutputFormat::Table
                    };
                    output::print_output(&output_data, fmt)
                }
                cli::OutputFormat::Auto => {
                    println!("msspctl {}", env!("CARGO_PKG_VERSION"));
                    Ok(())
                }
            }
        }

        Commands::Profile(profile_cmd) => {
            debug!("Executing profile command");
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, cli.output).await
        }

        Commands::Tenant(cmd) => {
            commands::tenant::handle_tenant_command(cmd, conn_mgr, profile, cli.output).await
        }

        Commands::Transaction(cmd) => {
            commands::operation::handle_transaction_command(cmd, conn_mgr, profile, cli.output)
                .await
        }

        Commands::Task(cmd) => {
            commands::operation::handle_task_command(cmd, conn_mgr, profile, cli.output).await
        }

        Commands::Upgrade(cmd) => {
            commands::upgrade::handle_upgrade_command(cmd, conn_mgr, profile, cli.output).await
        }

        Commands::Backup(cmd) => {
            commands::backup::handle_backup_command(cmd, conn_mgr, profile, cli.output).await
        }

        Commands::Device(cmd) => {
            commands::device::handle_device_command(cmd, conn_mgr, profile, cli.output).await
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => warn!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// Short command name for logs, without arguments that could carry secrets
fn format_command(command: &Commands) -> &'static str {
    match command {
        Commands::Tenant(cli::TenantCommands::Create { .. }) => "tenant create",
        Commands::Tenant(cli::TenantCommands::ProvisionCdfmc { .. }) => "tenant provision-cdfmc",
        Commands::Tenant(cli::TenantCommands::AddUsers { .. }) => "tenant add-users",
        Commands::Tenant(cli::TenantCommands::Token { .. }) => "tenant token",
        Commands::Transaction(_) => "transaction wait",
        Commands::Task(_) => "task wait",
        Commands::Upgrade(cli::UpgradeCommands::Versions { .. }) => "upgrade versions",
        Commands::Upgrade(cli::UpgradeCommands::Start { .. }) => "upgrade start",
        Commands::Upgrade(cli::UpgradeCommands::Wait { .. }) => "upgrade wait",
        Commands::Backup(_) => "backup create",
        Commands::Device(_) => "device onboard-ztp",
        Commands::Profile(_) => "profile",
        Commands::Version => "version",
    }
}
