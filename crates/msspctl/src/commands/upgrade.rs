//! Device upgrade commands

use msspctl_core::api::{UpgradeDevicesRequest, UpgradeRunDetail};
use msspctl_core::workflows;
use msspctl_core::{OperationHandle, OperationKind, OperationStatus};
use tracing::debug;

use crate::cli::{OutputFormat, UpgradeCommands};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output;
use crate::progress::{StatusSpinner, UpgradeRunView, format_state, upgrade_run_table};

use super::{print_status, report_wait};

pub async fn handle_upgrade_command(
    cmd: &UpgradeCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        UpgradeCommands::Versions { device_uids } => {
            versions(conn_mgr, profile_name, device_uids, output_format).await
        }
        UpgradeCommands::Start {
            device_uids,
            version,
            name,
        } => {
            let request = UpgradeDevicesRequest {
                name: name.clone().unwrap_or_else(|| {
                    format!("Upgrade FTDs on {}", chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"))
                }),
                device_uids: device_uids.clone(),
                software_version: version.clone(),
            };
            start(conn_mgr, profile_name, &request, output_format).await
        }
        UpgradeCommands::Wait { uid, wait } => {
            let client = conn_mgr.create_client(profile_name)?;
            let waiter = conn_mgr.waiter_for(OperationKind::UpgradeRun, wait.interval);
            let handle = OperationHandle::upgrade_run(uid);

            let mut view = UpgradeRunView::new(output_format == OutputFormat::Auto);
            let mut last_seen = None;
            let result = workflows::wait_for_upgrade_run(&client, &waiter, &handle, |s| {
                view.update(s);
                last_seen = Some(s.clone());
            })
            .await;
            report_wait(result, last_seen, |s| print_upgrade_result(s, output_format))
        }
    }
}

async fn versions(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    device_uids: &[String],
    output_format: OutputFormat,
) -> CliResult<()> {
    let client = conn_mgr.create_client(profile_name)?;
    let waiter = conn_mgr.waiter_for(OperationKind::TenantTransaction, None);

    let spinner = StatusSpinner::new(
        "compatible version calculation",
        output_format == OutputFormat::Auto,
    );
    let result =
        workflows::compatible_versions(&client, &waiter, device_uids, |s| spinner.update(s)).await;
    spinner.finish(result.is_ok());
    let versions = result?;

    match output_format {
        OutputFormat::Json => output::print_output(&versions, output::OutputFormat::Json),
        OutputFormat::Table => output::print_output(&versions, output::OutputFormat::Table),
        OutputFormat::Auto => {
            if versions.is_empty() {
                println!("No version is compatible with every selected device.");
            }
            for v in &versions {
                if v.is_suggested_version {
                    println!("{} *", v.software_version);
                } else {
                    println!("{}", v.software_version);
                }
            }
            Ok(())
        }
    }
}

async fn start(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    request: &UpgradeDevicesRequest,
    output_format: OutputFormat,
) -> CliResult<()> {
    debug!(
        "Upgrading {} devices to {}",
        request.device_uids.len(),
        request.software_version
    );
    let client = conn_mgr.create_client(profile_name)?;
    let waiter = conn_mgr.waiter_for(OperationKind::UpgradeRun, None);

    let mut view = UpgradeRunView::new(output_format == OutputFormat::Auto);
    let mut last_seen = None;
    let result = workflows::upgrade_devices_and_wait(&client, &waiter, request, |s| {
        view.update(s);
        last_seen = Some(s.clone());
    })
    .await;
    report_wait(result, last_seen, |s| print_upgrade_result(s, output_format))
}

/// Print how an upgrade run ended, identified by its run UID
fn print_upgrade_result(
    status: &OperationStatus<UpgradeRunDetail>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let id = status.detail.as_ref().map_or("-", |d| d.uid.as_str());
    match output_format {
        OutputFormat::Auto => {
            println!("Upgrade run {}: {}", id, format_state(&status.state));
            if let Some(message) = &status.message {
                println!("Message: {}", message);
            }
            Ok(())
        }
        OutputFormat::Table => {
            println!("Upgrade run {}: {}", id, status.state);
            if let Some(message) = &status.message {
                println!("Message: {}", message);
            }
            println!("{}", upgrade_run_table(status));
            Ok(())
        }
        OutputFormat::Json => print_status("upgrade run", Some(id), status, output_format),
    }
}
