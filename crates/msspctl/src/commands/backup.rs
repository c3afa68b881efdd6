//! cdFMC device backup commands

use msspctl_core::OperationKind;
use msspctl_core::api::DeviceBackupRequest;
use msspctl_core::workflows;
use tracing::debug;

use crate::cli::{BackupCommands, OutputFormat};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::progress::StatusSpinner;

use super::{print_status, report_wait};

pub async fn handle_backup_command(
    cmd: &BackupCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        BackupCommands::Create {
            domain_uid,
            device_uids,
            name,
        } => {
            let mut request = DeviceBackupRequest::dated(device_uids.clone());
            if let Some(name) = name {
                request.name = name.clone();
            }
            debug!(
                "Backing up {} devices in domain {} as {}",
                device_uids.len(),
                domain_uid,
                request.name
            );

            let client = conn_mgr.create_client(profile_name)?;
            let waiter = conn_mgr.waiter_for(OperationKind::DomainTask, None);

            let spinner = StatusSpinner::new(
                &format!("backup {}", request.name),
                output_format == OutputFormat::Auto,
            );
            let mut last_seen = None;
            let result =
                workflows::backup_devices_and_wait(&client, &waiter, domain_uid, &request, |s| {
                    spinner.update(s);
                    last_seen = Some(s.clone());
                })
                .await;
            spinner.finish(result.is_ok());

            report_wait(result, last_seen, |s| {
                print_status("backup", Some(request.name.as_str()), s, output_format)
            })
        }
    }
}
