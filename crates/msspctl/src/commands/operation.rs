//! `transaction wait` and `task wait`: follow operations started elsewhere

use msspctl_core::workflows;
use msspctl_core::{OperationHandle, OperationKind};

use crate::cli::{OutputFormat, TaskCommands, TransactionCommands};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::progress::StatusSpinner;

use super::{print_status, report_wait};

pub async fn handle_transaction_command(
    cmd: &TransactionCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        TransactionCommands::Wait { uid, wait } => {
            let client = conn_mgr.create_client(profile_name)?;
            let waiter = conn_mgr.waiter_for(OperationKind::TenantTransaction, wait.interval);
            let handle = OperationHandle::transaction(uid);

            let spinner =
                StatusSpinner::new(&handle.to_string(), output_format == OutputFormat::Auto);
            let mut last_seen = None;
            let result = workflows::wait_for_transaction(&client, &waiter, &handle, |s| {
                spinner.update(s);
                last_seen = Some(s.clone());
            })
            .await;
            spinner.finish(result.is_ok());

            report_wait(result, last_seen, |s| {
                print_status("transaction", Some(uid.as_str()), s, output_format)
            })
        }
    }
}

pub async fn handle_task_command(
    cmd: &TaskCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        TaskCommands::Wait {
            task_id,
            domain_uid,
            wait,
        } => {
            let client = conn_mgr.create_client(profile_name)?;
            let waiter = conn_mgr.waiter_for(OperationKind::DomainTask, wait.interval);
            let handle = OperationHandle::domain_task(domain_uid, task_id);

            let spinner =
                StatusSpinner::new(&handle.to_string(), output_format == OutputFormat::Auto);
            let mut last_seen = None;
            let result = workflows::wait_for_task(&client, &waiter, &handle, |s| {
                spinner.update(s);
                last_seen = Some(s.clone());
            })
            .await;
            spinner.finish(result.is_ok());

            report_wait(result, last_seen, |s| {
                print_status("task", Some(task_id.as_str()), s, output_format)
            })
        }
    }
}
