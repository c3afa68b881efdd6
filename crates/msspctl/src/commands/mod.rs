//! Command implementations

pub mod backup;
pub mod device;
pub mod operation;
pub mod profile;
pub mod tenant;
pub mod upgrade;

use serde::Serialize;

use msspctl_core::{CoreError, OperationStatus};

use crate::cli::OutputFormat;
use crate::error::Result as CliResult;
use crate::output;
use crate::progress::format_state;

/// Final status of a waited-on operation, as printed with `-o json`
#[derive(Debug, Serialize)]
pub struct StatusReport<'a, D: Serialize> {
    pub operation: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub state: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<&'a D>,
}

/// Print the status an operation finished with
pub fn print_status<D: Serialize>(
    operation: &str,
    id: Option<&str>,
    status: &OperationStatus<D>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let report = StatusReport {
        operation,
        id,
        state: &status.state,
        message: status.message.as_deref(),
        detail: status.detail.as_ref(),
    };

    match output_format {
        OutputFormat::Json => output::print_output(&report, output::OutputFormat::Json),
        OutputFormat::Table => output::print_output(&report, output::OutputFormat::Table),
        OutputFormat::Auto => {
            match id {
                Some(id) => println!("{} {}: {}", operation, id, format_state(&status.state)),
                None => println!("{}: {}", operation, format_state(&status.state)),
            }
            if let Some(message) = &status.message {
                println!("Message: {}", message);
            }
            Ok(())
        }
    }
}

/// Print how a wait ended and pass on its error
///
/// When the operation reached a failed terminal state, `last_seen` (the
/// final status the waiter reported) is printed the same way a successful
/// result would be before the error is returned.
pub fn report_wait<D, P>(
    result: msspctl_core::Result<OperationStatus<D>>,
    last_seen: Option<OperationStatus<D>>,
    print: P,
) -> CliResult<()>
where
    P: FnOnce(&OperationStatus<D>) -> CliResult<()>,
{
    match result {
        Ok(status) => print(&status),
        Err(err @ CoreError::OperationFailed { .. }) => {
            if let Some(status) = &last_seen {
                print(status)?;
            }
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
