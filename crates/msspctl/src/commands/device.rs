//! Device onboarding into managed tenants

use msspctl_core::OperationKind;
use msspctl_core::api::{FtdLicense, ZtpOnboardingInput};
use msspctl_core::workflows;
use tracing::{debug, info};

use crate::cli::{DeviceCommands, OutputFormat};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::progress::StatusSpinner;

use super::tenant::mint_token;
use super::{print_status, report_wait};

pub async fn handle_device_command(
    cmd: &DeviceCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        DeviceCommands::OnboardZtp {
            tenant_uid,
            username,
            name,
            serial_number,
            access_policy_uid,
            licenses,
            admin_password,
        } => {
            let input = ZtpOnboardingInput {
                admin_password: admin_password.clone(),
                name: name.clone(),
                serial_number: serial_number.clone(),
                fmc_access_policy_uid: access_policy_uid.clone(),
                licenses: licenses
                    .iter()
                    .filter(|l| !l.trim().is_empty())
                    .map(|l| l.parse::<FtdLicense>())
                    .collect::<Result<_, _>>()?,
            };
            input.validate()?;

            let client = match tenant_uid {
                Some(tenant_uid) => {
                    let token =
                        mint_token(conn_mgr, profile_name, tenant_uid, username, output_format)
                            .await?;
                    info!(tenant = %token.tenant_name, "Acting as managed tenant");
                    token.client(&conn_mgr.create_client(profile_name)?)?
                }
                None => conn_mgr.create_client(profile_name)?,
            };
            debug!("Onboarding {:?}", input);

            onboard_ztp(&client, conn_mgr, &input, output_format).await
        }
    }
}

async fn onboard_ztp(
    tenant_client: &msspctl_core::ControlPlaneClient,
    conn_mgr: &ConnectionManager,
    input: &ZtpOnboardingInput,
    output_format: OutputFormat,
) -> CliResult<()> {
    let waiter = conn_mgr.waiter_for(OperationKind::TenantTransaction, None);

    let spinner = StatusSpinner::new(
        &format!("ZTP onboarding of {}", input.name),
        output_format == OutputFormat::Auto,
    );
    let mut last_seen = None;
    let result = workflows::onboard_ztp_and_wait(tenant_client, &waiter, input, |s| {
        spinner.update(s);
        last_seen = Some(s.clone());
    })
    .await;
    spinner.finish(result.is_ok());

    report_wait(result, last_seen, |s| {
        print_status("ZTP onboarding", Some(input.name.as_str()), s, output_format)
    })
}
