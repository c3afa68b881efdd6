//! Managed tenant commands

use msspctl_core::OperationKind;
use msspctl_core::api::{CreateTenantRequest, UserInput};
use msspctl_core::workflows;
use tracing::debug;

use crate::cli::{OutputFormat, TenantCommands};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output;
use crate::progress::StatusSpinner;

use super::{print_status, report_wait};

pub async fn handle_tenant_command(
    cmd: &TenantCommands,
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    match cmd {
        TenantCommands::Create { display_name, name } => {
            let request = CreateTenantRequest {
                display_name: display_name.clone(),
                tenant_name: name.clone(),
            };
            create(conn_mgr, profile_name, &request, output_format).await
        }
        TenantCommands::ProvisionCdfmc { tenant_uid, shared } => {
            provision_cdfmc(conn_mgr, profile_name, tenant_uid, !shared, output_format).await
        }
        TenantCommands::AddUsers {
            tenant_uid,
            emails,
            first_names,
            last_names,
            roles,
        } => {
            let users = UserInput::from_columns(emails, first_names, last_names, roles)?;
            add_users(conn_mgr, profile_name, tenant_uid, &users, output_format).await
        }
        TenantCommands::Token {
            tenant_uid,
            username,
        } => {
            let token =
                mint_token(conn_mgr, profile_name, tenant_uid, username, output_format).await?;
            match output_format {
                OutputFormat::Json => output::print_output(&token, output::OutputFormat::Json),
                OutputFormat::Table => output::print_output(&token, output::OutputFormat::Table),
                // Bare token so it can be captured with $(...)
                OutputFormat::Auto => {
                    println!("{}", token.api_token);
                    Ok(())
                }
            }
        }
    }
}

/// Mint a tenant token through the MSSP portal profile
pub(super) async fn mint_token(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    tenant_uid: &str,
    username: &str,
    output_format: OutputFormat,
) -> CliResult<workflows::TenantToken> {
    debug!("Minting token for {} in tenant {}", username, tenant_uid);
    let client = conn_mgr.create_client(profile_name)?;
    let waiter = conn_mgr.waiter_for(OperationKind::TenantTransaction, None);

    let spinner = StatusSpinner::new(
        &format!("API user {} in tenant {}", username, tenant_uid),
        output_format == OutputFormat::Auto,
    );
    let result =
        workflows::tenant_token(&client, &waiter, tenant_uid, username, |s| spinner.update(s))
            .await;
    spinner.finish(result.is_ok());
    Ok(result?)
}

async fn create(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    request: &CreateTenantRequest,
    output_format: OutputFormat,
) -> CliResult<()> {
    debug!("Creating tenant {}", request.tenant_name);
    let client = conn_mgr.create_client(profile_name)?;
    let waiter = conn_mgr.waiter_for(OperationKind::TenantTransaction, None);

    let spinner = StatusSpinner::new(
        &format!("tenant {} creation", request.tenant_name),
        output_format == OutputFormat::Auto,
    );
    let mut last_seen = None;
    let result = workflows::create_tenant_and_wait(&client, &waiter, request, |s| {
        spinner.update(s);
        last_seen = Some(s.clone());
    })
    .await;
    spinner.finish(result.is_ok());

    report_wait(result, last_seen, |s| {
        print_status("tenant creation", Some(request.tenant_name.as_str()), s, output_format)
    })
}

async fn provision_cdfmc(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    tenant_uid: &str,
    dedicated: bool,
    output_format: OutputFormat,
) -> CliResult<()> {
    debug!("Provisioning cdFMC for tenant {} (dedicated: {})", tenant_uid, dedicated);
    let client = conn_mgr.create_client(profile_name)?;
    let waiter = conn_mgr.waiter_for(OperationKind::TenantTransaction, None);

    let spinner = StatusSpinner::new(
        &format!("cdFMC provisioning for tenant {}", tenant_uid),
        output_format == OutputFormat::Auto,
    );
    let mut last_seen = None;
    let result = workflows::provision_cdfmc_and_wait(&client, &waiter, tenant_uid, dedicated, |s| {
        spinner.update(s);
        last_seen = Some(s.clone());
    })
    .await;
    spinner.finish(result.is_ok());

    report_wait(result, last_seen, |s| {
        print_status("cdFMC provisioning", Some(tenant_uid), s, output_format)
    })
}

async fn add_users(
    conn_mgr: &ConnectionManager,
    profile_name: Option<&str>,
    tenant_uid: &str,
    users: &[UserInput],
    output_format: OutputFormat,
) -> CliResult<()> {
    debug!("Adding {} users to tenant {}", users.len(), tenant_uid);
    let client = conn_mgr.create_client(profile_name)?;
    let waiter = conn_mgr.waiter_for(OperationKind::TenantTransaction, None);

    let spinner = StatusSpinner::new(
        &format!("user creation in tenant {}", tenant_uid),
        output_format == OutputFormat::Auto,
    );
    let mut last_seen = None;
    let result = workflows::add_users_and_wait(&client, &waiter, tenant_uid, users, |s| {
        spinner.update(s);
        last_seen = Some(s.clone());
    })
    .await;
    spinner.finish(result.is_ok());

    report_wait(result, last_seen, |s| {
        print_status("user creation", Some(tenant_uid), s, output_format)
    })
}
