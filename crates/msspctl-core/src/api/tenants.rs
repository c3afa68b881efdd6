//! MSP managed tenants: creation, cdFMC provisioning, users and tenant tokens

use serde::{Deserialize, Serialize};

use crate::client::ControlPlaneClient;
use crate::error::{CoreError, Result, TransportError};

use super::transactions::CdoTransaction;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantRequest {
    pub display_name: String,
    pub tenant_name: String,
}

/// Roles a tenant user can be created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    RoleReadOnly,
    RoleEditOnly,
    RoleDeployOnly,
    RoleVpnSessionsManager,
    RoleAdmin,
    RoleSuperAdmin,
}

impl std::str::FromStr for UserRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        let normalized = normalized
            .strip_prefix("ROLE_")
            .unwrap_or(&normalized)
            .to_string();
        match normalized.as_str() {
            "READ_ONLY" => Ok(UserRole::RoleReadOnly),
            "EDIT_ONLY" => Ok(UserRole::RoleEditOnly),
            "DEPLOY_ONLY" => Ok(UserRole::RoleDeployOnly),
            "VPN_SESSIONS_MANAGER" => Ok(UserRole::RoleVpnSessionsManager),
            "ADMIN" => Ok(UserRole::RoleAdmin),
            "SUPER_ADMIN" => Ok(UserRole::RoleSuperAdmin),
            _ => Err(CoreError::Config(format!("Unknown user role '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub username: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub api_only_user: bool,
}

impl UserInput {
    /// An API-only administrator, the kind of user tenant tokens are minted for
    pub fn api_only_admin(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: UserRole::RoleAdmin,
            first_name: None,
            last_name: None,
            api_only_user: true,
        }
    }

    /// Zip parallel per-field lists into user inputs
    ///
    /// Entries are trimmed and blank ones dropped, so `a, b,` is two items.
    /// Every list must then have the same length and at least one entry.
    pub fn from_columns(
        emails: &[String],
        first_names: &[String],
        last_names: &[String],
        roles: &[String],
    ) -> Result<Vec<UserInput>> {
        let emails = non_blank(emails);
        let first_names = non_blank(first_names);
        let last_names = non_blank(last_names);
        let roles = non_blank(roles);

        if emails.is_empty() {
            return Err(CoreError::Config("No users given".to_string()));
        }
        if first_names.len() != emails.len()
            || last_names.len() != emails.len()
            || roles.len() != emails.len()
        {
            return Err(CoreError::Config(format!(
                "User emails, roles, first names, and last names must have the same number of elements \
                 (got {} emails, {} first names, {} last names, {} roles)",
                emails.len(),
                first_names.len(),
                last_names.len(),
                roles.len()
            )));
        }

        emails
            .iter()
            .zip(first_names)
            .zip(last_names)
            .zip(roles)
            .map(|(((email, first), last), role)| {
                Ok(UserInput {
                    username: email.to_string(),
                    role: role.parse()?,
                    first_name: Some(first.to_string()),
                    last_name: Some(last.to_string()),
                    api_only_user: false,
                })
            })
            .collect()
    }
}

fn non_blank(items: &[String]) -> Vec<&str> {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect()
}

/// A managed tenant as listed in the MSSP portal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedTenant {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// A user that authenticates with API tokens only
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOnlyUser {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserPage {
    #[serde(default)]
    items: Vec<ApiOnlyUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTokenInfo {
    api_token: String,
}

/// Handler for `/v1/msp/tenants`
#[derive(Debug, Clone)]
pub struct TenantHandler {
    client: ControlPlaneClient,
}

impl TenantHandler {
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }

    pub async fn create(
        &self,
        request: &CreateTenantRequest,
    ) -> std::result::Result<CdoTransaction, TransportError> {
        self.client.post("/v1/msp/tenants/create", request).await
    }

    /// Provision a cdFMC for the tenant, dedicated or shared
    pub async fn provision_cdfmc(
        &self,
        tenant_uid: &str,
        dedicated: bool,
    ) -> std::result::Result<CdoTransaction, TransportError> {
        self.client
            .post(
                &format!("/v1/msp/tenants/{}/cdfmc", tenant_uid),
                &serde_json::json!({ "dedicatedCdFmcInstance": dedicated }),
            )
            .await
    }

    pub async fn add_users(
        &self,
        tenant_uid: &str,
        users: &[UserInput],
    ) -> std::result::Result<CdoTransaction, TransportError> {
        self.client
            .post(
                &format!("/v1/msp/tenants/{}/users", tenant_uid),
                &serde_json::json!({ "users": users }),
            )
            .await
    }

    pub async fn get(&self, tenant_uid: &str) -> std::result::Result<ManagedTenant, TransportError> {
        self.client
            .get(&format!("/v1/msp/tenants/{}", tenant_uid))
            .await
    }

    /// Look up an API-only user by its qualified name (`user@tenant`)
    pub async fn find_api_only_user(
        &self,
        tenant_uid: &str,
        qualified_name: &str,
    ) -> std::result::Result<Option<ApiOnlyUser>, TransportError> {
        let query: String =
            url::form_urlencoded::byte_serialize(format!("name:{}", qualified_name).as_bytes())
                .collect();
        let page: UserPage = self
            .client
            .get(&format!(
                "/v1/msp/tenants/{}/users/api-only?q={}&limit=1&offset=0",
                tenant_uid, query
            ))
            .await?;
        Ok(page.items.into_iter().next())
    }

    /// Mint an API token for an API-only user of the tenant
    ///
    /// Any token previously issued to the user stops working.
    pub async fn generate_api_token(
        &self,
        tenant_uid: &str,
        api_user_uid: &str,
    ) -> std::result::Result<String, TransportError> {
        let info: ApiTokenInfo = self
            .client
            .post(
                &format!("/v1/msp/tenants/{}/users/{}/token", tenant_uid, api_user_uid),
                &serde_json::json!({}),
            )
            .await?;
        Ok(info.api_token)
    }
}
