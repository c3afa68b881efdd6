//! Device inventory of a managed tenant
//!
//! Calls here act inside one tenant, so the client must carry a token
//! minted for that tenant rather than the MSSP portal token.

use serde::{Deserialize, Serialize};

use crate::client::ControlPlaneClient;
use crate::error::{CoreError, Result, TransportError};

use super::transactions::CdoTransaction;

/// Feature licenses an FTD can be onboarded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FtdLicense {
    #[serde(rename = "BASE")]
    Base,
    #[serde(rename = "CARRIER")]
    Carrier,
    #[serde(rename = "THREAT")]
    Threat,
    #[serde(rename = "MALWARE")]
    Malware,
    #[serde(rename = "URLFilter")]
    UrlFilter,
}

impl std::str::FromStr for FtdLicense {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace(['-', '_'], "").as_str() {
            "BASE" => Ok(FtdLicense::Base),
            "CARRIER" => Ok(FtdLicense::Carrier),
            "THREAT" => Ok(FtdLicense::Threat),
            "MALWARE" => Ok(FtdLicense::Malware),
            "URLFILTER" | "URL" => Ok(FtdLicense::UrlFilter),
            _ => Err(CoreError::Config(format!(
                "Unknown license '{}' (expected BASE, CARRIER, THREAT, MALWARE or URLFilter)",
                s
            ))),
        }
    }
}

/// Request body for zero-touch provisioning of an FTD
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZtpOnboardingInput {
    /// Password the device's admin user is set to once it registers
    pub admin_password: String,
    pub name: String,
    pub serial_number: String,
    /// Access policy on the tenant's cdFMC the device is assigned to
    pub fmc_access_policy_uid: String,
    pub licenses: Vec<FtdLicense>,
}

impl ZtpOnboardingInput {
    /// Check that the input can be submitted
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("device name", &self.name),
            ("serial number", &self.serial_number),
            ("access policy UID", &self.fmc_access_policy_uid),
            ("admin password", &self.admin_password),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::Config(format!("The {} is empty", field)));
            }
        }
        if self.licenses.is_empty() {
            return Err(CoreError::Config(
                "At least one license must be selected".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ZtpOnboardingInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZtpOnboardingInput")
            .field("admin_password", &"<redacted>")
            .field("name", &self.name)
            .field("serial_number", &self.serial_number)
            .field("fmc_access_policy_uid", &self.fmc_access_policy_uid)
            .field("licenses", &self.licenses)
            .finish()
    }
}

/// Handler for `/v1/inventory/devices`
#[derive(Debug, Clone)]
pub struct InventoryHandler {
    client: ControlPlaneClient,
}

impl InventoryHandler {
    pub fn new(client: ControlPlaneClient) -> Self {
        Self { client }
    }

    /// Register an FTD by serial number; it onboards once it calls home
    pub async fn onboard_ftd_ztp(
        &self,
        input: &ZtpOnboardingInput,
    ) -> std::result::Result<CdoTransaction, TransportError> {
        self.client
            .post("/v1/inventory/devices/ftds/ztp", input)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input() -> ZtpOnboardingInput {
        ZtpOnboardingInput {
            admin_password: "s3cret!".to_string(),
            name: "ftd-branch-7".to_string(),
            serial_number: "JAD12345678".to_string(),
            fmc_access_policy_uid: "policy-1".to_string(),
            licenses: vec![FtdLicense::Base, FtdLicense::UrlFilter],
        }
    }

    #[test]
    fn test_license_names() {
        assert_eq!("threat".parse::<FtdLicense>().unwrap(), FtdLicense::Threat);
        assert_eq!("urlfilter".parse::<FtdLicense>().unwrap(), FtdLicense::UrlFilter);
        assert_eq!("URL_FILTER".parse::<FtdLicense>().unwrap(), FtdLicense::UrlFilter);
        assert!(matches!(
            "APEX".parse::<FtdLicense>(),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_ztp_input_wire_format() {
        let value = serde_json::to_value(input()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "adminPassword": "s3cret!",
                "name": "ftd-branch-7",
                "serialNumber": "JAD12345678",
                "fmcAccessPolicyUid": "policy-1",
                "licenses": ["BASE", "URLFilter"]
            })
        );
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(input().validate().is_ok());

        let mut no_licenses = input();
        no_licenses.licenses.clear();
        assert!(matches!(no_licenses.validate(), Err(CoreError::Config(_))));

        let mut blank_serial = input();
        blank_serial.serial_number = "  ".to_string();
        let err = blank_serial.validate().unwrap_err();
        assert!(err.to_string().contains("serial number"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", input());
        assert!(!rendered.contains("s3cret!"));
        assert!(rendered.contains("JAD12345678"));
    }
}
