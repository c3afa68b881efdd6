//! CLI structure and command definitions

use clap::{Args, Parser, Subcommand};
use msspctl_core::workflows::AUTOMATION_USERNAME;

/// MSSP tenant operations for the firewall-management control plane
#[derive(Parser, Debug)]
#[command(name = "msspctl")]
#[command(
    version,
    about = "MSSP tenant operations for the firewall-management control plane"
)]
#[command(long_about = "
MSSP tenant operations for the firewall-management control plane

Every command that starts work on the control plane waits for it to finish,
showing progress while it polls.

EXAMPLES:
    # Set up a profile for the US region
    msspctl profile set acme-us --region us --api-token $SCCFM_API_TOKEN

    # Create a managed tenant and provision a cdFMC for it
    msspctl tenant create --display-name 'Acme Corp' --name acme
    msspctl tenant provision-cdfmc --tenant-uid <uid>

    # Upgrade devices, giving up after an hour
    msspctl upgrade start --device-uid <uid> --version 7.4.2 --max-wait 3600

    # Resume waiting on a transaction in a script
    msspctl transaction wait <uid> -o json

For more help on a specific command, run:
    msspctl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "MSSPCTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "MSSPCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Give up waiting after this many seconds (overrides the config file)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_wait: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress on the terminal, human-readable result
    Auto,
    /// JSON result, no progress display
    Json,
    /// Result as a table
    Table,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Managed tenant operations
    #[command(subcommand, visible_alias = "tn")]
    Tenant(TenantCommands),

    /// MSP portal transactions
    #[command(subcommand, visible_alias = "tx")]
    Transaction(TransactionCommands),

    /// cdFMC domain tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Device software upgrades
    #[command(subcommand)]
    Upgrade(UpgradeCommands),

    /// cdFMC device backups
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Devices in a managed tenant
    #[command(subcommand, visible_alias = "dev")]
    Device(DeviceCommands),

    /// Profile management
    #[command(subcommand, visible_alias = "prof")]
    #[command(after_help = "EXAMPLES:
    # Create a profile
    msspctl profile set acme-eu --region eu --api-token TOKEN

    # Point a profile at a different endpoint
    msspctl profile set lab --region us --base-url http://localhost:8080

    # List all profiles
    msspctl profile list

    # Pick the profile used when --profile is not given
    msspctl profile default acme-eu
")]
    Profile(ProfileCommands),

    /// Version information
    #[command(visible_alias = "ver")]
    Version,
}

/// Polling interval override shared by the `wait` subcommands
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    /// Seconds between status checks (defaults to the configured interval)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum TenantCommands {
    /// Create a managed tenant and wait for it to be ready
    Create {
        /// Name shown in the MSSP portal
        #[arg(long)]
        display_name: String,
        /// Unique tenant name
        #[arg(long)]
        name: String,
    },

    /// Provision a cdFMC for a managed tenant
    #[command(name = "provision-cdfmc")]
    ProvisionCdfmc {
        #[arg(long)]
        tenant_uid: String,
        /// Use a shared cdFMC instance instead of a dedicated one
        #[arg(long)]
        shared: bool,
    },

    /// Create users in a managed tenant
    ///
    /// The lists are matched up by position, so all four need the same length.
    #[command(name = "add-users")]
    #[command(after_help = "EXAMPLES:
    msspctl tenant add-users --tenant-uid <uid> \\
        --emails ada@example.com,bo@example.com \\
        --first-names Ada,Bo --last-names Lovelace,Diddley \\
        --roles ROLE_ADMIN,ROLE_READ_ONLY
")]
    AddUsers {
        #[arg(long)]
        tenant_uid: String,
        #[arg(long, value_delimiter = ',', required = true)]
        emails: Vec<String>,
        #[arg(long, value_delimiter = ',', required = true)]
        first_names: Vec<String>,
        #[arg(long, value_delimiter = ',', required = true)]
        last_names: Vec<String>,
        /// ROLE_READ_ONLY, ROLE_EDIT_ONLY, ROLE_DEPLOY_ONLY, ROLE_VPN_SESSIONS_MANAGER, ROLE_ADMIN or ROLE_SUPER_ADMIN
        #[arg(long, value_delimiter = ',', required = true)]
        roles: Vec<String>,
    },

    /// Mint an API token that acts inside a managed tenant
    ///
    /// Creates the API-only admin user first if the tenant does not have it.
    /// Minting revokes the token previously issued to that user.
    Token {
        #[arg(long)]
        tenant_uid: String,
        /// API-only user to mint the token for
        #[arg(long, default_value = AUTOMATION_USERNAME)]
        username: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TransactionCommands {
    /// Wait for a transaction to finish
    Wait {
        /// Transaction UID
        uid: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Wait for a cdFMC domain task to finish
    Wait {
        /// Task ID
        task_id: String,
        /// cdFMC domain the task runs in
        #[arg(long)]
        domain_uid: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum UpgradeCommands {
    /// List versions every given device can upgrade to
    Versions {
        #[arg(long = "device-uid", required = true)]
        device_uids: Vec<String>,
    },

    /// Start an upgrade and follow it until it settles
    Start {
        #[arg(long = "device-uid", required = true)]
        device_uids: Vec<String>,
        /// Software version to upgrade to
        #[arg(long)]
        version: String,
        /// Name for the upgrade run (defaults to a timestamped name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Follow an existing upgrade run
    Wait {
        /// Upgrade run UID
        uid: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Back up devices managed by a cdFMC
    Create {
        #[arg(long)]
        domain_uid: String,
        /// FMC device record UID
        #[arg(long = "device-uid", required = true)]
        device_uids: Vec<String>,
        /// Backup name (defaults to backup-<date>)
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DeviceCommands {
    /// Register an FTD for zero-touch provisioning and wait for the transaction
    ///
    /// With --tenant-uid, a tenant token is minted through the MSSP portal
    /// profile first. Without it, the profile's token must already belong to
    /// the managed tenant.
    #[command(name = "onboard-ztp")]
    #[command(after_help = "EXAMPLES:
    MSSPCTL_FTD_ADMIN_PASSWORD=... msspctl device onboard-ztp \\
        --tenant-uid <uid> --name ftd-branch-7 --serial-number JAD12345678 \\
        --access-policy-uid <policy-uid> --licenses BASE,THREAT
")]
    OnboardZtp {
        /// Managed tenant to onboard into
        #[arg(long)]
        tenant_uid: Option<String>,
        /// API-only user the tenant token is minted for
        #[arg(long, default_value = AUTOMATION_USERNAME)]
        username: String,
        /// Device name
        #[arg(long)]
        name: String,
        #[arg(long)]
        serial_number: String,
        /// cdFMC access policy the device is assigned to
        #[arg(long)]
        access_policy_uid: String,
        /// BASE, CARRIER, THREAT, MALWARE or URLFilter
        #[arg(long, value_delimiter = ',', required = true)]
        licenses: Vec<String>,
        /// Password for the device's admin user
        #[arg(long, env = "MSSPCTL_FTD_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: String,
    },
}

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show details of a profile
    #[command(visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Create or update a profile
    #[command(visible_alias = "add")]
    Set {
        /// Profile name
        name: String,
        /// Region the MSSP portal is deployed in (us, eu, apj, scale, staging, ...)
        #[arg(long)]
        region: String,
        /// API token (can also come from SCCFM_API_TOKEN at run time)
        #[arg(long)]
        api_token: Option<String>,
        /// Override the API URL derived from the region
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name to remove
        name: String,
    },

    /// Set the default profile
    Default {
        /// Profile name to use when --profile is not given
        name: String,
    },
}
