//! Profile management command implementations

use colored::Colorize;
use msspctl_core::{Config, Profile};
use tracing::{debug, info, trace};

use crate::cli::{OutputFormat, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::{CliError, Result as CliResult};
use crate::output;

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format),
        Set {
            name,
            region,
            api_token,
            base_url,
        } => handle_set(conn_mgr, name, region, api_token.as_deref(), base_url.as_deref()),
        Remove { name } => handle_remove(conn_mgr, name),
        Default { name } => handle_default(conn_mgr, name),
    }
}

/// First few characters of a token, enough to tell two tokens apart
fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}...", prefix)
}

fn json_format(output_format: OutputFormat) -> output::OutputFormat {
    match output_format {
        OutputFormat::Table => output::OutputFormat::Table,
        _ => output::OutputFormat::Json,
    }
}

fn config_location(conn_mgr: &ConnectionManager) -> Option<String> {
    conn_mgr
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .or_else(|| Config::config_path().ok().map(|p| p.display().to_string()))
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    debug!("Listing all configured profiles");
    let profiles = conn_mgr.config.list_profiles();
    trace!("Found {} profiles", profiles.len());
    let default_name = conn_mgr.config.default_profile.as_deref();

    if output_format != OutputFormat::Auto {
        let profile_list: Vec<serde_json::Value> = profiles
            .iter()
            .map(|(name, profile)| {
                serde_json::json!({
                    "name": name,
                    "region": profile.region,
                    "base_url": profile.effective_base_url(),
                    "token_configured": profile.has_token(),
                    "is_default": default_name == Some(name.as_str()),
                })
            })
            .collect();

        if output_format == OutputFormat::Table {
            return output::print_output(&profile_list, output::OutputFormat::Table);
        }

        let output_data = serde_json::json!({
            "config_path": config_location(conn_mgr),
            "profiles": profile_list,
            "count": profiles.len()
        });
        return output::print_output(&output_data, output::OutputFormat::Json);
    }

    if let Some(path) = config_location(conn_mgr) {
        println!("Configuration file: {}", path);
        println!();
    }

    if profiles.is_empty() {
        info!("No profiles configured");
        println!("No profiles configured.");
        println!("Use 'msspctl profile set' to create a profile.");
        return Ok(());
    }

    for (name, profile) in &profiles {
        if default_name == Some(name.as_str()) {
            println!("  {} {}", name.bold().cyan(), "(default)".green());
        } else {
            println!("  {}", name.bold().cyan());
        }
        println!(
            "    {} {} ({})",
            "URL:".dimmed(),
            profile.effective_base_url(),
            profile.region
        );
        if !profile.has_token() {
            println!("    {} not stored", "Token:".dimmed());
        }
    }

    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let profile = conn_mgr.config.get_profile(name)?;
    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    let preview = profile.api_token.as_deref().map(token_preview);

    match output_format {
        OutputFormat::Json | OutputFormat::Table => {
            let mut output_data = serde_json::json!({
                "name": name,
                "region": profile.region,
                "base_url": profile.effective_base_url(),
                "is_default": is_default,
            });
            if let Some(preview) = &preview {
                output_data["api_token_preview"] = serde_json::json!(preview);
            }
            output::print_output(&output_data, json_format(output_format))
        }
        OutputFormat::Auto => {
            println!("Profile: {}", name);
            println!("Region: {}", profile.region);
            println!("API URL: {}", profile.effective_base_url());
            match &preview {
                Some(preview) => println!("API Token: {}", preview),
                None => println!("API Token: not set (SCCFM_API_TOKEN is used)"),
            }
            if is_default {
                println!("Default: yes");
            }
            Ok(())
        }
    }
}

fn handle_set(
    conn_mgr: &ConnectionManager,
    name: &str,
    region: &str,
    api_token: Option<&str>,
    base_url: Option<&str>,
) -> CliResult<()> {
    debug!("Setting profile: {}", name);
    if region.trim().is_empty() {
        return Err(CliError::InvalidInput {
            message: "Region cannot be empty".to_string(),
        });
    }

    let existing = conn_mgr.config.profiles.get(name);
    let mut profile = Profile::new(region.trim());
    // Keep the stored token when only the region or URL changes
    profile.api_token = api_token
        .map(str::to_string)
        .or_else(|| existing.and_then(|p| p.api_token.clone()));
    profile.base_url = base_url.map(str::to_string);

    let mut config = conn_mgr.config.clone();
    let is_first = config.profiles.is_empty();
    config.set_profile(name.to_string(), profile);
    if is_first {
        config.default_profile = Some(name.to_string());
    }
    conn_mgr.save_config(&config)?;

    if existing.is_some() {
        println!("Profile '{}' updated successfully.", name);
    } else {
        println!("Profile '{}' created successfully.", name);
    }
    if is_first {
        println!("Set as default profile.");
    }
    Ok(())
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    debug!("Removing profile: {}", name);

    let mut config = conn_mgr.config.clone();
    if config.remove_profile(name).is_none() {
        return Err(CliError::ProfileNotFound { name: name.into() });
    }
    let was_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    conn_mgr.save_config(&config)?;

    println!("Profile '{}' removed successfully.", name);
    if was_default {
        println!("Note: '{}' was the default profile.", name);
    }
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    debug!("Setting default profile: {}", name);
    conn_mgr.config.get_profile(name)?;

    let mut config = conn_mgr.config.clone();
    config.default_profile = Some(name.to_string());
    conn_mgr.save_config(&config)?;

    println!("Default profile set to '{}'.", name);
    Ok(())
}
