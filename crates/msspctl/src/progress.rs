//! Terminal rendering of wait progress
//!
//! Transactions and tasks get a spinner whose message tracks the latest
//! state. Upgrade runs get a per-device table, re-printed whenever it changes.

use std::time::Duration;

use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use msspctl_core::api::UpgradeRunDetail;
use msspctl_core::OperationStatus;

/// Spinner that follows the state of one operation
///
/// Hidden when progress should not be drawn (JSON output), so callers can
/// drive it unconditionally.
pub struct StatusSpinner {
    bar: ProgressBar,
    label: String,
}

impl StatusSpinner {
    /// `subject` names what is being waited for, e.g. `transaction 4f1c...`
    pub fn new(subject: &str, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]")
        {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(120));

        let label = capitalize(subject);
        bar.set_message(format!("Waiting for {}", label));
        Self { bar, label }
    }

    pub fn update<D>(&self, status: &OperationStatus<D>) {
        self.bar
            .set_message(format!("{}: {}", self.label, format_state(&status.state)));
    }

    pub fn finish(&self, succeeded: bool) {
        if succeeded {
            self.bar.finish_with_message(format!("{} finished", self.label));
        } else {
            self.bar.abandon_with_message(format!("{} did not finish", self.label));
        }
    }
}

/// Format a state with an icon for the terminal
pub fn format_state(state: &str) -> String {
    match state.to_uppercase().as_str() {
        "DONE" | "SUCCEEDED" | "SUCCESS" | "COMPLETED" | "DEPLOYED" | "UPGRADE_COMPLETED"
        | "UPGRADE_STAGED" => {
            format!("\u{2713} {}", state) // checkmark
        }
        "ERROR" | "FAILED" | "UPGRADE_FAILED" | "UPGRADE_STAGING_FAILED" => {
            format!("\u{2717} {}", state) // x mark
        }
        "CANCELLED" => format!("\u{2298} {}", state), // circle slash
        "PENDING" | "IN_PROGRESS" | "RUNNING" | "UPGRADING" | "UPGRADE_IN_PROGRESS" => {
            format!("\u{21bb} {}", state) // arrow circle
        }
        _ => state.to_string(),
    }
}

fn state_color(state: &str) -> Color {
    match state {
        "UPGRADE_COMPLETED" | "UPGRADE_STAGED" => Color::Green,
        "UPGRADE_FAILED" | "UPGRADE_STAGING_FAILED" => Color::Red,
        "UPGRADE_IN_PROGRESS" | "UPGRADING" | "STAGING" => Color::Yellow,
        _ => Color::White,
    }
}

/// Per-device table for an upgrade run
pub fn upgrade_run_table(status: &OperationStatus<UpgradeRunDetail>) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Device", "Managed Tenant", "Status", "Message"]);

    if let Some(detail) = &status.detail {
        for device in &detail.devices {
            table.add_row(vec![
                Cell::new(device.name.as_deref().unwrap_or(&device.uid)),
                Cell::new(device.managed_tenant_display_name.as_deref().unwrap_or("-")),
                Cell::new(&device.upgrade_run_status).fg(state_color(&device.upgrade_run_status)),
                Cell::new(device.latest_message.as_deref().unwrap_or("-")),
            ]);
        }
    }
    table
}

/// Prints the upgrade table when the set of device states has changed
pub struct UpgradeRunView {
    visible: bool,
    last_rendered: Option<String>,
}

impl UpgradeRunView {
    pub fn new(visible: bool) -> Self {
        Self {
            visible,
            last_rendered: None,
        }
    }

    pub fn update(&mut self, status: &OperationStatus<UpgradeRunDetail>) {
        if !self.visible {
            return;
        }
        let rendered = format!(
            "Upgrade run: {}\n{}",
            format_state(&status.state),
            upgrade_run_table(status)
        );
        if self.last_rendered.as_deref() != Some(rendered.as_str()) {
            eprintln!("{}", rendered);
            self.last_rendered = Some(rendered);
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
