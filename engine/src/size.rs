//! Best-effort model footprint lookup
//!
//! The size of a backend comes from a textual inventory listing (by default
//! the output of `ollama list`). Any failure along the way leaves the size
//! unknown; it never fails the benchmark that asked for it.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{anyhow, Context};
use regex::Regex;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, warn};

use crate::config::InventorySettings;
use crate::error::{BenchError, Result};

/// Source of the backend inventory listing
pub trait BackendInventory: Send + Sync {
    fn list_backends(&self) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// Inventory produced by running an external command
#[derive(Debug, Clone)]
pub struct CommandInventory {
    command: String,
    args: Vec<String>,
}

impl CommandInventory {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_settings(settings: &InventorySettings) -> Self {
        Self::new(settings.command.clone(), settings.args.clone())
    }
}

impl BackendInventory for CommandInventory {
    fn list_backends(&self) -> impl Future<Output = anyhow::Result<String>> + Send {
        let mut command = Command::new(&self.command);
        command.args(&self.args).kill_on_drop(true);
        let program = self.command.clone();

        async move {
            let output = command
                .output()
                .await
                .with_context(|| format!("Failed to run inventory command {}", program))?;

            if !output.status.success() {
                return Err(anyhow!(
                    "Inventory command {} exited with {}",
                    program,
                    output.status
                ));
            }

            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
    }
}

fn size_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?:^|\s)(\d+(?:\.\d+)?)\s?(GB|MB)(?:\s|$)").ok())
        .as_ref()
}

/// Convert a size such as `4.1GB`, `4.1 GB` or `512MB` to megabytes
pub fn parse_size_mb(text: &str) -> Option<f64> {
    let captures = size_pattern()?.captures(text)?;
    let value: f64 = captures[1].parse().ok()?;
    match &captures[2] {
        "GB" => Some(value * 1024.0),
        "MB" => Some(value),
        _ => None,
    }
}

/// Inventory lines as (name, rest of line) pairs
fn inventory_entries(listing: &str) -> Vec<(&str, &str)> {
    listing
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let name = line.split_whitespace().next()?;
            Some((name, &line[name.len()..]))
        })
        .collect()
}

/// Size in MB of `model` from an inventory listing.
///
/// An exact name wins; a bare name then means `name:latest`, and falls back
/// to another tag only when the listing holds exactly one `name:*` entry.
pub fn find_model_size(listing: &str, model: &str) -> Option<f64> {
    let entries = inventory_entries(listing);
    let line_for = |name: &str| entries.iter().find(|(n, _)| *n == name).map(|(_, rest)| *rest);

    if let Some(rest) = line_for(model) {
        return parse_size_mb(rest);
    }
    if model.contains(':') {
        return None;
    }
    if let Some(rest) = line_for(&format!("{}:latest", model)) {
        return parse_size_mb(rest);
    }

    let mut tagged = entries.iter().filter(|(name, _)| {
        name.strip_prefix(model)
            .is_some_and(|tag| tag.starts_with(':'))
    });
    match (tagged.next(), tagged.next()) {
        (Some((_, rest)), None) => parse_size_mb(rest),
        _ => None,
    }
}

pub struct SizeResolver<I: BackendInventory> {
    inventory: I,
    timeout: Duration,
}

impl SizeResolver<CommandInventory> {
    pub fn from_settings(settings: &InventorySettings) -> Self {
        Self::new(
            CommandInventory::from_settings(settings),
            Duration::from_secs(settings.timeout_seconds),
        )
    }
}

impl<I: BackendInventory> SizeResolver<I> {
    pub fn new(inventory: I, timeout: Duration) -> Self {
        Self { inventory, timeout }
    }

    /// Size of `model` in MB, or `None` when it cannot be determined
    pub async fn resolve(&self, model: &str) -> Option<f64> {
        match self.try_resolve(model).await {
            Ok(size) => {
                debug!(model, size_mb = size, "Resolved model size");
                Some(size)
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    pub async fn try_resolve(&self, model: &str) -> Result<f64> {
        let unavailable = |reason: String| BenchError::SizeResolutionUnavailable {
            model: model.to_string(),
            reason,
        };

        let listing = time::timeout(self.timeout, self.inventory.list_backends())
            .await
            .map_err(|_| unavailable(format!("inventory timed out after {:?}", self.timeout)))?
            .map_err(|e| unavailable(format!("{:#}", e)))?;

        find_model_size(&listing, model).ok_or_else(|| unavailable("no size entry in inventory".to_string()))
    }
}
