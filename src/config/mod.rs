// SPDX-License-Identifier: MIT
//! Run configuration: workspace endpoints, credentials, and fan-out tuning.
//!
//! Values come from three layers, highest priority first:
//! CLI flag / env var  >  `lakesync.toml`  >  built-in default.
//! Tokens should normally arrive through `LAKESYNC_SOURCE_TOKEN` /
//! `LAKESYNC_TARGET_TOKEN` rather than the config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use serde::Deserialize;
use tracing::debug;

const DEFAULT_NUM_WORKERS: usize = 8;
const DEFAULT_POLL_BACKOFF_SECS: u64 = 5;
const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 600;
const DEFAULT_RECIPIENT_NAME: &str = "dr_automation_recipient";
const DEFAULT_LOG: &str = "info";

/// `lakesync.toml` — all fields are optional overrides.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    /// Hostname of the primary (source) workspace.
    source_host: Option<String>,
    /// Admin access token for the source workspace.
    source_token: Option<String>,
    /// Hostname of the secondary (target) workspace.
    target_host: Option<String>,
    /// Admin access token for the target workspace.
    target_token: Option<String>,
    /// Concurrent jobs per fan-out batch (default: 8).
    num_workers: Option<usize>,
    /// Seconds between statement-status polls (default: 5).
    poll_backoff_secs: Option<u64>,
    /// Overall deadline for one statement, in seconds (default: 600).
    statement_timeout_secs: Option<u64>,
    /// SQL warehouse in the target workspace used for clone/view DDL.
    warehouse_id: Option<String>,
    /// Global metastore id of the source workspace (provider lookup).
    source_metastore_id: Option<String>,
    /// Global metastore id of the target workspace (recipient creation).
    target_metastore_id: Option<String>,
    /// Sharing recipient name created in the source workspace.
    recipient_name: Option<String>,
    /// Log level filter string, e.g. "debug", "info,lakesync=trace".
    log: Option<String>,
}

/// Values a caller (the CLI) may pin before the file and defaults apply.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub source_host: Option<String>,
    pub source_token: Option<String>,
    pub target_host: Option<String>,
    pub target_token: Option<String>,
    pub num_workers: Option<usize>,
    pub poll_backoff_secs: Option<u64>,
    pub statement_timeout_secs: Option<u64>,
    pub warehouse_id: Option<String>,
    pub source_metastore_id: Option<String>,
    pub target_metastore_id: Option<String>,
    pub log: Option<String>,
}

/// Resolved run configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub source_host: String,
    pub source_token: String,
    pub target_host: String,
    pub target_token: String,
    pub num_workers: usize,
    pub poll_backoff_secs: u64,
    pub statement_timeout_secs: u64,
    pub warehouse_id: Option<String>,
    pub source_metastore_id: Option<String>,
    pub target_metastore_id: Option<String>,
    pub recipient_name: String,
    pub log: String,
}

impl SyncConfig {
    /// Resolve configuration from `file` (if present) under `overrides`.
    pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let toml_cfg = match file {
            Some(path) => read_toml(path)?,
            None => {
                // No explicit --config: pick up lakesync.toml from the
                // working directory when it exists.
                let implicit = PathBuf::from("lakesync.toml");
                if implicit.exists() {
                    read_toml(&implicit)?
                } else {
                    TomlConfig::default()
                }
            }
        };

        let source_host = overrides
            .source_host
            .or(toml_cfg.source_host)
            .context("source_host is required (flag --source-host or lakesync.toml)")?;
        let target_host = overrides
            .target_host
            .or(toml_cfg.target_host)
            .context("target_host is required (flag --target-host or lakesync.toml)")?;
        let source_token = overrides
            .source_token
            .or(toml_cfg.source_token)
            .context("source_token is required (LAKESYNC_SOURCE_TOKEN or lakesync.toml)")?;
        let target_token = overrides
            .target_token
            .or(toml_cfg.target_token)
            .context("target_token is required (LAKESYNC_TARGET_TOKEN or lakesync.toml)")?;

        let num_workers = overrides
            .num_workers
            .or(toml_cfg.num_workers)
            .unwrap_or(DEFAULT_NUM_WORKERS);
        if num_workers == 0 {
            bail!("num_workers must be at least 1");
        }

        Ok(Self {
            source_host,
            source_token,
            target_host,
            target_token,
            num_workers,
            poll_backoff_secs: overrides
                .poll_backoff_secs
                .or(toml_cfg.poll_backoff_secs)
                .unwrap_or(DEFAULT_POLL_BACKOFF_SECS),
            statement_timeout_secs: overrides
                .statement_timeout_secs
                .or(toml_cfg.statement_timeout_secs)
                .unwrap_or(DEFAULT_STATEMENT_TIMEOUT_SECS),
            warehouse_id: overrides.warehouse_id.or(toml_cfg.warehouse_id),
            source_metastore_id: overrides
                .source_metastore_id
                .or(toml_cfg.source_metastore_id),
            target_metastore_id: overrides
                .target_metastore_id
                .or(toml_cfg.target_metastore_id),
            recipient_name: toml_cfg
                .recipient_name
                .unwrap_or_else(|| DEFAULT_RECIPIENT_NAME.to_string()),
            log: overrides
                .log
                .or(toml_cfg.log)
                .unwrap_or_else(|| DEFAULT_LOG.to_string()),
        })
    }

    pub fn poll_backoff(&self) -> Duration {
        Duration::from_secs(self.poll_backoff_secs)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }

    /// Tasks that run DDL need a warehouse; the others do not.
    pub fn require_warehouse(&self) -> Result<&str> {
        self.warehouse_id
            .as_deref()
            .context("warehouse_id is required for this task (flag --warehouse-id or lakesync.toml)")
    }

    pub fn require_source_metastore(&self) -> Result<&str> {
        self.source_metastore_id
            .as_deref()
            .context("source_metastore_id is required for managed-table sync")
    }

    pub fn require_target_metastore(&self) -> Result<&str> {
        self.target_metastore_id
            .as_deref()
            .context("target_metastore_id is required for managed-table sync")
    }
}

fn read_toml(path: &Path) -> Result<TomlConfig> {
    debug!(path = %path.display(), "reading config file");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
