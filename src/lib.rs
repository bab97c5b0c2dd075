pub mod client;
pub mod config;
pub mod executor;
pub mod flights;
pub mod grants;
pub mod remap;
pub mod report;
pub mod status;
pub mod sync;

use std::sync::Arc;

use tokio::sync::watch;

use client::sql::StatementRunner;
use client::{ApiError, WorkspaceClient};
use config::SyncConfig;

/// Shared state passed to every replication task.
///
/// Both workspace clients live behind `Arc`s so per-object jobs can hold
/// them across await points; the shutdown receiver is cloned into every
/// statement poll loop.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub config: Arc<SyncConfig>,
    pub source: Arc<WorkspaceClient>,
    pub target: Arc<WorkspaceClient>,
    pub shutdown: watch::Receiver<bool>,
}

impl SyncContext {
    pub fn new(config: SyncConfig, shutdown: watch::Receiver<bool>) -> Result<Self, ApiError> {
        let source = Arc::new(WorkspaceClient::new(&config.source_host, &config.source_token)?);
        let target = Arc::new(WorkspaceClient::new(&config.target_host, &config.target_token)?);
        Ok(Self {
            config: Arc::new(config),
            source,
            target,
            shutdown,
        })
    }

    /// Statement poll policy for this run: configured backoff and deadline,
    /// wired to the process-wide shutdown signal.
    pub fn statement_runner(&self) -> StatementRunner {
        StatementRunner::new(
            self.config.poll_backoff(),
            self.config.statement_timeout(),
            self.shutdown.clone(),
        )
    }
}
