// SPDX-License-Identifier: MIT
//! SQL statement execution: submit, then poll to a terminal state.
//!
//! The clone and view tasks run DDL through a SQL warehouse. Statements are
//! submitted without server-side waiting, then polled at a fixed backoff.
//! Unlike the original notebooks' unbounded busy-poll, the poll loop here
//! enforces an overall deadline and aborts when the process-wide shutdown
//! signal fires; a statement stuck in PENDING can never hang a run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use super::{ApiError, WorkspaceClient};

const SQL: &str = "/api/2.0/sql/statements";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
    #[serde(other)]
    Unknown,
}

impl StatementState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StatementState::Succeeded
                | StatementState::Failed
                | StatementState::Canceled
                | StatementState::Closed
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementServiceError {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementStatus {
    pub state: StatementState,
    #[serde(default)]
    pub error: Option<StatementServiceError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatementResponse {
    pub statement_id: String,
    pub status: StatementStatus,
}

#[derive(Debug, Serialize)]
struct ExecuteStatementRequest<'a> {
    statement: &'a str,
    warehouse_id: &'a str,
    wait_timeout: &'a str,
    on_wait_timeout: &'a str,
}

/// How a statement run can end short of SUCCEEDED.
#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    #[error("statement failed: {0}")]
    Failed(String),
    #[error("statement {statement_id} not finished after {waited:?}")]
    Timeout {
        statement_id: String,
        waited: Duration,
    },
    #[error("statement {0} abandoned: shutdown requested")]
    Cancelled(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl WorkspaceClient {
    /// Submit a statement and return immediately; the caller polls.
    pub async fn execute_statement(
        &self,
        warehouse_id: &str,
        statement: &str,
    ) -> Result<StatementResponse, ApiError> {
        self.post_json(
            SQL,
            &ExecuteStatementRequest {
                statement,
                warehouse_id,
                wait_timeout: "0s",
                on_wait_timeout: "CONTINUE",
            },
        )
        .await
    }

    pub async fn get_statement(&self, statement_id: &str) -> Result<StatementResponse, ApiError> {
        self.get_json(&format!("{SQL}/{statement_id}"), &[]).await
    }
}

/// Poll-loop policy for statement runs: backoff between probes, overall
/// deadline, and a shutdown signal that aborts waiting early.
#[derive(Debug, Clone)]
pub struct StatementRunner {
    backoff: Duration,
    timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl StatementRunner {
    pub fn new(backoff: Duration, timeout: Duration, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            backoff,
            timeout,
            shutdown,
        }
    }

    /// Run `statement` on `warehouse_id` and wait for a terminal state.
    pub async fn run(
        &self,
        client: &WorkspaceClient,
        warehouse_id: &str,
        statement: &str,
    ) -> Result<(), StatementError> {
        let started = Instant::now();
        let resp = client.execute_statement(warehouse_id, statement).await?;
        let statement_id = resp.statement_id.clone();
        let mut status = resp.status;
        let mut shutdown = self.shutdown.clone();

        loop {
            match status.state {
                StatementState::Succeeded => return Ok(()),
                s if s.is_terminal() => {
                    let message = status
                        .error
                        .and_then(|e| e.message)
                        .unwrap_or_else(|| format!("terminal state {s:?}"));
                    return Err(StatementError::Failed(message));
                }
                _ => {}
            }

            let waited = started.elapsed();
            if waited >= self.timeout {
                return Err(StatementError::Timeout {
                    statement_id,
                    waited,
                });
            }
            if *shutdown.borrow() {
                return Err(StatementError::Cancelled(statement_id));
            }

            tokio::select! {
                _ = tokio::time::sleep(self.backoff) => {}
                res = async { shutdown.wait_for(|stop| *stop).await.map(|_| ()) } => match res {
                    Ok(()) => return Err(StatementError::Cancelled(statement_id)),
                    // Sender gone: no signal can ever arrive, fall back to the timer.
                    Err(_) => tokio::time::sleep(self.backoff).await,
                },
            }

            debug!(statement_id = %statement_id, state = ?status.state, "polling statement");
            status = client.get_statement(&statement_id).await?.status;
        }
    }
}
