// SPDX-License-Identifier: MIT
//! Per-job outcome taxonomy shared by every replication task.
//!
//! The original scripts signalled "already exists" / "not found" by catching
//! SDK exceptions; here every operation returns an explicit [`SyncStatus`]
//! variant instead, so the executor and reporter never have to inspect error
//! types after the fact.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a single per-object job did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum SyncStatus {
    /// Object was created (or replaced) in the target workspace.
    Created,
    /// Object already existed; treated as a skip, not an error.
    AlreadyExists,
    /// Securable is missing in the target workspace; job skipped.
    NotFound,
    /// Grant reconciliation issued a batched permission update.
    Applied,
    /// Grant reconciliation found source and target identical.
    NoChanges,
    /// Job failed; carries the underlying error message.
    Failed(String),
}

impl SyncStatus {
    /// True for the non-error outcomes.
    pub fn is_ok(&self) -> bool {
        !matches!(self, SyncStatus::Failed(_))
    }

    /// Short label used in the status table and summary counts.
    pub fn label(&self) -> &str {
        match self {
            SyncStatus::Created => "created",
            SyncStatus::AlreadyExists => "already_exists",
            SyncStatus::NotFound => "not_found",
            SyncStatus::Applied => "applied",
            SyncStatus::NoChanges => "no_changes",
            SyncStatus::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Failed(msg) => write!(f, "failed: {msg}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Kind of object a job operated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Catalog,
    Schema,
    Table,
    View,
    Volume,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ObjectKind::Catalog => "catalog",
            ObjectKind::Schema => "schema",
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::Volume => "volume",
        };
        f.write_str(s)
    }
}

/// Identity of the object a job targets, known before the job runs.
///
/// Kept separate from the job future so a panicked task can still be
/// attributed to its object in the status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub catalog: String,
    /// Empty for catalog-level securables.
    pub schema: String,
    /// Empty for catalog- and schema-level securables.
    pub name: String,
    pub kind: ObjectKind,
}

impl ObjectRef {
    pub fn catalog(name: impl Into<String>) -> Self {
        Self {
            catalog: name.into(),
            schema: String::new(),
            name: String::new(),
            kind: ObjectKind::Catalog,
        }
    }

    pub fn schema(catalog: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            name: String::new(),
            kind: ObjectKind::Schema,
        }
    }

    pub fn object(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
        kind: ObjectKind,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            name: name.into(),
            kind,
        }
    }

    /// `catalog[.schema[.name]]` — the securable's fully-qualified name.
    pub fn full_name(&self) -> String {
        match (self.schema.is_empty(), self.name.is_empty()) {
            (true, _) => self.catalog.clone(),
            (false, true) => format!("{}.{}", self.catalog, self.schema),
            (false, false) => format!("{}.{}.{}", self.catalog, self.schema, self.name),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.full_name())
    }
}

/// One row of the post-batch status table.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRecord {
    pub catalog: String,
    pub schema: String,
    pub object: String,
    pub kind: ObjectKind,
    #[serde(flatten)]
    pub status: SyncStatus,
    pub completed_at: DateTime<Utc>,
}

impl SyncRecord {
    /// Stamp a finished job with the current time.
    pub fn new(meta: ObjectRef, status: SyncStatus) -> Self {
        Self {
            catalog: meta.catalog,
            schema: meta.schema,
            object: meta.name,
            kind: meta.kind,
            status,
            completed_at: Utc::now(),
        }
    }
}
