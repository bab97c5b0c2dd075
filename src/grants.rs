// SPDX-License-Identifier: MIT
//! Grant reconciliation — the one genuinely algorithmic piece of the toolkit.
//!
//! For one securable, make the target workspace's effective grants match the
//! source's: per principal, `add = source − target`, `remove = target −
//! source`, applied as a single batched permission update. Principals with
//! identical privileges on both sides produce no entry at all, and a run that
//! produces no entries reports `NoChanges` rather than issuing an empty
//! update.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::client::catalog::{
    PermissionsChange, PrivilegeAssignment, SecurableType,
};
use crate::client::{ApiError, WorkspaceClient};
use crate::status::SyncStatus;

/// Effective grants on one securable as observed from one workspace:
/// principal → set of privilege tokens.
///
/// Ordered maps keep diff output deterministic, which keeps the batched
/// update payload stable across runs for the same inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantSet {
    grants: BTreeMap<String, BTreeSet<String>>,
}

impl GrantSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the effective-permissions response. Entries without a
    /// privilege token (inherited placeholders) are dropped.
    pub fn from_assignments(assignments: &[PrivilegeAssignment]) -> Self {
        let mut set = Self::new();
        for a in assignments {
            for p in &a.privileges {
                if let Some(privilege) = &p.privilege {
                    set.insert(&a.principal, privilege);
                }
            }
        }
        set
    }

    pub fn insert(&mut self, principal: &str, privilege: &str) {
        self.grants
            .entry(principal.to_string())
            .or_default()
            .insert(privilege.to_string());
    }

    pub fn principals(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }

    pub fn privileges(&self, principal: &str) -> Option<&BTreeSet<String>> {
        self.grants.get(principal)
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// Minimal change for one principal: privileges to grant and to revoke.
///
/// Invariant: at least one side is non-empty; `diff` never emits an empty
/// delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDelta {
    pub principal: String,
    pub add: BTreeSet<String>,
    pub remove: BTreeSet<String>,
}

impl From<&PermissionDelta> for PermissionsChange {
    fn from(delta: &PermissionDelta) -> Self {
        PermissionsChange {
            principal: delta.principal.clone(),
            add: delta.add.iter().cloned().collect(),
            remove: delta.remove.iter().cloned().collect(),
        }
    }
}

/// Compute the per-principal deltas that turn `target` into `source`.
pub fn diff(source: &GrantSet, target: &GrantSet) -> Vec<PermissionDelta> {
    let empty = BTreeSet::new();
    let principals: BTreeSet<&str> = source.principals().chain(target.principals()).collect();

    let mut deltas = Vec::new();
    for principal in principals {
        let source_privs = source.privileges(principal).unwrap_or(&empty);
        let target_privs = target.privileges(principal).unwrap_or(&empty);

        let add: BTreeSet<String> = source_privs.difference(target_privs).cloned().collect();
        let remove: BTreeSet<String> = target_privs.difference(source_privs).cloned().collect();

        if add.is_empty() && remove.is_empty() {
            continue;
        }
        deltas.push(PermissionDelta {
            principal: principal.to_string(),
            add,
            remove,
        });
    }
    deltas
}

/// Reconcile one securable's grants from source to target.
///
/// Reads both sides fresh, diffs, and — when anything differs — issues one
/// batched update carrying every delta. A securable missing in the target
/// skips reconciliation entirely; no partial update is ever attempted.
pub async fn reconcile(
    source: &WorkspaceClient,
    target: &WorkspaceClient,
    securable: SecurableType,
    full_name: &str,
) -> Result<SyncStatus, ApiError> {
    let source_grants = source.get_effective_permissions(securable, full_name).await?;

    let target_grants = match target.get_effective_permissions(securable, full_name).await {
        Ok(g) => g,
        Err(ApiError::NotFound(_)) => return Ok(SyncStatus::NotFound),
        Err(e) => return Err(e),
    };

    let source_set = GrantSet::from_assignments(&source_grants.privilege_assignments);
    let target_set = GrantSet::from_assignments(&target_grants.privilege_assignments);

    let deltas = diff(&source_set, &target_set);
    if deltas.is_empty() {
        return Ok(SyncStatus::NoChanges);
    }

    let changes: Vec<PermissionsChange> = deltas.iter().map(PermissionsChange::from).collect();
    target
        .update_permissions(securable, full_name, &changes)
        .await?;
    info!(securable = %securable, full_name, changes = changes.len(), "synced grants");
    Ok(SyncStatus::Applied)
}
