// SPDX-License-Identifier: MIT
//! External-volume replication.
//!
//! Every external volume in the source is created in the target at the same
//! storage location. No up-front set comparison against the target: creating
//! and downgrading the conflict to `already_exists` is cheaper than listing
//! both sides first. The owner is reconciled on both paths, since ownership
//! can drift even when the volume itself already exists.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::client::catalog::{CreateVolume, VolumeInfo, VolumeType};
use crate::client::{ApiError, WorkspaceClient};
use crate::executor;
use crate::status::{ObjectKind, ObjectRef, SyncRecord, SyncStatus};
use crate::SyncContext;

pub async fn run(ctx: &SyncContext) -> Result<Vec<SyncRecord>> {
    let mut all = Vec::new();
    for cat in ctx.source.list_catalogs().await? {
        let mut jobs = Vec::new();
        for schema in ctx.source.list_schemas(&cat.name).await? {
            for vol in ctx.source.list_volumes(&cat.name, &schema.name).await? {
                if vol.volume_type != Some(VolumeType::External) {
                    continue;
                }
                let meta = ObjectRef::object(
                    &vol.catalog_name,
                    &vol.schema_name,
                    &vol.name,
                    ObjectKind::Volume,
                );
                let target = Arc::clone(&ctx.target);
                jobs.push(executor::job(meta, create_volume(target, vol)));
            }
        }
        info!(catalog = %cat.name, volumes = jobs.len(), "syncing external volumes");
        all.extend(executor::run_all("volumes", jobs, ctx.config.num_workers).await);
    }
    Ok(all)
}

/// Create one external volume in the target and reconcile its owner.
async fn create_volume(target: Arc<WorkspaceClient>, vol: VolumeInfo) -> SyncStatus {
    let Some(location) = vol.storage_location.as_deref() else {
        return SyncStatus::Failed("external volume has no storage location".into());
    };

    let req = CreateVolume {
        catalog_name: &vol.catalog_name,
        schema_name: &vol.schema_name,
        name: &vol.name,
        volume_type: VolumeType::External,
        storage_location: Some(location),
    };

    match target.create_volume(&req).await {
        Ok(created) => match sync_owner(&target, &created.full_name(), &vol).await {
            Ok(()) => SyncStatus::Created,
            Err(e) => SyncStatus::Failed(format!("created, but owner update failed: {e}")),
        },
        Err(ApiError::AlreadyExists(_)) => {
            match sync_owner(&target, &vol.full_name(), &vol).await {
                Ok(()) => SyncStatus::AlreadyExists,
                Err(e) => SyncStatus::Failed(format!("owner update failed: {e}")),
            }
        }
        Err(e) => SyncStatus::Failed(e.to_string()),
    }
}

async fn sync_owner(
    target: &WorkspaceClient,
    full_name: &str,
    vol: &VolumeInfo,
) -> Result<(), ApiError> {
    if let Some(owner) = vol.owner.as_deref() {
        target.update_volume_owner(full_name, owner).await?;
    }
    Ok(())
}
