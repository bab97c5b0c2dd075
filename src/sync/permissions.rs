// SPDX-License-Identifier: MIT
//! Grant replication across the whole securable hierarchy.
//!
//! Must run after metadata sync: only objects that exist in both workspaces
//! are reconciled, and a securable missing in the target is reported as
//! `not_found` and skipped. Per catalog, the catalog securable itself is
//! reconciled first, then schemas, tables, and volumes each go through
//! their own fan-out pool.

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::client::catalog::SecurableType;
use crate::client::WorkspaceClient;
use crate::executor::{self, Job};
use crate::grants;
use crate::status::{ObjectKind, ObjectRef, SyncRecord, SyncStatus};
use crate::SyncContext;

pub async fn run(ctx: &SyncContext) -> Result<Vec<SyncRecord>> {
    let mut all = Vec::new();

    for cat in ctx.source.list_catalogs().await? {
        // Catalog securable first, inline: if the catalog itself is missing
        // in the target, every child securable would report not_found too.
        let status = reconcile(
            Arc::clone(&ctx.source),
            Arc::clone(&ctx.target),
            SecurableType::Catalog,
            cat.name.clone(),
        )
        .await;
        if status == SyncStatus::NotFound {
            error!(catalog = %cat.name, "catalog does not exist in target workspace; sync metadata and re-run");
        }
        all.push(SyncRecord::new(ObjectRef::catalog(&cat.name), status));

        // Schemas.
        let schema_jobs: Vec<Job> = ctx
            .source
            .list_schemas(&cat.name)
            .await?
            .into_iter()
            .map(|s| {
                let meta = ObjectRef::schema(&cat.name, &s.name);
                grant_job(ctx, meta, SecurableType::Schema)
            })
            .collect();
        info!(catalog = %cat.name, schemas = schema_jobs.len(), "syncing schema grants");
        all.extend(executor::run_all("schema grants", schema_jobs, ctx.config.num_workers).await);

        // Tables (views included — grants-wise they are table securables).
        let table_jobs: Vec<Job> = super::tables_in_catalog(&ctx.source, &cat.name)
            .await?
            .into_iter()
            .map(|t| {
                let meta =
                    ObjectRef::object(&cat.name, &t.schema_name, &t.name, ObjectKind::Table);
                grant_job(ctx, meta, SecurableType::Table)
            })
            .collect();
        info!(catalog = %cat.name, tables = table_jobs.len(), "syncing table grants");
        all.extend(executor::run_all("table grants", table_jobs, ctx.config.num_workers).await);

        // Volumes.
        let volume_jobs: Vec<Job> = super::volumes_in_catalog(&ctx.source, &cat.name)
            .await?
            .into_iter()
            .map(|v| {
                let meta =
                    ObjectRef::object(&cat.name, &v.schema_name, &v.name, ObjectKind::Volume);
                grant_job(ctx, meta, SecurableType::Volume)
            })
            .collect();
        info!(catalog = %cat.name, volumes = volume_jobs.len(), "syncing volume grants");
        all.extend(executor::run_all("volume grants", volume_jobs, ctx.config.num_workers).await);
    }
    Ok(all)
}

fn grant_job(ctx: &SyncContext, meta: ObjectRef, securable: SecurableType) -> Job {
    let source = Arc::clone(&ctx.source);
    let target = Arc::clone(&ctx.target);
    let full_name = meta.full_name();
    executor::job(meta, reconcile(source, target, securable, full_name))
}

async fn reconcile(
    source: Arc<WorkspaceClient>,
    target: Arc<WorkspaceClient>,
    securable: SecurableType,
    full_name: String,
) -> SyncStatus {
    match grants::reconcile(&source, &target, securable, &full_name).await {
        Ok(status) => status,
        Err(e) => SyncStatus::Failed(e.to_string()),
    }
}
