// SPDX-License-Identifier: MIT
//! Managed-table replication over Delta Sharing.
//!
//! The source exposes each managed catalog as `{catalog}_share` to a
//! recipient standing for the target metastore; the target mounts the share
//! through its provider as a `{catalog}_share` catalog, then deep-clones
//! every table out of the mounted catalog into the real one on a SQL
//! warehouse.
//!
//! Missing prerequisites (recipient that cannot be created or found,
//! provider absent in the target) are fatal: nothing can be cloned without
//! them, so the run aborts instead of producing a wall of per-table
//! failures.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{info, warn};

use crate::client::catalog::{CreateSharedCatalog, PermissionsChange, TableType};
use crate::client::sharing::{ProviderInfo, RecipientInfo, SharedDataObjectUpdate};
use crate::client::sql::StatementRunner;
use crate::client::WorkspaceClient;
use crate::executor;
use crate::status::{ObjectKind, ObjectRef, SyncRecord, SyncStatus};
use crate::SyncContext;

pub async fn run(ctx: &SyncContext) -> Result<Vec<SyncRecord>> {
    let warehouse = ctx.config.require_warehouse()?.to_string();
    let source_metastore = ctx.config.require_source_metastore()?.to_string();
    let target_metastore = ctx.config.require_target_metastore()?.to_string();

    let recipient =
        ensure_recipient(&ctx.source, &ctx.config.recipient_name, &target_metastore).await?;
    let provider = find_provider(&ctx.target, &source_metastore).await?;
    info!(recipient = %recipient.name, provider = %provider.name, "sharing prerequisites resolved");

    let runner = ctx.statement_runner();
    let mut all = Vec::new();

    for cat in super::managed_catalogs(&ctx.source).await? {
        let share_name = format!("{}_share", cat.name);
        ensure_share(ctx, &share_name, &recipient).await?;

        let tables: Vec<_> = super::tables_in_catalog(&ctx.source, &cat.name)
            .await?
            .into_iter()
            .filter(|t| t.table_type == Some(TableType::Managed))
            .collect();

        // Every distinct schema goes into the share; the share then carries
        // all current and future tables under it.
        let schemas: BTreeSet<String> = tables.iter().map(|t| t.schema_name.clone()).collect();
        let qualified: Vec<String> = schemas
            .iter()
            .map(|s| format!("{}.{s}", cat.name))
            .collect();
        let updates: Vec<SharedDataObjectUpdate<'_>> = qualified
            .iter()
            .map(|q| SharedDataObjectUpdate::add_schema(q))
            .collect();
        if !updates.is_empty() {
            if let Err(e) = ctx.source.update_share(&share_name, &updates).await {
                warn!(share = %share_name, "error updating share data objects: {e}");
            }
        }

        match ctx
            .target
            .create_shared_catalog(&CreateSharedCatalog {
                name: &share_name,
                provider_name: &provider.name,
                share_name: &share_name,
            })
            .await
        {
            Ok(_) => info!(catalog = %share_name, "mounted shared catalog in target"),
            Err(e) if e.is_already_exists() => {
                info!(catalog = %share_name, "shared catalog already exists, skipping creation")
            }
            Err(e) => return Err(e.into()),
        }

        let mut jobs = Vec::new();
        for t in tables {
            let statement = format!(
                "CREATE OR REPLACE TABLE {0}.{1}.{2} DEEP CLONE {3}.{1}.{2}",
                cat.name, t.schema_name, t.name, share_name
            );
            let meta = ObjectRef::object(&cat.name, &t.schema_name, &t.name, ObjectKind::Table);
            let target = Arc::clone(&ctx.target);
            let runner = runner.clone();
            let warehouse = warehouse.clone();
            jobs.push(executor::job(meta, async move {
                clone_table(&target, &runner, &warehouse, &statement).await
            }));
        }
        info!(catalog = %cat.name, tables = jobs.len(), "cloning managed tables");
        all.extend(executor::run_all("managed tables", jobs, ctx.config.num_workers).await);
    }
    Ok(all)
}

pub(crate) async fn clone_table(
    target: &WorkspaceClient,
    runner: &StatementRunner,
    warehouse: &str,
    statement: &str,
) -> SyncStatus {
    match runner.run(target, warehouse, statement).await {
        Ok(()) => SyncStatus::Created,
        Err(e) => SyncStatus::Failed(e.to_string()),
    }
}

/// Create the share and grant the recipient SELECT on it.
async fn ensure_share(
    ctx: &SyncContext,
    share_name: &str,
    recipient: &RecipientInfo,
) -> Result<()> {
    match ctx.source.create_share(share_name).await {
        Ok(_) => info!(share = %share_name, "created share"),
        Err(e) if e.is_already_exists() => {
            info!(share = %share_name, "share already exists, skipping creation")
        }
        Err(e) => return Err(e.into()),
    }

    let grant = PermissionsChange {
        principal: recipient.name.clone(),
        add: vec!["SELECT".to_string()],
        remove: vec![],
    };
    if let Err(e) = ctx
        .source
        .update_share_permissions(share_name, &[grant])
        .await
    {
        warn!(share = %share_name, "could not update share permissions: {e}");
    }
    Ok(())
}

/// Create (or look up) the recipient standing for the target metastore.
async fn ensure_recipient(
    source: &WorkspaceClient,
    name: &str,
    target_metastore: &str,
) -> Result<RecipientInfo> {
    match source.create_recipient(name, target_metastore).await {
        Ok(r) => {
            info!(recipient = %r.name, metastore = %target_metastore, "created recipient");
            Ok(r)
        }
        Err(e) if e.is_already_exists() => source
            .list_recipients()
            .await?
            .into_iter()
            .find(|r| r.data_recipient_global_metastore_id.as_deref() == Some(target_metastore))
            .with_context(|| {
                format!(
                    "recipient for metastore {target_metastore} does not exist in the source \
                     workspace; validate the id and create it manually"
                )
            }),
        Err(e) => Err(e.into()),
    }
}

/// Resolve the provider in the target matching the source metastore. Its
/// name is workspace-assigned and not necessarily the metastore id.
async fn find_provider(target: &WorkspaceClient, source_metastore: &str) -> Result<ProviderInfo> {
    target
        .list_providers()
        .await?
        .into_iter()
        .find(|p| p.data_provider_global_metastore_id.as_deref() == Some(source_metastore))
        .with_context(|| {
            format!(
                "provider for metastore {source_metastore} could not be found in the target \
                 workspace; check that it was created"
            )
        })
}
