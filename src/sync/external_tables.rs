// SPDX-License-Identifier: MIT
//! External-table replication.
//!
//! External tables are not shareable the way managed tables are; instead
//! each table's storage path is re-rooted onto the target workspace's
//! same-named external location and deep-cloned directly from the source
//! path. A path that cannot be remapped fails that table's job loudly and
//! the batch moves on.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::client::catalog::TableType;
use crate::executor;
use crate::remap::LocationMap;
use crate::status::{ObjectKind, ObjectRef, SyncRecord, SyncStatus};
use crate::SyncContext;

pub async fn run(ctx: &SyncContext) -> Result<Vec<SyncRecord>> {
    let warehouse = ctx.config.require_warehouse()?.to_string();

    let source_locations = ctx.source.list_external_locations().await?;
    let target_locations = ctx.target.list_external_locations().await?;
    let locations = LocationMap::new(&source_locations, &target_locations);

    let runner = ctx.statement_runner();
    let mut all = Vec::new();

    for cat in super::managed_catalogs(&ctx.source).await? {
        let tables: Vec<_> = super::tables_in_catalog(&ctx.source, &cat.name)
            .await?
            .into_iter()
            .filter(|t| t.table_type == Some(TableType::External))
            .collect();

        let mut jobs = Vec::new();
        for t in tables {
            let meta = ObjectRef::object(&cat.name, &t.schema_name, &t.name, ObjectKind::Table);

            let Some(source_location) = t.storage_location.as_deref() else {
                all.push(SyncRecord::new(
                    meta,
                    SyncStatus::Failed("external table has no storage location".into()),
                ));
                continue;
            };
            let target_location = match locations.remap(source_location) {
                Ok(loc) => loc,
                Err(e) => {
                    all.push(SyncRecord::new(meta, SyncStatus::Failed(e.to_string())));
                    continue;
                }
            };

            let statement = format!(
                "CREATE OR REPLACE TABLE {}.{}.{} DEEP CLONE delta.`{}` LOCATION '{}'",
                cat.name, t.schema_name, t.name, source_location, target_location
            );
            let target = Arc::clone(&ctx.target);
            let runner = runner.clone();
            let warehouse = warehouse.clone();
            jobs.push(executor::job(meta, async move {
                super::managed_tables::clone_table(&target, &runner, &warehouse, &statement).await
            }));
        }
        info!(catalog = %cat.name, tables = jobs.len(), "cloning external tables");
        all.extend(executor::run_all("external tables", jobs, ctx.config.num_workers).await);
    }
    Ok(all)
}
