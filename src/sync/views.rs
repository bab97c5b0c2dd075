// SPDX-License-Identifier: MIT
//! View replication: re-create every source view in the target with
//! `CREATE OR REPLACE VIEW`, using the view definition text captured from
//! the source table listing.
//!
//! The underlying tables must already exist in the target (table sync runs
//! first); a view over a missing table fails its own job and nothing else.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::client::catalog::TableType;
use crate::executor;
use crate::status::{ObjectKind, ObjectRef, SyncRecord, SyncStatus};
use crate::SyncContext;

pub async fn run(ctx: &SyncContext) -> Result<Vec<SyncRecord>> {
    let warehouse = ctx.config.require_warehouse()?.to_string();
    let runner = ctx.statement_runner();
    let mut all = Vec::new();

    for cat in ctx.source.list_catalogs().await? {
        let views: Vec<_> = super::tables_in_catalog(&ctx.source, &cat.name)
            .await?
            .into_iter()
            .filter(|t| t.table_type == Some(TableType::View))
            .collect();

        let mut jobs = Vec::new();
        for v in views {
            let meta = ObjectRef::object(&cat.name, &v.schema_name, &v.name, ObjectKind::View);

            let Some(definition) = v.view_definition.as_deref() else {
                all.push(SyncRecord::new(
                    meta,
                    SyncStatus::Failed("view has no definition".into()),
                ));
                continue;
            };

            let statement = format!(
                "CREATE OR REPLACE VIEW {}.{}.{} AS {}",
                cat.name, v.schema_name, v.name, definition
            );
            let target = Arc::clone(&ctx.target);
            let runner = runner.clone();
            let warehouse = warehouse.clone();
            jobs.push(executor::job(meta, async move {
                super::managed_tables::clone_table(&target, &runner, &warehouse, &statement).await
            }));
        }
        info!(catalog = %cat.name, views = jobs.len(), "recreating views");
        all.extend(executor::run_all("views", jobs, ctx.config.num_workers).await);
    }
    Ok(all)
}
