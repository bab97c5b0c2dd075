// SPDX-License-Identifier: MIT
//! Schema replication: create, in each catalog, the schemas present in the
//! source but missing in the target, carrying comment and properties.
//!
//! Sequential on purpose — this is a handful of cheap metadata calls per
//! catalog, not a data copy.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{info, warn};

use crate::client::catalog::CreateSchema;
use crate::client::ApiError;
use crate::status::{ObjectRef, SyncRecord, SyncStatus};
use crate::SyncContext;

pub async fn run(ctx: &SyncContext) -> Result<Vec<SyncRecord>> {
    let mut records = Vec::new();
    for cat in ctx.source.list_catalogs().await? {
        let source_schemas = ctx.source.list_schemas(&cat.name).await?;

        let target_names: HashSet<String> = match ctx.target.list_schemas(&cat.name).await {
            Ok(schemas) => schemas.into_iter().map(|s| s.name).collect(),
            Err(ApiError::NotFound(_)) => {
                warn!(catalog = %cat.name, "catalog missing in target; sync metadata and re-run");
                records.push(SyncRecord::new(
                    ObjectRef::catalog(&cat.name),
                    SyncStatus::NotFound,
                ));
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for schema in source_schemas {
            if target_names.contains(&schema.name) {
                continue;
            }
            let meta = ObjectRef::schema(&cat.name, &schema.name);
            let status = match ctx
                .target
                .create_schema(&CreateSchema {
                    name: &schema.name,
                    catalog_name: &cat.name,
                    comment: schema.comment.as_deref(),
                    properties: schema.properties.as_ref(),
                })
                .await
            {
                Ok(_) => {
                    info!(schema = %meta.full_name(), "created schema");
                    SyncStatus::Created
                }
                Err(ApiError::AlreadyExists(_)) => SyncStatus::AlreadyExists,
                Err(e) => SyncStatus::Failed(e.to_string()),
            };
            records.push(SyncRecord::new(meta, status));
        }
    }
    Ok(records)
}
