// SPDX-License-Identifier: MIT
//! Replication tasks — one module per object family, all built on the same
//! client + executor + status plumbing.
//!
//! Every task iterates source catalogs, builds a batch of per-object jobs,
//! and hands them to the fan-out executor; the pool is drained completely
//! before the next catalog starts.

pub mod external_tables;
pub mod managed_tables;
pub mod permissions;
pub mod schemas;
pub mod views;
pub mod volumes;

use crate::client::catalog::{CatalogInfo, CatalogType, TableInfo, VolumeInfo};
use crate::client::{ApiError, WorkspaceClient};

/// Source catalogs eligible for share-based replication.
pub(crate) async fn managed_catalogs(
    client: &WorkspaceClient,
) -> Result<Vec<CatalogInfo>, ApiError> {
    Ok(client
        .list_catalogs()
        .await?
        .into_iter()
        .filter(|c| c.catalog_type == Some(CatalogType::ManagedCatalog))
        .collect())
}

/// All tables in a catalog, `information_schema` excluded.
pub(crate) async fn tables_in_catalog(
    client: &WorkspaceClient,
    catalog: &str,
) -> Result<Vec<TableInfo>, ApiError> {
    let mut out = Vec::new();
    for schema in client.list_schemas(catalog).await? {
        if schema.name == "information_schema" {
            continue;
        }
        out.extend(client.list_tables(catalog, &schema.name).await?);
    }
    Ok(out)
}

/// All volumes in a catalog.
pub(crate) async fn volumes_in_catalog(
    client: &WorkspaceClient,
    catalog: &str,
) -> Result<Vec<VolumeInfo>, ApiError> {
    let mut out = Vec::new();
    for schema in client.list_schemas(catalog).await? {
        out.extend(client.list_volumes(catalog, &schema.name).await?);
    }
    Ok(out)
}
