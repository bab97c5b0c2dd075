// SPDX-License-Identifier: MIT
//! Catalog-service surface: catalogs, schemas, tables, volumes, external
//! locations, and grants.
//!
//! Response types carry only the fields the replication tasks consume;
//! unknown fields are ignored on deserialization. List endpoints follow
//! `next_page_token` pagination transparently.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ApiError, WorkspaceClient};

const UC: &str = "/api/2.1/unity-catalog";

// ─── Securables ───────────────────────────────────────────────────────────────

/// Access-controlled object kinds addressable by the grants API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurableType {
    Catalog,
    Schema,
    Table,
    Volume,
}

impl SecurableType {
    /// Path segment used by the permissions endpoints.
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurableType::Catalog => "catalog",
            SecurableType::Schema => "schema",
            SecurableType::Table => "table",
            SecurableType::Volume => "volume",
        }
    }
}

impl std::fmt::Display for SecurableType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Catalog / schema / table / volume info ──────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogType {
    ManagedCatalog,
    DeltasharingCatalog,
    SystemCatalog,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogInfo {
    pub name: String,
    #[serde(default)]
    pub catalog_type: Option<CatalogType>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    pub catalog_name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub properties: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    Managed,
    External,
    View,
    MaterializedView,
    StreamingTable,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub catalog_name: String,
    pub schema_name: String,
    #[serde(default)]
    pub table_type: Option<TableType>,
    #[serde(default)]
    pub storage_location: Option<String>,
    #[serde(default)]
    pub view_definition: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeType {
    External,
    Managed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeInfo {
    pub name: String,
    pub catalog_name: String,
    pub schema_name: String,
    #[serde(default)]
    pub volume_type: Option<VolumeType>,
    #[serde(default)]
    pub storage_location: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl VolumeInfo {
    pub fn full_name(&self) -> String {
        self.full_name.clone().unwrap_or_else(|| {
            format!("{}.{}.{}", self.catalog_name, self.schema_name, self.name)
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalLocationInfo {
    pub name: String,
    pub url: String,
}

// ─── Grants ──────────────────────────────────────────────────────────────────

/// One privilege as reported by the effective-permissions endpoint. The
/// privilege itself can be absent on inherited placeholder entries.
#[derive(Debug, Clone, Deserialize)]
pub struct EffectivePrivilege {
    #[serde(default)]
    pub privilege: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrivilegeAssignment {
    pub principal: String,
    #[serde(default)]
    pub privileges: Vec<EffectivePrivilege>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EffectivePermissions {
    #[serde(default)]
    pub privilege_assignments: Vec<PrivilegeAssignment>,
}

/// One principal's additive/subtractive change in a batched grants update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionsChange {
    pub principal: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CreateSchema<'a> {
    pub name: &'a str,
    pub catalog_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<&'a HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateVolume<'a> {
    pub catalog_name: &'a str,
    pub schema_name: &'a str,
    pub name: &'a str,
    pub volume_type: VolumeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<&'a str>,
}

/// Create a catalog in the target workspace backed by a provider's share.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSharedCatalog<'a> {
    pub name: &'a str,
    pub provider_name: &'a str,
    pub share_name: &'a str,
}

// ─── Paged list envelopes ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CatalogList {
    #[serde(default)]
    catalogs: Vec<CatalogInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SchemaList {
    #[serde(default)]
    schemas: Vec<SchemaInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableList {
    #[serde(default)]
    tables: Vec<TableInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VolumeList {
    #[serde(default)]
    volumes: Vec<VolumeInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalLocationList {
    #[serde(default)]
    external_locations: Vec<ExternalLocationInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

// ─── Endpoints ───────────────────────────────────────────────────────────────

impl WorkspaceClient {
    pub async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>, ApiError> {
        let mut out = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(t) = token.as_deref() {
                query.push(("page_token", t));
            }
            let page: CatalogList = self.get_json(&format!("{UC}/catalogs"), &query).await?;
            out.extend(page.catalogs);
            match page.next_page_token {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => return Ok(out),
            }
        }
    }

    pub async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>, ApiError> {
        let mut out = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut query = vec![("catalog_name", catalog)];
            if let Some(t) = token.as_deref() {
                query.push(("page_token", t));
            }
            let page: SchemaList = self.get_json(&format!("{UC}/schemas"), &query).await?;
            out.extend(page.schemas);
            match page.next_page_token {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => return Ok(out),
            }
        }
    }

    pub async fn create_schema(&self, req: &CreateSchema<'_>) -> Result<SchemaInfo, ApiError> {
        self.post_json(&format!("{UC}/schemas"), req).await
    }

    pub async fn list_tables(
        &self,
        catalog: &str,
        schema: &str,
    ) -> Result<Vec<TableInfo>, ApiError> {
        let mut out = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut query = vec![("catalog_name", catalog), ("schema_name", schema)];
            if let Some(t) = token.as_deref() {
                query.push(("page_token", t));
            }
            let page: TableList = self.get_json(&format!("{UC}/tables"), &query).await?;
            out.extend(page.tables);
            match page.next_page_token {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => return Ok(out),
            }
        }
    }

    pub async fn list_volumes(
        &self,
        catalog: &str,
        schema: &str,
    ) -> Result<Vec<VolumeInfo>, ApiError> {
        let mut out = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut query = vec![("catalog_name", catalog), ("schema_name", schema)];
            if let Some(t) = token.as_deref() {
                query.push(("page_token", t));
            }
            let page: VolumeList = self.get_json(&format!("{UC}/volumes"), &query).await?;
            out.extend(page.volumes);
            match page.next_page_token {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => return Ok(out),
            }
        }
    }

    pub async fn create_volume(&self, req: &CreateVolume<'_>) -> Result<VolumeInfo, ApiError> {
        self.post_json(&format!("{UC}/volumes"), req).await
    }

    /// Reconcile a volume's owner. Issued on both the freshly-created and the
    /// already-exists paths, since ownership can drift independently.
    pub async fn update_volume_owner(
        &self,
        full_name: &str,
        owner: &str,
    ) -> Result<VolumeInfo, ApiError> {
        self.patch_json(
            &format!("{UC}/volumes/{full_name}"),
            &serde_json::json!({ "owner": owner }),
        )
        .await
    }

    pub async fn create_shared_catalog(
        &self,
        req: &CreateSharedCatalog<'_>,
    ) -> Result<CatalogInfo, ApiError> {
        self.post_json(&format!("{UC}/catalogs"), req).await
    }

    pub async fn list_external_locations(&self) -> Result<Vec<ExternalLocationInfo>, ApiError> {
        let mut out = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(t) = token.as_deref() {
                query.push(("page_token", t));
            }
            let page: ExternalLocationList = self
                .get_json(&format!("{UC}/external-locations"), &query)
                .await?;
            out.extend(page.external_locations);
            match page.next_page_token {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => return Ok(out),
            }
        }
    }

    /// Effective grants on one securable, inherited entries included.
    pub async fn get_effective_permissions(
        &self,
        securable: SecurableType,
        full_name: &str,
    ) -> Result<EffectivePermissions, ApiError> {
        self.get_json(
            &format!("{UC}/effective-permissions/{}/{full_name}", securable.as_str()),
            &[],
        )
        .await
    }

    /// Apply a batched grants update to one securable. All changes land in a
    /// single call; the platform applies them atomically per request.
    pub async fn update_permissions(
        &self,
        securable: SecurableType,
        full_name: &str,
        changes: &[PermissionsChange],
    ) -> Result<serde_json::Value, ApiError> {
        self.patch_json(
            &format!("{UC}/permissions/{}/{full_name}", securable.as_str()),
            &serde_json::json!({ "changes": changes }),
        )
        .await
    }
}
