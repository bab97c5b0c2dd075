// SPDX-License-Identifier: MIT
//! Delta-Sharing surface: shares, recipients, providers.
//!
//! Managed-table replication rides on sharing: the source exposes each
//! catalog as a share to a recipient representing the target metastore, and
//! the target mounts it through the matching provider.

use serde::{Deserialize, Serialize};

use super::catalog::PermissionsChange;
use super::{ApiError, WorkspaceClient};

const UC: &str = "/api/2.1/unity-catalog";

#[derive(Debug, Clone, Deserialize)]
pub struct ShareInfo {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipientInfo {
    pub name: String,
    #[serde(default)]
    pub data_recipient_global_metastore_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    #[serde(default)]
    pub data_provider_global_metastore_id: Option<String>,
}

/// `ADD`/`REMOVE` actions on a share's data objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SharedObjectAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, Serialize)]
pub struct SharedDataObject<'a> {
    pub name: &'a str,
    pub data_object_type: &'a str,
    pub status: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SharedDataObjectUpdate<'a> {
    pub action: SharedObjectAction,
    pub data_object: SharedDataObject<'a>,
}

impl<'a> SharedDataObjectUpdate<'a> {
    /// Add one schema (and everything under it) to a share.
    pub fn add_schema(full_name: &'a str) -> Self {
        Self {
            action: SharedObjectAction::Add,
            data_object: SharedDataObject {
                name: full_name,
                data_object_type: "SCHEMA",
                status: "ACTIVE",
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecipientList {
    #[serde(default)]
    recipients: Vec<RecipientInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderList {
    #[serde(default)]
    providers: Vec<ProviderInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl WorkspaceClient {
    pub async fn create_share(&self, name: &str) -> Result<ShareInfo, ApiError> {
        self.post_json(&format!("{UC}/shares"), &serde_json::json!({ "name": name }))
            .await
    }

    pub async fn update_share(
        &self,
        name: &str,
        updates: &[SharedDataObjectUpdate<'_>],
    ) -> Result<ShareInfo, ApiError> {
        self.patch_json(
            &format!("{UC}/shares/{name}"),
            &serde_json::json!({ "updates": updates }),
        )
        .await
    }

    pub async fn update_share_permissions(
        &self,
        name: &str,
        changes: &[PermissionsChange],
    ) -> Result<serde_json::Value, ApiError> {
        self.patch_json(
            &format!("{UC}/shares/{name}/permissions"),
            &serde_json::json!({ "changes": changes }),
        )
        .await
    }

    /// Register the target metastore as a sharing recipient in this (source)
    /// workspace.
    pub async fn create_recipient(
        &self,
        name: &str,
        global_metastore_id: &str,
    ) -> Result<RecipientInfo, ApiError> {
        self.post_json(
            &format!("{UC}/recipients"),
            &serde_json::json!({
                "name": name,
                "authentication_type": "DATABRICKS",
                "data_recipient_global_metastore_id": global_metastore_id,
            }),
        )
        .await
    }

    pub async fn list_recipients(&self) -> Result<Vec<RecipientInfo>, ApiError> {
        let mut out = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(t) = token.as_deref() {
                query.push(("page_token", t));
            }
            let page: RecipientList = self.get_json(&format!("{UC}/recipients"), &query).await?;
            out.extend(page.recipients);
            match page.next_page_token {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => return Ok(out),
            }
        }
    }

    pub async fn list_providers(&self) -> Result<Vec<ProviderInfo>, ApiError> {
        let mut out = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut query: Vec<(&str, &str)> = Vec::new();
            if let Some(t) = token.as_deref() {
                query.push(("page_token", t));
            }
            let page: ProviderList = self.get_json(&format!("{UC}/providers"), &query).await?;
            out.extend(page.providers);
            match page.next_page_token {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => return Ok(out),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_schema_update_serializes_to_platform_shape() {
        let u = SharedDataObjectUpdate::add_schema("main.silver");
        let json = serde_json::to_value(&u).unwrap();
        assert_eq!(json["action"], "ADD");
        assert_eq!(json["data_object"]["name"], "main.silver");
        assert_eq!(json["data_object"]["data_object_type"], "SCHEMA");
        assert_eq!(json["data_object"]["status"], "ACTIVE");
    }
}
