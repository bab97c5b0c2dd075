// SPDX-License-Identifier: MIT
//! Storage-location remapping for external-table clones.
//!
//! An external table's data lives under some registered external location in
//! the source workspace. To clone it, the table's absolute storage path has to
//! be re-rooted onto the *same-named* external location in the target
//! workspace: find the source location whose URL prefixes the path, strip the
//! prefix, reattach the suffix to the target location's URL.
//!
//! A path that no source location prefixes, or a matched location with no
//! counterpart in the target, is a hard error. Cloning to a guessed path
//! would silently land data in the wrong container.

use std::collections::HashMap;

use crate::client::catalog::ExternalLocationInfo;

/// Remap failure for one storage path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemapError {
    #[error("no external location prefixes storage path {0}")]
    NoMatchingLocation(String),
    #[error("external location {0} has no counterpart in the target workspace")]
    MissingTargetLocation(String),
}

/// Prefix table built from the source and target external-location inventories.
#[derive(Debug, Clone)]
pub struct LocationMap {
    /// (name, url) pairs from the source workspace, longest URL first so the
    /// most specific registered prefix wins.
    source: Vec<(String, String)>,
    /// name → url in the target workspace.
    target: HashMap<String, String>,
}

impl LocationMap {
    pub fn new(source: &[ExternalLocationInfo], target: &[ExternalLocationInfo]) -> Self {
        let mut src: Vec<(String, String)> = source
            .iter()
            .map(|l| (l.name.clone(), normalize(&l.url)))
            .collect();
        src.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        let tgt = target
            .iter()
            .map(|l| (l.name.clone(), normalize(&l.url)))
            .collect();
        Self {
            source: src,
            target: tgt,
        }
    }

    /// Translate a source storage path into the target workspace.
    pub fn remap(&self, path: &str) -> Result<String, RemapError> {
        for (name, url) in &self.source {
            let Some(suffix) = path.strip_prefix(url.as_str()) else {
                continue;
            };
            // Guard against partial-segment matches: "…/base" must not claim
            // "…/based/x".
            if !suffix.is_empty() && !suffix.starts_with('/') {
                continue;
            }
            let target_url = self
                .target
                .get(name)
                .ok_or_else(|| RemapError::MissingTargetLocation(name.clone()))?;
            return Ok(format!("{target_url}{suffix}"));
        }
        Err(RemapError::NoMatchingLocation(path.to_string()))
    }
}

/// Registered location URLs sometimes carry a trailing slash; paths never do.
fn normalize(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
