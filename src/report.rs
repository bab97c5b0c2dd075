// SPDX-License-Identifier: MIT
//! Post-batch status reporting.
//!
//! Each task run ends with an aligned status table on stdout (catalog,
//! schema, object, status, timestamp) and a one-line per-status summary in
//! the log. Records are only persisted when `--write-results` names a path.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::info;

use crate::status::SyncRecord;

const HEADERS: [&str; 5] = ["CATALOG", "SCHEMA", "OBJECT", "STATUS", "COMPLETED"];

/// Render the records as an aligned text table.
pub fn render_table(records: &[SyncRecord]) -> String {
    let mut rows: Vec<[String; 5]> = Vec::with_capacity(records.len());
    for r in records {
        rows.push([
            r.catalog.clone(),
            r.schema.clone(),
            r.object.clone(),
            r.status.to_string(),
            r.completed_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ]);
    }

    let mut widths: [usize; 5] = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let write_row = |out: &mut String, cells: &[String; 5]| {
        for (i, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
            if i > 0 {
                out.push_str("  ");
            }
            out.push_str(cell);
            out.extend(std::iter::repeat(' ').take(width - cell.len()));
        }
        // Trim the padding on the last column.
        while out.ends_with(' ') {
            out.pop();
        }
        out.push('\n');
    };

    write_row(&mut out, &HEADERS.map(String::from));
    for row in &rows {
        write_row(&mut out, row);
    }
    out
}

/// Print the table and log a per-status count summary.
pub fn print(task: &str, records: &[SyncRecord]) {
    if records.is_empty() {
        info!(task, "nothing to sync");
        return;
    }
    println!("{}", render_table(records));

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records {
        *counts.entry(r.status.label()).or_default() += 1;
    }
    let summary = counts
        .iter()
        .map(|(status, n)| format!("{status}={n}"))
        .collect::<Vec<_>>()
        .join(" ");
    info!(task, total = records.len(), %summary, "batch complete");
}

/// Serialize the records as JSON to `path`.
pub fn write_json(path: &Path, records: &[SyncRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)
        .with_context(|| format!("writing results to {}", path.display()))?;
    info!(path = %path.display(), count = records.len(), "wrote results");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{ObjectKind, ObjectRef, SyncStatus};

    fn record(catalog: &str, object: &str, status: SyncStatus) -> SyncRecord {
        SyncRecord::new(
            ObjectRef::object(catalog, "s1", object, ObjectKind::Table),
            status,
        )
    }

    #[test]
    fn table_is_aligned() {
        let records = vec![
            record("main", "t1", SyncStatus::Created),
            record("a-much-longer-catalog", "t2", SyncStatus::AlreadyExists),
        ];
        let table = render_table(&records);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("CATALOG"));
        // Every row starts its SCHEMA column at the same offset.
        let offset = lines[1].find("s1").unwrap();
        assert_eq!(lines[2].find("s1").unwrap(), offset);
    }

    #[test]
    fn failure_message_appears_in_status_column() {
        let records = vec![record("main", "t1", SyncStatus::Failed("boom".into()))];
        assert!(render_table(&records).contains("failed: boom"));
    }

    #[test]
    fn write_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let records = vec![record("main", "t1", SyncStatus::Created)];
        write_json(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["catalog"], "main");
        assert_eq!(parsed[0]["status"], "created");
    }
}
