// SPDX-License-Identifier: MIT
//! Flight-delay dataset readers — batch and streaming.
//!
//! Unrelated to workspace replication; kept alongside it as in the original
//! repo. The dataset is the airline on-time-performance CSV dump:
//! headerless, 31 columns, with `NA` standing in for missing numerics.
//!
//! Two entry points:
//! - [`read_batch`]: deserialize every `*.csv` under a directory at once.
//! - [`stream`]: autoloader-style — emit records from files already present,
//!   then keep watching the directory and emit records from newly arriving
//!   files until the receiver is dropped.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify_debouncer_full::{new_debouncer, notify::RecursiveMode, notify::Watcher, DebounceEventResult};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);
const SHUTDOWN_PROBE: Duration = Duration::from_millis(500);
const STREAM_BUFFER: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum FlightError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// `NA` and empty cells mean "missing" in the numeric columns.
fn na_i32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
    let raw = String::deserialize(d)?;
    match raw.trim() {
        "" | "NA" => Ok(None),
        v => v.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// One row of the on-time-performance dump, fields in file order.
///
/// Column typing follows the original schema: scheduled fields are numeric,
/// actual times and delay columns stay as raw strings (they mix minutes and
/// `NA` freely and downstream consumers parse them per use).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlightRecord {
    #[serde(deserialize_with = "na_i32")]
    pub year: Option<i32>,
    #[serde(deserialize_with = "na_i32")]
    pub month: Option<i32>,
    #[serde(deserialize_with = "na_i32")]
    pub day_of_month: Option<i32>,
    #[serde(deserialize_with = "na_i32")]
    pub day_of_week: Option<i32>,
    pub dep_time: String,
    #[serde(deserialize_with = "na_i32")]
    pub crs_dep_time: Option<i32>,
    pub arr_time: String,
    #[serde(deserialize_with = "na_i32")]
    pub crs_arr_time: Option<i32>,
    pub unique_carrier: String,
    #[serde(deserialize_with = "na_i32")]
    pub flight_num: Option<i32>,
    pub tail_num: String,
    pub actual_elapsed_time: String,
    #[serde(deserialize_with = "na_i32")]
    pub crs_elapsed_time: Option<i32>,
    pub air_time: String,
    pub arr_delay: String,
    pub dep_delay: String,
    pub origin: String,
    pub dest: String,
    pub distance: String,
    pub taxi_in: String,
    pub taxi_out: String,
    #[serde(deserialize_with = "na_i32")]
    pub cancelled: Option<i32>,
    pub cancellation_code: String,
    #[serde(deserialize_with = "na_i32")]
    pub diverted: Option<i32>,
    pub carrier_delay: String,
    pub weather_delay: String,
    pub nas_delay: String,
    pub security_delay: String,
    pub late_aircraft_delay: String,
    pub is_arr_delayed: String,
    pub is_dep_delayed: String,
}

/// Read every `*.csv` file under `dir` (sorted by name) into memory.
pub fn read_batch(dir: &Path) -> Result<Vec<FlightRecord>, FlightError> {
    let mut records = Vec::new();
    for path in list_csv_files(dir)? {
        records.extend(read_file(&path)?);
    }
    Ok(records)
}

fn read_file(path: &Path) -> Result<Vec<FlightRecord>, FlightError> {
    debug!(path = %path.display(), "reading flight file");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

fn list_csv_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_csv(p))
        .collect();
    files.sort();
    Ok(files)
}

fn is_csv(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "csv")
}

/// Stream records from `dir`: existing files first, then newly arriving
/// ones. The watcher thread exits when the returned stream is dropped.
pub fn stream(dir: impl Into<PathBuf>) -> ReceiverStream<FlightRecord> {
    let dir = dir.into();
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    std::thread::spawn(move || watch_worker(dir, tx));
    ReceiverStream::new(rx)
}

fn watch_worker(dir: PathBuf, tx: mpsc::Sender<FlightRecord>) {
    let mut seen: HashSet<PathBuf> = HashSet::new();

    // Watch before the initial listing: a file landing in between is then
    // either in the listing or in an event, and `seen` deduplicates.
    let (event_tx, event_rx) = std::sync::mpsc::channel();
    let mut debouncer = match new_debouncer(DEBOUNCE_WINDOW, None, move |res: DebounceEventResult| {
        let _ = event_tx.send(res);
    }) {
        Ok(d) => d,
        Err(e) => {
            warn!("cannot create file watcher: {e}");
            return;
        }
    };
    if let Err(e) = debouncer.watcher().watch(&dir, RecursiveMode::NonRecursive) {
        warn!(dir = %dir.display(), "cannot watch flight directory: {e}");
        return;
    }

    match list_csv_files(&dir) {
        Ok(files) => {
            for path in files {
                seen.insert(path.clone());
                if !send_file(&tx, &path) {
                    return;
                }
            }
        }
        Err(e) => {
            warn!(dir = %dir.display(), "cannot list flight directory: {e}");
            return;
        }
    }

    loop {
        match event_rx.recv_timeout(SHUTDOWN_PROBE) {
            Ok(Ok(events)) => {
                for event in &events {
                    for path in &event.paths {
                        if !is_csv(path) || seen.contains(path) {
                            continue;
                        }
                        seen.insert(path.clone());
                        if !send_file(&tx, path) {
                            return;
                        }
                    }
                }
            }
            Ok(Err(errors)) => {
                for e in errors {
                    warn!("watch error: {e}");
                }
            }
            // No events: probe whether the consumer is still there.
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                if tx.is_closed() {
                    return;
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Returns false when the receiver is gone and the worker should stop.
fn send_file(tx: &mpsc::Sender<FlightRecord>, path: &Path) -> bool {
    match read_file(path) {
        Ok(records) => {
            for record in records {
                if tx.blocking_send(record).is_err() {
                    return false;
                }
            }
            true
        }
        Err(e) => {
            // A malformed file should not kill the stream.
            warn!(path = %path.display(), "skipping unreadable flight file: {e}");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tokio_stream::StreamExt as _;

    const ROW_OK: &str = "2008,1,3,4,2003,1955,2211,2225,WN,335,N712SW,128,150,116,-14,8,IAD,TPA,810,4,8,0,,0,NA,NA,NA,NA,NA,NO,NO";
    const ROW_NA: &str = "2008,1,NA,4,NA,1955,NA,2225,WN,NA,N712SW,NA,150,NA,NA,NA,IAD,TPA,810,4,8,1,A,0,NA,NA,NA,NA,NA,YES,NO";

    fn write_csv(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        for row in rows {
            writeln!(f, "{row}").unwrap();
        }
        path
    }

    #[test]
    fn batch_reads_all_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "a.csv", &[ROW_OK, ROW_OK]);
        write_csv(dir.path(), "b.csv", &[ROW_NA]);
        // Non-csv files are ignored.
        write_csv(dir.path(), "notes.txt", &[ROW_OK]);

        let records = read_batch(dir.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].unique_carrier, "WN");
        assert_eq!(records[0].year, Some(2008));
    }

    #[test]
    fn na_and_empty_numerics_become_none() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "na.csv", &[ROW_NA]);

        let records = read_batch(dir.path()).unwrap();
        assert_eq!(records[0].day_of_month, None);
        assert_eq!(records[0].crs_dep_time, None);
        assert_eq!(records[0].flight_num, None);
        assert_eq!(records[0].cancelled, Some(1));
        assert_eq!(records[0].cancellation_code, "A");
        // Delay columns stay raw.
        assert_eq!(records[0].arr_delay, "NA");
    }

    #[test]
    fn malformed_row_is_an_error_in_batch_mode() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "bad.csv", &["1,2,3"]);
        assert!(read_batch(dir.path()).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stream_emits_existing_then_new_files() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "existing.csv", &[ROW_OK, ROW_OK]);

        let mut stream = stream(dir.path().to_path_buf());
        let deadline = Duration::from_secs(15);

        for _ in 0..2 {
            let rec = tokio::time::timeout(deadline, stream.next())
                .await
                .expect("timed out waiting for existing records")
                .expect("stream ended early");
            assert_eq!(rec.origin, "IAD");
        }

        write_csv(dir.path(), "arriving.csv", &[ROW_NA]);
        let rec = tokio::time::timeout(deadline, stream.next())
            .await
            .expect("timed out waiting for new file")
            .expect("stream ended early");
        assert_eq!(rec.is_arr_delayed, "YES");
    }
}
