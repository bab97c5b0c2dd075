// SPDX-License-Identifier: MIT
//! Bounded fan-out executor shared by every replication task.
//!
//! A batch is a list of independent per-object jobs plus a worker count. All
//! jobs run concurrently under an N-permit semaphore; the batch joins fully
//! and returns one [`SyncRecord`] per job, in completion order. An individual
//! failure — or even a panic — never terminates the batch: the job's record
//! says `failed` and the rest keep going.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use crate::status::{ObjectRef, SyncRecord, SyncStatus};

/// One unit of work: the object it targets (known up front, so a panicked
/// task can still be attributed) and the future that produces its outcome.
pub struct Job {
    meta: ObjectRef,
    fut: BoxFuture<'static, SyncStatus>,
}

/// Package a job future with its object identity.
pub fn job<F>(meta: ObjectRef, fut: F) -> Job
where
    F: std::future::Future<Output = SyncStatus> + Send + 'static,
{
    Job {
        meta,
        fut: fut.boxed(),
    }
}

/// Run every job under at most `workers` concurrent permits and collect all
/// records. No ordering guarantee among results.
pub async fn run_all(label: &str, jobs: Vec<Job>, workers: usize) -> Vec<SyncRecord> {
    let total = jobs.len();
    let workers = workers.max(1);

    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:30}] {pos}/{len}")
            .unwrap(),
    );
    bar.set_message(label.to_string());

    let semaphore = Arc::new(Semaphore::new(workers));
    let mut set: JoinSet<SyncRecord> = JoinSet::new();
    let mut metas: HashMap<tokio::task::Id, ObjectRef> = HashMap::new();

    for Job { meta, fut } in jobs {
        let semaphore = Arc::clone(&semaphore);
        let task_meta = meta.clone();
        let handle = set.spawn(async move {
            // The semaphore is never closed while the JoinSet is alive.
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let status = fut.await;
            SyncRecord::new(task_meta, status)
        });
        metas.insert(handle.id(), meta);
    }

    let mut records = Vec::with_capacity(total);
    while let Some(joined) = set.join_next_with_id().await {
        match joined {
            Ok((id, record)) => {
                metas.remove(&id);
                records.push(record);
            }
            Err(err) => {
                // A panicked job still owes the batch a record.
                let meta = metas
                    .remove(&err.id())
                    .unwrap_or_else(|| ObjectRef::catalog("<unknown>"));
                warn!(object = %meta, "job panicked: {err}");
                records.push(SyncRecord::new(
                    meta,
                    SyncStatus::Failed(format!("job panicked: {err}")),
                ));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    records
}
