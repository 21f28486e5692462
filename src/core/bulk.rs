//! Concurrent bulk file operations for keel.
//!
//! A bulk job applies one [BulkOp] to N paths. Every path becomes one work item executed by a
//! bounded pool of worker threads. Workers report exactly one [ItemOutcome] per item into a
//! single result channel; an aggregation thread consumes the outcomes in arrival order, bumps
//! the shared progress counter and fires the completion callback exactly once, when the
//! completed count reaches the total.
//!
//! The progress counter inside [BulkProgress] is the only value shared between threads. It is
//! read by the UI through cheap clones of the handle.

use crate::core::fileops::{FileOpError, copy_into, delete_path, move_into};

use crossbeam_channel::{Receiver, unbounded};
use tracing::{debug, warn};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// The kind of a bulk job, used for display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkKind {
    Delete,
    Copy,
    Move,
}

impl fmt::Display for BulkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BulkKind::Delete => "delete",
            BulkKind::Copy => "copy",
            BulkKind::Move => "move",
        };
        f.write_str(s)
    }
}

/// The operation applied to every path of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOp {
    Delete,
    Copy { dest: PathBuf },
    Move { dest: PathBuf },
}

impl BulkOp {
    pub fn kind(&self) -> BulkKind {
        match self {
            BulkOp::Delete => BulkKind::Delete,
            BulkOp::Copy { .. } => BulkKind::Copy,
            BulkOp::Move { .. } => BulkKind::Move,
        }
    }

    /// Performs the operation for a single path.
    pub fn run(&self, path: &Path) -> Result<(), FileOpError> {
        match self {
            BulkOp::Delete => delete_path(path),
            BulkOp::Copy { dest } => copy_into(path, dest).map(|_| ()),
            BulkOp::Move { dest } => move_into(path, dest).map(|_| ()),
        }
    }
}

/// A failed work item.
#[derive(Debug)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub error: FileOpError,
}

/// The outcome of one work item: the processed path or the failure.
pub type ItemOutcome = Result<PathBuf, ItemFailure>;

/// Live progress of a bulk job.
#[derive(Debug, Clone)]
pub struct BulkProgress {
    id: u64,
    kind: BulkKind,
    total: usize,
    current: Arc<AtomicUsize>,
}

impl BulkProgress {
    pub fn new(id: u64, kind: BulkKind, total: usize) -> Self {
        Self {
            id,
            kind,
            total,
            current: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> BulkKind {
        self.kind
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of completed items, successful or not.
    #[inline]
    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    fn advance(&self) -> usize {
        self.current.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Terminal event of a bulk job.
#[derive(Debug)]
pub struct BulkSummary {
    pub id: u64,
    pub kind: BulkKind,
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub failures: Vec<ItemFailure>,
}

/// A bulk job ready to launch: the operation, its paths and the progress handle.
#[derive(Debug)]
pub struct BulkJob {
    op: BulkOp,
    paths: Vec<PathBuf>,
    progress: BulkProgress,
}

impl BulkJob {
    pub fn new(id: u64, op: BulkOp, paths: Vec<PathBuf>) -> Self {
        let progress = BulkProgress::new(id, op.kind(), paths.len());
        Self {
            op,
            paths,
            progress,
        }
    }

    #[inline]
    pub fn progress(&self) -> &BulkProgress {
        &self.progress
    }

    #[inline]
    pub fn op(&self) -> &BulkOp {
        &self.op
    }

    #[inline]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// Launches bulk jobs on a bounded pool of worker threads per job.
pub struct BulkEngine {
    max_workers: usize,
}

impl BulkEngine {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Starts a job and returns immediately.
    ///
    /// `on_done` is called exactly once with the aggregated result, from the aggregation
    /// thread. An empty job completes synchronously.
    pub fn launch<F>(&self, job: BulkJob, on_done: F)
    where
        F: FnOnce(BulkSummary) + Send + 'static,
    {
        let BulkJob {
            op,
            paths,
            progress,
        } = job;
        debug!(
            job = progress.id(),
            kind = %progress.kind(),
            total = progress.total(),
            "launching bulk job"
        );

        if paths.is_empty() {
            on_done(BulkSummary {
                id: progress.id(),
                kind: progress.kind(),
                total: 0,
                success: 0,
                failure: 0,
                failures: Vec::new(),
            });
            return;
        }

        let (item_tx, item_rx) = unbounded::<PathBuf>();
        let (res_tx, res_rx) = unbounded::<ItemOutcome>();
        let worker_count = paths.len().min(self.max_workers);
        for path in paths {
            let _ = item_tx.send(path);
        }
        drop(item_tx);

        let op = Arc::new(op);
        for _ in 0..worker_count {
            let item_rx = item_rx.clone();
            let res_tx = res_tx.clone();
            let op = Arc::clone(&op);
            thread::spawn(move || {
                for path in item_rx.iter() {
                    let outcome = match op.run(&path) {
                        Ok(()) => Ok(path),
                        Err(error) => Err(ItemFailure { path, error }),
                    };
                    if res_tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(res_tx);

        thread::spawn(move || aggregate(res_rx, progress, on_done));
    }
}

/// Consumes item outcomes until the job is complete, then fires `on_done` once.
///
/// If every sender hangs up before all items reported (a worker died), the missing items are
/// counted as failures so the terminal event still fires.
pub fn aggregate<F>(results: Receiver<ItemOutcome>, progress: BulkProgress, on_done: F)
where
    F: FnOnce(BulkSummary),
{
    let total = progress.total();
    let mut success = 0usize;
    let mut failures = Vec::new();
    let mut lost = 0usize;

    if total > 0 {
        loop {
            let Ok(outcome) = results.recv() else {
                lost = total.saturating_sub(progress.current());
                warn!(
                    job = progress.id(),
                    lost, "bulk workers hung up before reporting every item"
                );
                for _ in 0..lost {
                    progress.advance();
                }
                break;
            };

            match outcome {
                Ok(_) => success += 1,
                Err(failure) => {
                    debug!(job = progress.id(), path = %failure.path.display(), error = %failure.error, "bulk item failed");
                    failures.push(failure);
                }
            }

            if progress.advance() >= total {
                break;
            }
        }
    }

    on_done(BulkSummary {
        id: progress.id(),
        kind: progress.kind(),
        total,
        success,
        failure: failures.len() + lost,
        failures,
    });
}
