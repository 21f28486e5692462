//! Background work for keel.
//!
//! The event loop never performs I/O itself. It hands [Task]s to a [Scheduler]; the [Runtime]
//! scheduler runs them off the loop thread and reports back by sending a [Msg] on the loop's
//! channel. Directory loads go to one dedicated I/O thread, bulk jobs to the [BulkEngine],
//! silent processes and notification timers to short-lived threads. Interactive processes
//! need the terminal and are queued for the terminal driver instead.
//!
//! # Caution:
//! [Task] and [Msg] are the protocol between the loop and everything running in the
//! background. Adding a variant means handling it in the event loop as well.

use crate::app::nav::{FocusSnapshot, recover_focus};
use crate::app::notify::Expiry;
use crate::core::bulk::{BulkEngine, BulkJob, BulkSummary};
use crate::core::fm::{Node, browse_dir};
use crate::core::proc::{ProcessOutcome, ProcessRequest, run_silent};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, trace};

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::thread;

/// Which entry to focus once a directory has loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
    /// The position remembered for the directory, else the first entry.
    Remembered,
    Path(PathBuf),
    /// The nearest surviving entry of a previous listing, see [recover_focus].
    Recover { listing: Vec<PathBuf>, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub path: PathBuf,
    pub focus: FocusTarget,
    pub show_hidden: bool,
    pub dirs_first: bool,
    pub request_id: u64,
}

/// Deferred work produced while handling a message.
#[derive(Debug)]
pub enum Task {
    LoadDirectory(LoadRequest),
    Bulk {
        job: BulkJob,
        snapshot: FocusSnapshot,
    },
    Process(ProcessRequest),
    ExpireNotification(Expiry),
}

/// Messages processed by the event loop, one at a time.
#[derive(Debug)]
pub enum Msg {
    /// A canonical key identifier.
    Key(String),
    /// A command line from the external channel.
    External(String),
    DirectoryLoaded {
        path: PathBuf,
        nodes: Vec<Node>,
        focus: Option<PathBuf>,
        request_id: u64,
    },
    DirectoryFailed {
        path: PathBuf,
        error: String,
        request_id: u64,
    },
    BulkFinished {
        summary: BulkSummary,
        snapshot: FocusSnapshot,
    },
    ProcessFinished {
        label: String,
        outcome: ProcessOutcome,
    },
    NotificationExpired(u64),
    Resize,
    Tick,
}

/// Accepts deferred tasks.
pub trait Scheduler {
    fn schedule(&mut self, task: Task);
}

/// Collects tasks in order. Used where tasks are inspected rather than run.
impl Scheduler for Vec<Task> {
    fn schedule(&mut self, task: Task) {
        self.push(task);
    }
}

/// The scheduler used by the running application.
pub struct Runtime {
    io_tx: Sender<LoadRequest>,
    tx: Sender<Msg>,
    bulk: BulkEngine,
    interactive: VecDeque<ProcessRequest>,
}

impl Runtime {
    /// Creates the runtime and starts its I/O thread. Results are sent on `tx`.
    pub fn spawn(tx: Sender<Msg>, bulk_workers: usize) -> Self {
        let (io_tx, io_rx) = unbounded::<LoadRequest>();
        start_io_worker(io_rx, tx.clone());
        Self {
            io_tx,
            tx,
            bulk: BulkEngine::new(bulk_workers),
            interactive: VecDeque::new(),
        }
    }

    /// Next interactive process waiting for the terminal.
    pub fn take_interactive(&mut self) -> Option<ProcessRequest> {
        self.interactive.pop_front()
    }

    #[inline]
    pub fn sender(&self) -> &Sender<Msg> {
        &self.tx
    }
}

impl Scheduler for Runtime {
    fn schedule(&mut self, task: Task) {
        match task {
            Task::LoadDirectory(req) => {
                trace!(path = %req.path.display(), id = req.request_id, "queue directory load");
                let _ = self.io_tx.send(req);
            }
            Task::Bulk { job, snapshot } => {
                let tx = self.tx.clone();
                self.bulk.launch(job, move |summary| {
                    let _ = tx.send(Msg::BulkFinished { summary, snapshot });
                });
            }
            Task::Process(req) if req.interactive => self.interactive.push_back(req),
            Task::Process(req) => {
                let tx = self.tx.clone();
                thread::spawn(move || {
                    let outcome = run_silent(&req);
                    let _ = tx.send(Msg::ProcessFinished {
                        label: req.label,
                        outcome,
                    });
                });
            }
            Task::ExpireNotification(expiry) => {
                let tx = self.tx.clone();
                thread::spawn(move || {
                    thread::sleep(expiry.after);
                    let _ = tx.send(Msg::NotificationExpired(expiry.ticket));
                });
            }
        }
    }
}

/// Starts the I/O worker thread, which serves [LoadRequest]s in order.
fn start_io_worker(task_rx: Receiver<LoadRequest>, res_tx: Sender<Msg>) {
    thread::spawn(move || {
        while let Ok(req) = task_rx.recv() {
            if res_tx.send(load_directory(req)).is_err() {
                break;
            }
        }
        debug!("io worker stopped");
    });
}

/// Reads a directory and resolves the focus target against it.
pub fn load_directory(req: LoadRequest) -> Msg {
    let LoadRequest {
        path,
        focus,
        show_hidden,
        dirs_first,
        request_id,
    } = req;

    match browse_dir(&path, show_hidden, dirs_first) {
        Ok(nodes) => {
            let focus = match focus {
                FocusTarget::Remembered => None,
                FocusTarget::Path(p) => Some(p),
                FocusTarget::Recover { listing, index } => {
                    recover_focus(&listing, index, |p| fs::symlink_metadata(p).is_ok())
                }
            };
            Msg::DirectoryLoaded {
                path,
                nodes,
                focus,
                request_id,
            }
        }
        Err(e) => Msg::DirectoryFailed {
            error: format!("cannot read {}: {e}", path.display()),
            path,
            request_id,
        },
    }
}
