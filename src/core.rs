//! Core runtime logic for keel.
//!
//! The non-UI engine pieces used by the application:
//! - [fm]: directory listing (see [browse_dir] and [Node]).
//! - [fileops]: single-path delete/copy/move with classified errors.
//! - [bulk]: concurrent bulk jobs with shared progress and one terminal event.
//! - [worker]: the task/message protocol and the background runtime.
//! - [proc]: external processes and the selection export.
//! - [pipe]: the external command channel.
//! - [terminal]: terminal setup/teardown and the main loop driver.

pub mod bulk;
pub mod fileops;
pub mod fm;
pub mod pipe;
pub mod proc;
pub mod terminal;
pub mod worker;

pub use bulk::{BulkEngine, BulkJob, BulkKind, BulkOp, BulkProgress, BulkSummary};
pub use fileops::FileOpError;
pub use fm::{Node, browse_dir};
pub use worker::{Msg, Runtime, Scheduler, Task};
