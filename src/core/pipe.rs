//! External command channel.
//!
//! A session directory holds two files: `msg_in`, which other processes append command lines
//! to, and `selection_out`, which receives the selection before each subprocess starts. A
//! reader thread tails `msg_in` and forwards every complete line as [Msg::External].

use crate::core::worker::Msg;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MSG_IN: &str = "msg_in";
const SELECTION_OUT: &str = "selection_out";

#[derive(Debug, Clone)]
pub struct Pipe {
    dir: PathBuf,
    msg_in: PathBuf,
    selection_out: PathBuf,
}

impl Pipe {
    /// Creates a fresh session directory below `base`.
    pub fn create(base: &Path) -> io::Result<Self> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let dir = base.join(format!("keel-session-{}-{stamp}", process::id()));
        fs::create_dir_all(&dir)?;

        let msg_in = dir.join(MSG_IN);
        let selection_out = dir.join(SELECTION_OUT);
        File::create(&msg_in)?;
        File::create(&selection_out)?;
        info!(dir = %dir.display(), "created pipe session");

        Ok(Self {
            dir,
            msg_in,
            selection_out,
        })
    }

    /// Default parent directory for sessions: the runtime dir, else the temp dir.
    pub fn default_base() -> PathBuf {
        dirs::runtime_dir().unwrap_or_else(std::env::temp_dir)
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    pub fn msg_in(&self) -> &Path {
        &self.msg_in
    }

    #[inline]
    pub fn selection_out(&self) -> &Path {
        &self.selection_out
    }

    /// Starts the thread tailing `msg_in`.
    ///
    /// The thread ends when the receiver is gone or the session directory was removed.
    pub fn spawn_reader(&self, tx: Sender<Msg>, poll: Duration) -> io::Result<thread::JoinHandle<()>> {
        let mut reader = BufReader::new(File::open(&self.msg_in)?);
        let msg_in = self.msg_in.clone();

        Ok(thread::spawn(move || {
            let mut pending = String::new();
            loop {
                let delivered = read_lines(&mut reader, &mut pending, |line| {
                    tx.send(Msg::External(line)).is_ok()
                });
                match delivered {
                    Ok(true) => thread::sleep(poll),
                    Ok(false) => break,
                    Err(e) => {
                        warn!(error = %e, "failed to read pipe");
                        thread::sleep(poll);
                    }
                }
                if !msg_in.exists() {
                    break;
                }
            }
            debug!("pipe reader stopped");
        }))
    }

    /// Removes the session directory.
    pub fn cleanup(&self) -> io::Result<()> {
        fs::remove_dir_all(&self.dir)
    }
}

/// Reads every complete line currently available, handing non-blank ones to `emit`.
///
/// An incomplete trailing line stays in `pending` until its newline arrives. Returns `false`
/// when `emit` asked to stop.
fn read_lines<R, F>(reader: &mut R, pending: &mut String, mut emit: F) -> io::Result<bool>
where
    R: BufRead,
    F: FnMut(String) -> bool,
{
    loop {
        let n = reader.read_line(pending)?;
        if n == 0 || !pending.ends_with('\n') {
            return Ok(true);
        }
        let line = pending.trim_end_matches(['\n', '\r']).to_string();
        pending.clear();
        if line.trim().is_empty() {
            continue;
        }
        if !emit(line) {
            return Ok(false);
        }
    }
}
