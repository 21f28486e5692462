//! Application state of keel.
//!
//! [AppState] owns everything the event loop mutates: the mode stack, navigation, history,
//! selection, marks, the input buffer, the notification line and the live bulk jobs. Nothing
//! else holds a mutable reference to it; background work only ever reports back through
//! messages, which are applied here.
//!
//! Command execution lives in [crate::app::handlers].

use crate::app::dispatch::Effects;
use crate::app::history::History;
use crate::app::mode::ModeStack;
use crate::app::nav::{FocusSnapshot, NavState};
use crate::app::notify::{Level, Notification, Notifier};
use crate::app::selection::Selection;
use crate::core::bulk::{BulkProgress, BulkSummary};
use crate::core::fm::Node;
use crate::core::pipe::Pipe;
use crate::core::proc::ProcessOutcome;
use crate::core::worker::{FocusTarget, LoadRequest, Task};

use tracing::{debug, info, warn};

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Listing and notification settings the state needs at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub show_hidden: bool,
    pub dirs_first: bool,
    pub notification_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_hidden: false,
            dirs_first: true,
            notification_timeout: Duration::from_millis(2000),
        }
    }
}

pub struct AppState {
    pub(super) settings: Settings,
    pub(super) modes: ModeStack,
    pub(super) nav: NavState,
    pub(super) history: History,
    pub(super) selection: Selection,
    pub(super) marks: HashMap<char, PathBuf>,
    pub(super) input: String,
    pub(super) notifier: Notifier,
    pub(super) jobs: Vec<BulkProgress>,
    pub(super) next_job_id: u64,
    pub(super) pipe: Option<Pipe>,
    pub(super) running: bool,
}

impl AppState {
    pub fn new(settings: Settings, modes: ModeStack, start: PathBuf) -> Self {
        let notifier = Notifier::new(settings.notification_timeout);
        Self {
            settings,
            modes,
            nav: NavState::new(start.clone()),
            history: History::new(start),
            selection: Selection::default(),
            marks: HashMap::new(),
            input: String::new(),
            notifier,
            jobs: Vec::new(),
            next_job_id: 0,
            pipe: None,
            running: true,
        }
    }

    /// Attaches the external command channel whose paths are exported to subprocesses.
    pub fn with_pipe(mut self, pipe: Pipe) -> Self {
        self.pipe = Some(pipe);
        self
    }

    // Getters / Accessors

    #[inline]
    pub fn modes(&self) -> &ModeStack {
        &self.modes
    }

    #[inline]
    pub fn nav(&self) -> &NavState {
        &self.nav
    }

    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[inline]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[inline]
    pub fn marks(&self) -> &HashMap<char, PathBuf> {
        &self.marks
    }

    #[inline]
    pub fn input_buffer(&self) -> &str {
        &self.input
    }

    #[inline]
    pub fn notification(&self) -> Option<&Notification> {
        self.notifier.current()
    }

    #[inline]
    pub fn jobs(&self) -> &[BulkProgress] {
        &self.jobs
    }

    #[inline]
    pub fn pipe(&self) -> Option<&Pipe> {
        self.pipe.as_ref()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Requests the first listing of the starting directory.
    pub fn bootstrap(&mut self, fx: &mut Effects) {
        info!(pwd = %self.nav.pwd().display(), "starting");
        let id = self.nav.prepare_new_request();
        self.request_load(FocusTarget::Remembered, id, fx);
    }

    /// Logs every configuration problem and posts one warning summarising them.
    pub fn report_config_warnings(&mut self, warnings: &[String], fx: &mut Effects) {
        let Some(first) = warnings.first() else {
            return;
        };
        for w in warnings {
            warn!("config: {w}");
        }
        let text = match warnings.len() {
            1 => format!("config: {first}"),
            n => format!("config: {first} (and {} more, see log)", n - 1),
        };
        self.notify(Level::Warning, text, fx);
    }

    /// Posts a notification, deferring its expiry when it auto-clears.
    pub fn notify(&mut self, level: Level, text: impl Into<String>, fx: &mut Effects) {
        if let Some(expiry) = self.notifier.post(level, text) {
            fx.defer(Task::ExpireNotification(expiry));
        }
    }

    pub(super) fn request_load(&mut self, focus: FocusTarget, request_id: u64, fx: &mut Effects) {
        fx.defer(Task::LoadDirectory(LoadRequest {
            path: self.nav.pwd().to_path_buf(),
            focus,
            show_hidden: self.settings.show_hidden,
            dirs_first: self.settings.dirs_first,
            request_id,
        }));
    }

    /// Reloads the working directory keeping the focused entry.
    pub(super) fn refresh(&mut self, fx: &mut Effects) {
        let focus = match self.nav.focused_path() {
            Some(p) => FocusTarget::Path(p.to_path_buf()),
            None => FocusTarget::Remembered,
        };
        let id = self.nav.prepare_new_request();
        self.request_load(focus, id, fx);
    }

    /// Environment exported to every subprocess.
    pub fn shell_env(&self) -> Vec<(String, OsString)> {
        let focus_path = self
            .nav
            .focused_path()
            .map(|p| p.as_os_str().to_os_string())
            .unwrap_or_default();
        let mut env = vec![
            ("KEEL_FOCUS_PATH".to_string(), focus_path),
            (
                "KEEL_PWD".to_string(),
                self.nav.pwd().as_os_str().to_os_string(),
            ),
            (
                "KEEL_FOCUS_INDEX".to_string(),
                self.nav.focus_idx().to_string().into(),
            ),
            ("KEEL_INPUT_BUFFER".to_string(), self.input.clone().into()),
            (
                "KEEL_MODE".to_string(),
                self.modes.peek().name().to_string().into(),
            ),
        ];
        if let Some(pipe) = &self.pipe {
            env.push((
                "KEEL_PIPE_MSG_IN".to_string(),
                pipe.msg_in().as_os_str().to_os_string(),
            ));
            env.push((
                "KEEL_PIPE_SELECTION_OUT".to_string(),
                pipe.selection_out().as_os_str().to_os_string(),
            ));
        }
        env
    }

    // Background results

    /// Installs a loaded listing. Returns `false` when the result was stale and discarded.
    pub fn on_directory_loaded(
        &mut self,
        path: PathBuf,
        nodes: Vec<Node>,
        focus: Option<PathBuf>,
        request_id: u64,
    ) -> bool {
        if request_id != self.nav.request_id() {
            debug!(
                path = %path.display(),
                request_id,
                current = self.nav.request_id(),
                "discarding stale directory load"
            );
            return false;
        }
        self.nav.update_from_worker(path, nodes, focus);
        true
    }

    pub fn on_directory_failed(
        &mut self,
        path: &Path,
        error: String,
        request_id: u64,
        fx: &mut Effects,
    ) {
        if request_id != self.nav.request_id() {
            debug!(path = %path.display(), "discarding stale directory failure");
            return;
        }
        self.notify(Level::Error, error, fx);
    }

    /// Reports a finished bulk job and reloads the listing, recovering focus if it still shows
    /// the directory the job started from.
    pub fn on_bulk_finished(
        &mut self,
        summary: BulkSummary,
        snapshot: FocusSnapshot,
        fx: &mut Effects,
    ) {
        self.jobs.retain(|j| j.id() != summary.id);
        info!(
            job = summary.id,
            kind = %summary.kind,
            success = summary.success,
            failure = summary.failure,
            "bulk job finished"
        );

        if summary.failure == 0 {
            let text = format!("{}: {} item(s) done", summary.kind, summary.success);
            self.notify(Level::Success, text, fx);
        } else {
            let mut text = format!(
                "{}: {} of {} failed",
                summary.kind, summary.failure, summary.total
            );
            if let Some(first) = summary.failures.first() {
                text.push_str(&format!(" ({})", first.error));
            }
            self.notify(Level::Error, text, fx);
        }

        let focus = if snapshot.dir == self.nav.pwd() {
            FocusTarget::Recover {
                listing: snapshot.listing,
                index: snapshot.focus,
            }
        } else {
            match self.nav.focused_path() {
                Some(p) => FocusTarget::Path(p.to_path_buf()),
                None => FocusTarget::Remembered,
            }
        };
        let id = self.nav.prepare_new_request();
        self.request_load(focus, id, fx);
    }

    pub fn on_process_finished(&mut self, label: &str, outcome: ProcessOutcome, fx: &mut Effects) {
        match outcome {
            ProcessOutcome::Success => debug!(label, "process finished"),
            ProcessOutcome::Failed(Some(code)) => {
                self.notify(Level::Error, format!("'{label}' exited with code {code}"), fx)
            }
            ProcessOutcome::Failed(None) => {
                self.notify(Level::Error, format!("'{label}' was terminated"), fx)
            }
            ProcessOutcome::SpawnError(e) => {
                self.notify(Level::Error, format!("failed to run '{label}': {e}"), fx)
            }
        }
        self.refresh(fx);
    }

    pub fn on_notification_expired(&mut self, ticket: u64) {
        self.notifier.expire(ticket);
    }
}
