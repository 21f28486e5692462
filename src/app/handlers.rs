//! Command execution for [AppState].
//!
//! [AppState::apply] is the single place a [Command] takes effect. Synchronous changes happen
//! immediately; directory loads, bulk jobs, processes and timers are deferred into [Effects].
//!
//! Failures never stop a chain. Missing targets and unknown modes post a notification; popping
//! the last mode is ignored.

use crate::app::command::Command;
use crate::app::dispatch::{Context, Effects};
use crate::app::keymap::key_char;
use crate::app::mode::ModeError;
use crate::app::notify::Level;
use crate::app::state::AppState;
use crate::core::bulk::{BulkJob, BulkOp};
use crate::core::proc::{ProcessRequest, SelectionExport};
use crate::core::worker::{FocusTarget, Task};
use crate::utils::{get_home, resolve_path};

use tracing::debug;

use std::fs;
use std::path::{Path, PathBuf};

impl AppState {
    /// Executes one command.
    pub fn apply(&mut self, cmd: &Command, ctx: Context<'_>, fx: &mut Effects) {
        match cmd {
            Command::FocusNext => {
                self.nav.focus_next();
            }
            Command::FocusPrevious => {
                self.nav.focus_previous();
            }
            Command::FocusFirst => self.nav.focus_first(),
            Command::FocusLast => self.nav.focus_last(),
            Command::FocusByIndex(idx) => {
                if !self.nav.focus_by_index(*idx) {
                    self.notify(Level::Warning, format!("no entry at index {idx}"), fx);
                }
            }
            Command::FocusPath(p) => {
                let path = self.resolve(p);
                self.focus_path(path, fx);
            }

            Command::ChangeDirectory(p) => {
                let path = self.resolve(p);
                self.change_directory(path, FocusTarget::Remembered, true, fx);
            }
            Command::Enter => {
                if let Some(path) = self.nav.focused_path().map(Path::to_path_buf) {
                    self.change_directory(path, FocusTarget::Remembered, true, fx);
                }
            }
            Command::Back => {
                let pwd = self.nav.pwd().to_path_buf();
                if let Some(parent) = pwd.parent() {
                    self.change_directory(
                        parent.to_path_buf(),
                        FocusTarget::Path(pwd.clone()),
                        true,
                        fx,
                    );
                }
            }
            Command::Refresh => self.refresh(fx),
            Command::VisitLast => {
                if let Some(path) = self.history.peek_last().map(Path::to_path_buf)
                    && self.change_directory(path, FocusTarget::Remembered, false, fx)
                {
                    self.history.step_back();
                }
            }
            Command::VisitNext => {
                if let Some(path) = self.history.peek_next().map(Path::to_path_buf)
                    && self.change_directory(path, FocusTarget::Remembered, false, fx)
                {
                    self.history.step_forward();
                }
            }
            Command::GoHome => match get_home() {
                Some(home) => {
                    self.change_directory(home, FocusTarget::Remembered, true, fx);
                }
                None => self.notify(Level::Error, "home directory is unknown", fx),
            },

            Command::ToggleSelection => {
                if let Some(path) = self.nav.focused_path().map(Path::to_path_buf) {
                    self.selection.toggle(path);
                }
            }
            Command::ToggleSelectionByPath(p) => {
                let path = self.resolve(p);
                self.selection.toggle(path);
            }
            Command::SelectPath(p) => {
                let path = self.resolve(p);
                self.selection.insert(path);
            }
            Command::UnSelectPath(p) => {
                let path = self.resolve(p);
                self.selection.remove(&path);
            }
            Command::SelectAll => {
                for node in self.nav.nodes() {
                    self.selection.insert(node.path().to_path_buf());
                }
            }
            Command::ClearSelection => self.selection.clear(),

            Command::PushMode(name) => {
                let res = self.modes.push(name);
                self.mode_result(res, fx);
            }
            Command::PopMode => {
                let res = self.modes.pop();
                self.mode_result(res, fx);
            }
            Command::SwitchMode(name) => {
                let res = self.modes.switch(name);
                self.mode_result(res, fx);
            }
            Command::ResetMode => self.modes.reset(),

            Command::SetInputBuffer(text) => self.input = text.clone(),
            Command::BufferInput(text) => self.input.push_str(text),
            Command::BufferInputFromKey => match ctx.key.and_then(key_char) {
                Some(c) => self.input.push(c),
                None => debug!(key = ?ctx.key, "key has no character to buffer"),
            },
            Command::RemoveInputBufferLastCharacter => {
                self.input.pop();
            }
            Command::ResetInputBuffer => self.input.clear(),

            Command::SetMark(c) => self.set_mark(*c, fx),
            Command::SetMarkFromKey => match ctx.key.and_then(key_char) {
                Some(c) => self.set_mark(c, fx),
                None => self.notify(Level::Warning, "this key cannot be used as a mark", fx),
            },
            Command::JumpToMark(c) => self.jump_to_mark(*c, fx),
            Command::JumpToMarkFromKey => match ctx.key.and_then(key_char) {
                Some(c) => self.jump_to_mark(c, fx),
                None => self.notify(Level::Warning, "this key cannot be used as a mark", fx),
            },

            Command::Delete => self.launch_bulk(BulkOp::Delete, fx),
            Command::CopyTo(p) => {
                let dest = self.resolve(p);
                self.launch_bulk(BulkOp::Copy { dest }, fx);
            }
            Command::MoveTo(p) => {
                let dest = self.resolve(p);
                self.launch_bulk(BulkOp::Move { dest }, fx);
            }
            Command::CopyHere => {
                let dest = self.nav.pwd().to_path_buf();
                self.launch_bulk(BulkOp::Copy { dest }, fx);
            }
            Command::MoveHere => {
                let dest = self.nav.pwd().to_path_buf();
                self.launch_bulk(BulkOp::Move { dest }, fx);
            }

            Command::Call {
                program,
                args,
                silent,
            } => {
                let req = ProcessRequest::program(program, args.clone(), !silent);
                self.launch_process(req, fx);
            }
            Command::ShellExec { script, silent } => {
                let req = ProcessRequest::shell(script, !silent);
                self.launch_process(req, fx);
            }

            Command::Log(level, text) => self.notify(*level, text.clone(), fx),
            Command::ClearNotification => self.notifier.clear(),

            Command::Quit => self.running = false,

            Command::Invalid { error, .. } => {
                self.notify(Level::Warning, error.to_string(), fx);
            }
        }
    }

    fn resolve(&self, input: &str) -> PathBuf {
        resolve_path(self.nav.pwd(), input)
    }

    /// Switches to `path` after checking it is a directory. Leaves state untouched otherwise.
    ///
    /// Returns whether the switch happened.
    fn change_directory(
        &mut self,
        path: PathBuf,
        focus: FocusTarget,
        push_history: bool,
        fx: &mut Effects,
    ) -> bool {
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                let text = format!("not a directory: {}", path.display());
                self.notify(Level::Error, text, fx);
                return false;
            }
            Err(e) => {
                let text = format!("cannot open {}: {e}", path.display());
                self.notify(Level::Error, text, fx);
                return false;
            }
        }

        if push_history {
            self.history.push(path.clone());
        }
        let id = self.nav.set_path(path);
        self.request_load(focus, id, fx);
        true
    }

    /// Focuses `path`, changing into its parent first when needed.
    fn focus_path(&mut self, path: PathBuf, fx: &mut Effects) {
        if self.nav.focus_path(&path) {
            return;
        }
        let Some(parent) = path.parent().map(Path::to_path_buf) else {
            return;
        };
        if parent == self.nav.pwd() {
            if fs::symlink_metadata(&path).is_err() {
                let text = format!("not found: {}", path.display());
                self.notify(Level::Error, text, fx);
                return;
            }
            // Listed once the pending load arrives.
            let id = self.nav.prepare_new_request();
            self.request_load(FocusTarget::Path(path), id, fx);
        } else {
            self.change_directory(parent, FocusTarget::Path(path), true, fx);
        }
    }

    fn mode_result(&mut self, res: Result<(), ModeError>, fx: &mut Effects) {
        match res {
            Ok(()) => {}
            Err(ModeError::EmptyStack) => debug!("ignoring pop of the last mode"),
            Err(e @ ModeError::ModeNotFound(_)) => {
                self.notify(Level::Warning, e.to_string(), fx);
            }
        }
    }

    fn set_mark(&mut self, c: char, fx: &mut Effects) {
        let pwd = self.nav.pwd().to_path_buf();
        self.notify(Level::Info, format!("mark '{c}' set to {}", pwd.display()), fx);
        self.marks.insert(c, pwd);
    }

    fn jump_to_mark(&mut self, c: char, fx: &mut Effects) {
        match self.marks.get(&c).cloned() {
            Some(path) => {
                self.change_directory(path, FocusTarget::Remembered, true, fx);
            }
            None => self.notify(Level::Warning, format!("no mark '{c}'"), fx),
        }
    }

    /// Paths a bulk command acts on: the selection, else the focused entry.
    fn bulk_targets(&self) -> Vec<PathBuf> {
        if self.selection.is_empty() {
            self.nav
                .focused_path()
                .map(Path::to_path_buf)
                .into_iter()
                .collect()
        } else {
            self.selection.sorted()
        }
    }

    fn launch_bulk(&mut self, op: BulkOp, fx: &mut Effects) {
        let paths = self.bulk_targets();
        self.next_job_id += 1;
        let job = BulkJob::new(self.next_job_id, op, paths);
        debug!(
            job = self.next_job_id,
            kind = %job.op().kind(),
            items = job.paths().len(),
            "queue bulk job"
        );

        self.jobs.push(job.progress().clone());
        self.selection.clear();
        fx.defer(Task::Bulk {
            job,
            snapshot: self.nav.snapshot(),
        });
    }

    fn launch_process(&mut self, mut req: ProcessRequest, fx: &mut Effects) {
        req.env = self.shell_env();
        req.selection = self.pipe.as_ref().map(|pipe| SelectionExport {
            file: pipe.selection_out().to_path_buf(),
            paths: self.selection.sorted(),
        });
        fx.defer(Task::Process(req));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::app::mode::{Action, Mode, ModeStack};
    use crate::app::state::Settings;

    use std::collections::HashMap;
    use std::error;
    use std::fs::File;
    use tempfile::tempdir;

    fn state_at(dir: &Path) -> Result<AppState, Box<dyn error::Error>> {
        let mut modes = HashMap::new();
        for name in ["default", "action"] {
            let mut m = Mode::new(name);
            m.bind("q", Action::new(None, vec![Command::Quit]));
            modes.insert(name.to_string(), m);
        }
        let stack = ModeStack::new(modes, "default")?;
        Ok(AppState::new(
            Settings::default(),
            stack,
            dir.to_path_buf(),
        ))
    }

    fn run(state: &mut AppState, cmds: &[Command]) -> Effects {
        let mut fx = Effects::default();
        for c in cmds {
            state.apply(c, Context::default(), &mut fx);
        }
        fx
    }

    #[test]
    fn change_directory_to_file_leaves_state() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        File::create(dir.path().join("plain.txt"))?;
        let mut state = state_at(dir.path())?;

        let fx = run(&mut state, &[Command::ChangeDirectory("plain.txt".into())]);
        assert!(fx.is_empty());
        assert_eq!(state.nav().pwd(), dir.path());
        assert_eq!(state.history().paths().len(), 1);
        assert_eq!(
            state.notification().map(|n| n.level),
            Some(Level::Error)
        );
        Ok(())
    }

    #[test]
    fn change_directory_defers_load() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        let mut state = state_at(dir.path())?;

        let fx = run(&mut state, &[Command::ChangeDirectory("sub".into())]);
        assert_eq!(fx.len(), 1);
        assert_eq!(state.nav().pwd(), dir.path().join("sub"));
        assert_eq!(state.history().paths().len(), 2);

        let mut tasks = Vec::new();
        fx.flush(&mut tasks);
        match &tasks[0] {
            Task::LoadDirectory(req) => {
                assert_eq!(req.path, dir.path().join("sub"));
                assert_eq!(req.request_id, state.nav().request_id());
            }
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn failed_visit_keeps_history_cursor() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir(&a)?;
        fs::create_dir(&b)?;
        let mut state = state_at(dir.path())?;

        run(
            &mut state,
            &[
                Command::ChangeDirectory("a".into()),
                Command::ChangeDirectory("../b".into()),
            ],
        );
        assert_eq!(state.history().cursor(), 2);

        fs::remove_dir(&a)?;
        let fx = run(&mut state, &[Command::VisitLast]);
        assert!(fx.is_empty());
        assert_eq!(state.history().cursor(), 2);
        assert_eq!(state.nav().pwd(), b);
        assert_eq!(
            state.notification().map(|n| n.level),
            Some(Level::Error)
        );

        fs::create_dir(&a)?;
        run(&mut state, &[Command::VisitLast]);
        assert_eq!(state.history().cursor(), 1);
        assert_eq!(state.nav().pwd(), a);

        run(&mut state, &[Command::VisitNext]);
        assert_eq!(state.history().cursor(), 2);
        assert_eq!(state.nav().pwd(), b);
        assert_eq!(state.history().paths().len(), 3);
        Ok(())
    }

    #[test]
    fn modes_report_unknown_and_ignore_last_pop() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let mut state = state_at(dir.path())?;

        run(&mut state, &[Command::PopMode]);
        assert_eq!(state.modes().len(), 1);
        assert!(state.notification().is_none());

        run(&mut state, &[Command::PushMode("ghost".into())]);
        assert_eq!(state.modes().len(), 1);
        assert_eq!(
            state.notification().map(|n| n.level),
            Some(Level::Warning)
        );

        run(
            &mut state,
            &[Command::PushMode("action".into()), Command::ResetMode],
        );
        assert_eq!(state.modes().peek().name(), "default");
        Ok(())
    }

    #[test]
    fn input_buffer_from_key() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let mut state = state_at(dir.path())?;
        let mut fx = Effects::default();

        for key in ["h", "i", "space", "esc"] {
            let ctx = Context { key: Some(key) };
            state.apply(&Command::BufferInputFromKey, ctx, &mut fx);
        }
        assert_eq!(state.input_buffer(), "hi ");
        state.apply(&Command::RemoveInputBufferLastCharacter, Context::default(), &mut fx);
        assert_eq!(state.input_buffer(), "hi");
        Ok(())
    }

    #[test]
    fn marks_round_trip() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let sub = dir.path().join("deep");
        fs::create_dir(&sub)?;
        let mut state = state_at(dir.path())?;

        run(
            &mut state,
            &[
                Command::SetMark('a'),
                Command::ChangeDirectory("deep".into()),
                Command::JumpToMark('a'),
            ],
        );
        assert_eq!(state.nav().pwd(), dir.path());
        assert_eq!(state.marks().get(&'a'), Some(&dir.path().to_path_buf()));

        run(&mut state, &[Command::JumpToMark('z')]);
        assert_eq!(
            state.notification().map(|n| n.level),
            Some(Level::Warning)
        );
        Ok(())
    }

    #[test]
    fn bulk_uses_selection_then_clears_it() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let mut state = state_at(dir.path())?;
        let a = dir.path().join("a");
        let b = dir.path().join("b");

        let fx = run(
            &mut state,
            &[
                Command::SelectPath("a".into()),
                Command::SelectPath("b".into()),
                Command::Delete,
            ],
        );
        assert!(state.selection().is_empty());
        assert_eq!(state.jobs().len(), 1);
        assert_eq!(state.jobs()[0].total(), 2);

        let mut tasks = Vec::new();
        fx.flush(&mut tasks);
        match &tasks[..] {
            [Task::Bulk { job, snapshot }] => {
                assert_eq!(job.paths(), &[a, b]);
                assert_eq!(job.op(), &BulkOp::Delete);
                assert_eq!(snapshot.dir, dir.path());
            }
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn process_gets_env_and_interactivity() -> Result<(), Box<dyn error::Error>> {
        let dir = tempdir()?;
        let mut state = state_at(dir.path())?;

        let fx = run(
            &mut state,
            &[
                Command::SetInputBuffer("query".into()),
                Command::ShellExec {
                    script: "echo $KEEL_INPUT_BUFFER".into(),
                    silent: true,
                },
            ],
        );
        let mut tasks = Vec::new();
        fx.flush(&mut tasks);
        let [Task::Process(req)] = &tasks[..] else {
            return Err("expected one process task".into());
        };
        assert!(!req.interactive);
        assert!(req.selection.is_none());
        assert!(
            req.env
                .iter()
                .any(|(k, v)| k == "KEEL_INPUT_BUFFER" && v == "query")
        );
        assert!(
            req.env
                .iter()
                .any(|(k, v)| k == "KEEL_PWD" && v == dir.path().as_os_str())
        );
        Ok(())
    }
}
