//! The message-driven core of keel.
//!
//! [EventLoop::handle] applies exactly one [Msg] to the state and hands any follow-up work to
//! the scheduler. It is the only code path that mutates [AppState], and it never blocks on
//! I/O: results of background work arrive as later messages.

use crate::app::dispatch::{Context, Dispatcher, Effects};
use crate::app::state::AppState;
use crate::core::worker::{Msg, Scheduler};

use tracing::debug;

/// Whether the loop should keep running after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct EventLoop {
    state: AppState,
    dispatcher: Dispatcher,
}

impl EventLoop {
    pub fn new(state: AppState, dispatcher: Dispatcher) -> Self {
        Self { state, dispatcher }
    }

    #[inline]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Issues the initial directory load and surfaces configuration warnings.
    pub fn start(&mut self, config_warnings: &[String], sched: &mut dyn Scheduler) {
        let mut fx = Effects::default();
        self.state.bootstrap(&mut fx);
        self.state.report_config_warnings(config_warnings, &mut fx);
        fx.flush(sched);
    }

    pub fn handle(&mut self, msg: Msg, sched: &mut dyn Scheduler) -> Flow {
        let mut fx = Effects::default();

        match msg {
            Msg::Key(key) => match self.state.modes().resolve(&key).cloned() {
                Some(action) => {
                    let ctx = Context { key: Some(&key) };
                    self.dispatcher
                        .execute_action(&mut self.state, &action, ctx, sched);
                }
                None => debug!(%key, mode = self.state.modes().peek().name(), "unhandled key"),
            },
            Msg::External(line) => {
                debug!(%line, "external command");
                self.dispatcher.execute_line(&mut self.state, &line, sched);
            }
            Msg::DirectoryLoaded {
                path,
                nodes,
                focus,
                request_id,
            } => {
                self.state.on_directory_loaded(path, nodes, focus, request_id);
            }
            Msg::DirectoryFailed {
                path,
                error,
                request_id,
            } => self
                .state
                .on_directory_failed(&path, error, request_id, &mut fx),
            Msg::BulkFinished { summary, snapshot } => {
                self.state.on_bulk_finished(summary, snapshot, &mut fx)
            }
            Msg::ProcessFinished { label, outcome } => {
                self.state.on_process_finished(&label, outcome, &mut fx)
            }
            Msg::NotificationExpired(ticket) => self.state.on_notification_expired(ticket),
            Msg::Resize | Msg::Tick => {}
        }

        fx.flush(sched);
        if self.state.is_running() {
            Flow::Continue
        } else {
            Flow::Quit
        }
    }
}
