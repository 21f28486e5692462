//! Action dispatch.
//!
//! An [Action] runs its commands strictly in order against [AppState]. Commands mutate state
//! synchronously and may defer background work into [Effects]; the deferred tasks reach the
//! [Scheduler] only after the last command of the chain has run, so every command observes
//! the state left by the ones before it.

use crate::app::command::HandlerRegistry;
use crate::app::mode::Action;
use crate::app::state::AppState;
use crate::core::worker::{Scheduler, Task};

use tracing::debug;

/// Deferred tasks collected while a message is handled.
#[derive(Debug, Default)]
pub struct Effects {
    tasks: Vec<Task>,
}

impl Effects {
    pub fn defer(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Hands every collected task to `sched`, in the order they were deferred.
    pub fn flush(self, sched: &mut dyn Scheduler) {
        for task in self.tasks {
            sched.schedule(task);
        }
    }
}

/// What a command may look at besides the state: the key that triggered it, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context<'a> {
    pub key: Option<&'a str>,
}

pub struct Dispatcher {
    registry: HandlerRegistry,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Runs every command of `action`, then schedules the deferred tasks.
    pub fn execute_action(
        &self,
        state: &mut AppState,
        action: &Action,
        ctx: Context<'_>,
        sched: &mut dyn Scheduler,
    ) {
        let mut fx = Effects::default();
        for cmd in &action.commands {
            debug!(?cmd, key = ?ctx.key, "dispatch");
            state.apply(cmd, ctx, &mut fx);
        }
        fx.flush(sched);
    }

    /// Tokenizes an external command line and runs it as a single-command action.
    ///
    /// A blank line does nothing; an invalid one reports a warning.
    pub fn execute_line(&self, state: &mut AppState, line: &str, sched: &mut dyn Scheduler) {
        let Some(cmd) = self.registry.compile_line(line) else {
            return;
        };
        let action = Action::new(None, vec![cmd]);
        self.execute_action(state, &action, Context::default(), sched);
    }
}
