//! Application layer of keel.
//!
//! Holds the modal dispatch engine and the state it drives:
//! - [mode]: modes, actions and the mode stack
//! - [command]: typed commands, their registry and the command-line tokenizer
//! - [dispatch]: ordered execution of command chains with deferred effects
//! - [state] / [handlers]: the application state and how each command changes it
//! - [event_loop]: applies one message at a time
//!
//! Smaller pieces: [nav], [history], [selection], [notify] and [keymap].

pub mod command;
pub mod dispatch;
pub mod event_loop;
pub mod handlers;
pub mod history;
pub mod keymap;
pub mod mode;
pub mod nav;
pub mod notify;
pub mod selection;
pub mod state;

pub use command::{Command, CommandError, HandlerRegistry, tokenize};
pub use dispatch::{Context, Dispatcher, Effects};
pub use event_loop::{EventLoop, Flow};
pub use mode::{Action, Mode, ModeError, ModeStack};
pub use nav::{FocusSnapshot, NavState};
pub use notify::Level;
pub use state::{AppState, Settings};
