//! Interaction modes and the mode stack.
//!
//! A [Mode] binds key identifiers to [Action]s. The [ModeStack] keeps the active modes; its
//! bottom element is the permanent default mode, so the stack is never empty.

use crate::app::command::Command;
use crate::app::keymap::is_alphabetic_key;

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error("mode not found: {0}")]
    ModeNotFound(String),
    #[error("cannot pop the last mode")]
    EmptyStack,
}

/// Help text and the ordered command chain run for a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub help: Option<String>,
    pub commands: Vec<Command>,
}

impl Action {
    pub fn new(help: Option<String>, commands: Vec<Command>) -> Self {
        Self { help, commands }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    name: String,
    help: Option<String>,
    keys: HashMap<String, Action>,
    default: Option<Action>,
    alphabet: Option<Action>,
}

impl Mode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: None,
            keys: HashMap::new(),
            default: None,
            alphabet: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn bind(&mut self, key: impl Into<String>, action: Action) {
        self.keys.insert(key.into(), action);
    }

    pub fn set_default(&mut self, action: Action) {
        self.default = Some(action);
    }

    pub fn set_alphabet(&mut self, action: Action) {
        self.alphabet = Some(action);
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Key bindings sorted by key, for help display.
    pub fn bindings(&self) -> Vec<(&str, &Action)> {
        let mut v: Vec<_> = self.keys.iter().map(|(k, a)| (k.as_str(), a)).collect();
        v.sort_by(|a, b| a.0.cmp(b.0));
        v
    }

    /// Finds the action for `key`.
    ///
    /// Priority: exact binding, then the alphabet wildcard for a single alphabetic key, then
    /// the mode default. `None` means the key is unhandled.
    pub fn resolve(&self, key: &str) -> Option<&Action> {
        if let Some(action) = self.keys.get(key) {
            return Some(action);
        }
        if let Some(action) = &self.alphabet
            && is_alphabetic_key(key)
        {
            return Some(action);
        }
        self.default.as_ref()
    }

    /// Every command in every action of this mode.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.keys
            .values()
            .chain(self.default.iter())
            .chain(self.alphabet.iter())
            .flat_map(|a| a.commands.iter())
    }

    /// Overlays `other` onto this mode key by key.
    pub fn merge(&mut self, other: Mode) {
        if other.help.is_some() {
            self.help = other.help;
        }
        self.keys.extend(other.keys);
        if other.default.is_some() {
            self.default = other.default;
        }
        if other.alphabet.is_some() {
            self.alphabet = other.alphabet;
        }
    }
}

/// The registry of known modes plus the stack of active ones.
#[derive(Debug, Clone)]
pub struct ModeStack {
    modes: HashMap<String, Mode>,
    stack: Vec<String>,
}

impl ModeStack {
    /// Builds a stack whose permanent bottom is `bottom`.
    pub fn new(modes: HashMap<String, Mode>, bottom: &str) -> Result<Self, ModeError> {
        if !modes.contains_key(bottom) {
            return Err(ModeError::ModeNotFound(bottom.to_string()));
        }
        Ok(Self {
            modes,
            stack: vec![bottom.to_string()],
        })
    }

    pub fn push(&mut self, name: &str) -> Result<(), ModeError> {
        if !self.modes.contains_key(name) {
            return Err(ModeError::ModeNotFound(name.to_string()));
        }
        self.stack.push(name.to_string());
        Ok(())
    }

    pub fn pop(&mut self) -> Result<(), ModeError> {
        if self.stack.len() <= 1 {
            return Err(ModeError::EmptyStack);
        }
        self.stack.pop();
        Ok(())
    }

    /// Replaces the top mode. On a singleton stack the mode is pushed instead.
    pub fn switch(&mut self, name: &str) -> Result<(), ModeError> {
        if !self.modes.contains_key(name) {
            return Err(ModeError::ModeNotFound(name.to_string()));
        }
        if self.stack.len() > 1 {
            self.stack.pop();
        }
        self.stack.push(name.to_string());
        Ok(())
    }

    /// Pops back to the bottom mode.
    pub fn reset(&mut self) {
        self.stack.truncate(1);
    }

    /// The active mode.
    pub fn peek(&self) -> &Mode {
        // The stack is never empty and only holds registered names.
        let name = self.stack.last().map(String::as_str).unwrap_or_default();
        &self.modes[name]
    }

    /// Resolves `key` against the active mode.
    pub fn resolve(&self, key: &str) -> Option<&Action> {
        self.peek().resolve(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.stack
    }

    pub fn get(&self, name: &str) -> Option<&Mode> {
        self.modes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(cmd: Command) -> Action {
        Action::new(None, vec![cmd])
    }

    fn registry() -> HashMap<String, Mode> {
        let mut default = Mode::new("default");
        default.bind("a", action(Command::FocusFirst));
        default.set_alphabet(action(Command::FocusLast));
        default.set_default(action(Command::ClearNotification));

        let mut action_mode = Mode::new("action");
        action_mode.bind("esc", action(Command::PopMode));

        [default, action_mode]
            .into_iter()
            .map(|m| (m.name().to_string(), m))
            .collect()
    }

    #[test]
    fn resolve_priority() {
        let modes = registry();
        let mode = &modes["default"];
        assert_eq!(mode.resolve("a"), Some(&action(Command::FocusFirst)));
        assert_eq!(mode.resolve("b"), Some(&action(Command::FocusLast)));
        assert_eq!(mode.resolve("esc"), Some(&action(Command::ClearNotification)));
        assert_eq!(mode.resolve("1"), Some(&action(Command::ClearNotification)));

        let bare = &modes["action"];
        assert_eq!(bare.resolve("x"), None);
    }

    #[test]
    fn stack_never_empties() -> Result<(), Box<dyn std::error::Error>> {
        let mut stack = ModeStack::new(registry(), "default")?;
        assert_eq!(stack.pop(), Err(ModeError::EmptyStack));
        assert_eq!(stack.len(), 1);

        assert_eq!(
            stack.push("nope"),
            Err(ModeError::ModeNotFound("nope".into()))
        );
        assert_eq!(stack.len(), 1);

        stack.push("action")?;
        assert_eq!(stack.peek().name(), "action");
        stack.pop()?;
        assert_eq!(stack.peek().name(), "default");
        Ok(())
    }

    #[test]
    fn switch_and_reset() -> Result<(), Box<dyn std::error::Error>> {
        let mut stack = ModeStack::new(registry(), "default")?;
        stack.switch("action")?;
        assert_eq!(stack.names(), &["default".to_string(), "action".to_string()]);
        stack.switch("default")?;
        assert_eq!(stack.len(), 2);
        stack.push("action")?;
        stack.reset();
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.peek().name(), "default");
        assert!(ModeStack::new(registry(), "missing").is_err());
        Ok(())
    }

    #[test]
    fn merge_overlays_keys() {
        let mut base = Mode::new("default");
        base.bind("j", action(Command::FocusNext));
        base.bind("k", action(Command::FocusPrevious));

        let mut user = Mode::new("default");
        user.bind("j", action(Command::FocusLast));
        user.set_default(action(Command::ClearNotification));
        base.merge(user);

        assert_eq!(base.resolve("j"), Some(&action(Command::FocusLast)));
        assert_eq!(base.resolve("k"), Some(&action(Command::FocusPrevious)));
        assert_eq!(base.resolve("z"), Some(&action(Command::ClearNotification)));
    }
}
