//! Transient notification line.
//!
//! At most one notification is shown at a time; a new one replaces the old. Each carries a
//! ticket so a delayed expiry only clears the notification it was scheduled for.

use std::fmt;
use std::time::Duration;

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub text: String,
    pub ticket: u64,
}

/// Expiry to schedule for a freshly posted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub ticket: u64,
    pub after: Duration,
}

pub struct Notifier {
    current: Option<Notification>,
    next_ticket: u64,
    timeout: Duration,
}

impl Notifier {
    pub fn new(timeout: Duration) -> Self {
        Self {
            current: None,
            next_ticket: 0,
            timeout,
        }
    }

    /// Posts a notification, replacing the current one.
    ///
    /// Only success notifications auto-clear; for those the expiry to schedule is returned.
    pub fn post(&mut self, level: Level, text: impl Into<String>) -> Option<Expiry> {
        let text = text.into();
        match level {
            Level::Info | Level::Success => info!(%level, "{text}"),
            Level::Warning => warn!("{text}"),
            Level::Error => error!("{text}"),
        }

        self.next_ticket = self.next_ticket.wrapping_add(1);
        let ticket = self.next_ticket;
        self.current = Some(Notification {
            level,
            text,
            ticket,
        });

        (level == Level::Success).then_some(Expiry {
            ticket,
            after: self.timeout,
        })
    }

    /// Clears the notification if it still carries `ticket`. Returns whether it was cleared.
    pub fn expire(&mut self, ticket: u64) -> bool {
        if self.current.as_ref().is_some_and(|n| n.ticket == ticket) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    #[inline]
    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }
}
