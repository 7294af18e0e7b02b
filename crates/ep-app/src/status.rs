//! Status channel between services and whatever frontend displays them.

use std::sync::mpsc::{Receiver, Sender, channel};

use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub at: DateTime<Local>,
    pub level: StatusLevel,
    pub text: String,
}

/// Sending half handed to services. Messages sent after the receiver is
/// gone are dropped.
#[derive(Debug, Clone, Default)]
pub struct StatusSender {
    tx: Option<Sender<StatusMessage>>,
}

pub fn status_channel() -> (StatusSender, Receiver<StatusMessage>) {
    let (tx, rx) = channel();
    (StatusSender { tx: Some(tx) }, rx)
}

impl StatusSender {
    /// A sender nobody listens to.
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(StatusLevel::Info, text.into());
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.push(StatusLevel::Warning, text.into());
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(StatusLevel::Error, text.into());
    }

    fn push(&self, level: StatusLevel, text: String) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(StatusMessage {
                at: Local::now(),
                level,
                text,
            });
        }
    }
}
