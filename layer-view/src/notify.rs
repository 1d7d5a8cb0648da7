//! Operator notifications.

use std::sync::{Arc, Mutex};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// A message for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Host collaborator that surfaces notices to the operator.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Default notifier: routes notices to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Warning => log::warn!("{}", notice.message),
            NoticeLevel::Error => log::error!("{}", notice.message),
        }
    }
}

/// Notifier that keeps every notice in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notice received so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut guard) = self.notices.lock() {
            guard.push(notice);
        }
    }
}
