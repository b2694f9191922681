//! Dismissible toast notifications surfaced by the presentation shell.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::util::unix_millis_now;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

impl NotificationLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: i64,
    pub read: bool,
}

#[derive(Debug, Default)]
struct Inbox {
    next_id: u64,
    pending: Vec<Notification>,
}

/// Queue of toasts waiting to be shown or dismissed.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    inbox: Mutex<Inbox>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a toast and return its id.
    pub fn push(&self, level: NotificationLevel, message: impl Into<String>) -> u64 {
        let message = message.into();
        match level {
            NotificationLevel::Error => tracing::warn!(%message, "Error notification"),
            _ => tracing::debug!(level = level.as_str(), %message, "Notification"),
        }

        let mut inbox = self.lock();
        inbox.next_id += 1;
        let id = inbox.next_id;
        inbox.pending.push(Notification {
            id,
            level,
            message,
            created_at: unix_millis_now(),
            read: false,
        });
        id
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(NotificationLevel::Error, message)
    }

    /// Remove a toast. Returns `false` if it was already gone.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut inbox = self.lock();
        let before = inbox.pending.len();
        inbox.pending.retain(|notification| notification.id != id);
        inbox.pending.len() != before
    }

    /// Mark one toast as seen. Returns `false` if it is gone or was
    /// already read.
    pub fn mark_read(&self, id: u64) -> bool {
        let mut inbox = self.lock();
        match inbox
            .pending
            .iter_mut()
            .find(|notification| notification.id == id)
        {
            Some(notification) if !notification.read => {
                notification.read = true;
                true
            }
            _ => false,
        }
    }

    /// Mark every pending toast as seen and return how many changed.
    pub fn mark_all_read(&self) -> usize {
        let mut inbox = self.lock();
        let mut changed = 0;
        for notification in inbox.pending.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            changed += 1;
        }
        changed
    }

    pub fn unread(&self) -> Vec<Notification> {
        self.lock()
            .pending
            .iter()
            .filter(|notification| !notification.read)
            .cloned()
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        self.lock()
            .pending
            .iter()
            .filter(|notification| !notification.read)
            .count()
    }

    /// Pending toasts, oldest first, without removing them.
    pub fn pending(&self) -> Vec<Notification> {
        self.lock().pending.clone()
    }

    /// Take every pending toast, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut self.lock().pending)
    }

    pub fn clear(&self) {
        self.lock().pending.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inbox> {
        self.inbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn push_assigns_increasing_ids() {
        let center = NotificationCenter::new();
        let first = center.success("Files uploaded successfully!");
        let second = center.error("Failed to delete file");
        assert!(second > first);

        let pending = center.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].level, NotificationLevel::Success);
        assert_eq!(pending[1].message, "Failed to delete file");
    }

    #[test]
    fn dismiss_removes_only_the_target() {
        let center = NotificationCenter::new();
        let keep = center.info("kept");
        let gone = center.info("dismissed");

        assert!(center.dismiss(gone));
        assert!(!center.dismiss(gone));
        let pending = center.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, keep);
    }

    #[test]
    fn read_state_tracks_individual_and_bulk_marks() {
        let center = NotificationCenter::new();
        let first = center.info("one");
        let second = center.success("two");
        let third = center.error("three");
        assert_eq!(center.unread_count(), 3);

        assert!(center.mark_read(second));
        assert!(!center.mark_read(second));
        assert!(!center.mark_read(99));
        let unread: Vec<u64> = center.unread().iter().map(|n| n.id).collect();
        assert_eq!(unread, vec![first, third]);

        assert_eq!(center.mark_all_read(), 2);
        assert_eq!(center.mark_all_read(), 0);
        assert!(center.unread().is_empty());
        assert_eq!(center.pending().len(), 3);
        assert!(center.pending().iter().all(|n| n.read));

        center.info("four");
        assert_eq!(center.unread_count(), 1);
    }

    #[test]
    fn drain_empties_the_queue() {
        let center = NotificationCenter::new();
        center.info("one");
        center.error("two");

        let drained = center.drain();
        assert_eq!(drained.len(), 2);
        assert!(center.pending().is_empty());

        center.info("three");
        center.clear();
        assert!(center.drain().is_empty());
    }
}
