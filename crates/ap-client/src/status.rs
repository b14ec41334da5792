//! Player-facing status line and session identity

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Latest status string and session UUID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusMessage {
    pub status: String,
    pub uuid: String,
    /// Number of status changes so far
    pub revision: u64,
}

/// Status holder with its own lock, so reads never wait on session calls
#[derive(Debug, Default)]
pub struct StatusRegistry {
    inner: Mutex<StatusMessage>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the status; returns false if it was already identical
    pub fn set_status(&self, status: impl Into<String>) -> bool {
        let status = status.into();
        let mut inner = self.lock();
        if inner.status == status {
            return false;
        }
        info!("Status: {}", status);
        inner.status = status;
        inner.revision += 1;
        true
    }

    pub fn set_uuid(&self, uuid: impl Into<String>) {
        self.lock().uuid = uuid.into();
    }

    pub fn status(&self) -> String {
        self.lock().status.clone()
    }

    pub fn uuid(&self) -> String {
        self.lock().uuid.clone()
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Consistent copy of status, UUID and revision
    pub fn snapshot(&self) -> StatusMessage {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, StatusMessage> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_counts_changes_only() {
        let registry = StatusRegistry::new();
        assert!(registry.set_status("Connecting"));
        assert!(!registry.set_status("Connecting"));
        assert!(registry.set_status("Connected"));
        assert_eq!(registry.revision(), 2);
        assert_eq!(registry.status(), "Connected");
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let registry = StatusRegistry::new();
        registry.set_uuid("abc");
        registry.set_status("Disconnected");
        let snap = registry.snapshot();
        assert_eq!(snap.uuid, "abc");
        assert_eq!(snap.status, "Disconnected");
        assert_eq!(snap.revision, 1);
    }
}
