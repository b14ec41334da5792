//! Scoped exclusive access to a resource that may be absent
//!
//! The session object is not safe for concurrent use. Every touch goes through
//! one lock, held only for the duration of a single closure, and absence is an
//! explicit result the caller must handle.

use ap_core::{ApError, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock-scoped access to an optional `T`
#[derive(Debug)]
pub struct Exclusive<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for Exclusive<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Exclusive<T> {
    /// Create with no resource installed
    pub fn empty() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    pub fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(Some(value)),
        }
    }

    /// Run `f` with exclusive access, or return `None` without calling it
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.lock().as_mut().map(f)
    }

    /// Like [`Exclusive::with`] for fallible closures; absence becomes
    /// [`ApError::NotConnected`]
    pub fn try_with<R>(&self, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        self.with(f).unwrap_or(Err(ApError::NotConnected))
    }

    /// Run `f` against the slot itself, for installing or removing the resource
    pub fn with_slot<R>(&self, f: impl FnOnce(&mut Option<T>) -> R) -> R {
        f(&mut self.lock())
    }

    /// Remove and return the resource
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_present(&self) -> bool {
        self.lock().is_some()
    }

    // A closure that panicked already released the guard during unwinding;
    // the data is still consistent, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
