//! Per-tick driver
//!
//! `poll` pumps the session under its lock, then applies whatever the session
//! emitted with the lock released: lifecycle bookkeeping first, then one
//! deferred task per event for the game hooks. It also owns the reconnect
//! policy and the error rate limit.

use crate::controller::ConnectionController;
use crate::hooks::{GameHooks, into_task};
use ap_core::{ApError, ConnectionState, ConnectionTarget, DisconnectCause, SessionEvent};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Poll-side bookkeeping, guarded by its own lock
pub(crate) struct PollBook {
    events: mpsc::UnboundedReceiver<(u64, SessionEvent)>,
    pub(crate) target: Option<ConnectionTarget>,
    /// Session generation the timestamps below belong to
    generation: u64,
    pub(crate) last_poll: Option<Instant>,
    connection_start: Option<Instant>,
    last_error: Option<Instant>,
    /// Start of the current backoff interval
    retry_anchor: Option<Instant>,
    attempts: u32,
}

impl PollBook {
    pub(crate) fn new(events: mpsc::UnboundedReceiver<(u64, SessionEvent)>) -> Self {
        Self {
            events,
            target: None,
            generation: 0,
            last_poll: None,
            connection_start: None,
            last_error: None,
            retry_anchor: None,
            attempts: 0,
        }
    }

    pub(crate) fn start(&mut self, target: ConnectionTarget, generation: u64, now: Instant) {
        self.target = Some(target);
        self.generation = generation;
        self.connection_start = Some(now);
        self.last_error = None;
        self.clear_retry();
    }

    pub(crate) fn clear_retry(&mut self) {
        self.retry_anchor = None;
        self.attempts = 0;
    }

    fn drain_events(&mut self) -> Vec<(u64, SessionEvent)> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Claims the error status slot if the last report is older than `window`
    fn error_report_due(&mut self, now: Instant, window: Duration) -> bool {
        match self.last_error {
            Some(last) if now.duration_since(last) < window => false,
            _ => {
                self.last_error = Some(now);
                true
            }
        }
    }
}

enum RetryStep {
    Wait,
    GiveUp(u32),
    Attempt(u32),
}

impl<G: GameHooks> ConnectionController<G> {
    /// Advance the session by one tick; never blocks on the network
    ///
    /// Call once per tick on the game thread, before
    /// [`ConnectionController::process_main_thread_tasks`].
    pub fn poll(&self) {
        let now = self.clock.now();

        if let Some(Err(e)) = self.shared.session.with(|s| s.poll()) {
            self.report_error(now, &e);
        }

        let events = {
            let mut book = self.book();
            book.last_poll = Some(now);
            book.drain_events()
        };

        let current = self.shared.generation.load(Ordering::SeqCst);
        for (generation, event) in events {
            if generation != current {
                debug!("Dropping {} from a replaced session", event.kind());
                continue;
            }
            if self.apply_event(now, generation, &event) {
                self.dispatcher.enqueue_boxed(into_task(event));
            }
        }

        self.check_handshake_timeout(now);
        self.maybe_reconnect(now);
    }

    /// Lifecycle side of an event; returns whether the game should see it
    fn apply_event(&self, now: Instant, generation: u64, event: &SessionEvent) -> bool {
        // A disconnect and reconnect may have happened since the drain
        let is_current = || self.shared.generation.load(Ordering::SeqCst) == generation;
        match event {
            SessionEvent::Connected(info) => {
                let accepted = self.shared.session.with_slot(|slot| {
                    if slot.is_none() || !is_current() {
                        return false;
                    }
                    let state = self.shared.state();
                    let pending = matches!(
                        state,
                        ConnectionState::Connecting | ConnectionState::Reconnecting
                    );
                    if pending {
                        self.shared.set_state(ConnectionState::Connected);
                    }
                    pending
                });
                if !accepted {
                    debug!("Ignoring Connected event in state {}", self.state());
                    return false;
                }

                let slot_name = {
                    let mut book = self.book();
                    book.clear_retry();
                    book.last_error = None;
                    book.target
                        .as_ref()
                        .map(|t| t.slot().to_string())
                        .unwrap_or_default()
                };
                info!("Connected as {} (slot {}, team {})", slot_name, info.slot, info.team);
                self.shared
                    .status
                    .set_status(format!("Connected as {}", slot_name));
                true
            }
            SessionEvent::Disconnected(DisconnectCause::Transient(reason)) => {
                self.transient_failure(now, reason);
                true
            }
            SessionEvent::Disconnected(cause) if cause.is_fatal() => {
                let dropped = self.shared.session.with_slot(|slot| {
                    if slot.is_none() || !is_current() {
                        return false;
                    }
                    slot.take();
                    self.shared.generation.fetch_add(1, Ordering::SeqCst);
                    self.shared.set_state(ConnectionState::Disconnected);
                    true
                });
                if dropped {
                    let err = match cause {
                        DisconnectCause::Refused(errors) => ApError::ConnectionRefused(errors.clone()),
                        DisconnectCause::HandshakeFailed(reason) => {
                            ApError::HandshakeFailed(reason.clone())
                        }
                        DisconnectCause::Transient(reason) => {
                            ApError::TransientNetwork(reason.clone())
                        }
                    };
                    warn!("Session closed: {}", err);
                    self.book().clear_retry();
                    self.shared.status.set_status(err.to_string());
                }
                true
            }
            SessionEvent::Disconnected(_) => true,
            SessionEvent::PrintedMessage(text) => {
                debug!("Server: {}", text);
                true
            }
            _ => true,
        }
    }

    fn report_error(&self, now: Instant, err: &ApError) {
        match err {
            ApError::TransientNetwork(reason) => self.transient_failure(now, reason),
            _ => self.rate_limited_status(now, format!("Session error: {}", err)),
        }
    }

    /// Move a live connection to Reconnecting and report, rate limited
    fn transient_failure(&self, now: Instant, reason: &str) {
        let moved = self.shared.session.with_slot(|slot| {
            let live = matches!(
                self.shared.state(),
                ConnectionState::Connecting | ConnectionState::Connected
            );
            if slot.is_some() && live {
                self.shared.set_state(ConnectionState::Reconnecting);
            }
            slot.is_some() && live
        });

        // Backoff runs from the drop; errors while already down do not restart it
        if moved {
            warn!("Connection lost: {}", reason);
            self.book().retry_anchor = Some(now);
        }
        self.rate_limited_status(now, format!("Connection error: {}", reason));
    }

    fn rate_limited_status(&self, now: Instant, status: String) {
        let due = self.book().error_report_due(now, self.config.error_window());
        if due {
            self.shared.status.set_status(status);
        } else {
            debug!("Suppressed status update: {}", status);
        }
    }

    fn check_handshake_timeout(&self, now: Instant) {
        if self.state() != ConnectionState::Connecting {
            return;
        }
        let timeout = self.config.reconnect.handshake_timeout();
        let timed_out = {
            let book = self.book();
            book.generation == self.shared.generation.load(Ordering::SeqCst)
                && book
                    .connection_start
                    .is_some_and(|start| now.duration_since(start) >= timeout)
        };
        if timed_out {
            self.transient_failure(now, "handshake timed out");
        }
    }

    fn maybe_reconnect(&self, now: Instant) {
        if !self.shared.has_attempted.load(Ordering::SeqCst)
            || self.state() != ConnectionState::Reconnecting
        {
            return;
        }

        let policy = &self.config.reconnect;
        let step = {
            let mut book = self.book();
            let anchor = book.retry_anchor.or(book.connection_start).unwrap_or(now);
            if now.duration_since(anchor) < policy.delay_for(book.attempts) {
                RetryStep::Wait
            } else if book.attempts >= policy.max_attempts {
                RetryStep::GiveUp(book.attempts)
            } else {
                book.attempts += 1;
                book.retry_anchor = Some(now);
                RetryStep::Attempt(book.attempts)
            }
        };

        match step {
            RetryStep::Wait => {}
            RetryStep::GiveUp(attempts) => {
                let gave_up = self.shared.session.with_slot(|slot| {
                    if slot.is_none() || self.shared.state() != ConnectionState::Reconnecting {
                        return false;
                    }
                    slot.take();
                    self.shared.generation.fetch_add(1, Ordering::SeqCst);
                    self.shared.set_state(ConnectionState::FailedPermanently);
                    true
                });
                if gave_up {
                    warn!("Giving up after {} reconnect attempts", attempts);
                    self.shared.status.set_status(format!(
                        "Connection failed after {} attempts; connect again to retry",
                        attempts
                    ));
                }
            }
            RetryStep::Attempt(attempt) => {
                info!("Reconnect attempt {}/{}", attempt, policy.max_attempts);
                self.shared.status.set_status(format!(
                    "Reconnecting (attempt {}/{})...",
                    attempt, policy.max_attempts
                ));
                if let Some(Err(e)) = self.shared.session.with(|s| s.reconnect()) {
                    self.report_error(now, &e);
                }
            }
        }
    }
}
