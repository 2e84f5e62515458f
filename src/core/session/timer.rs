//! One-shot timers owned by the session actor.
//!
//! A [`TimerSlot`] holds at most one pending sleep. Re-arming aborts the
//! previous sleep and bumps the slot generation; a firing is delivered as
//! [`TimerFired`] carrying that generation, and the actor drops firings whose
//! generation is no longer current. Dropping a slot aborts its sleep, so no
//! timer outlives the session.

use std::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// The timers a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Debounced flush of the user delta buffer
    UserFlush,
    /// Debounced (or gate-retry) flush of the assistant delta buffer
    AssistantFlush,
    /// Assistant turn never reported its end
    AiFallback,
    /// Clears the surfaced warning
    WarningExpiry,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::UserFlush => write!(f, "user_flush"),
            TimerKind::AssistantFlush => write!(f, "assistant_flush"),
            TimerKind::AiFallback => write!(f, "ai_fallback"),
            TimerKind::WarningExpiry => write!(f, "warning_expiry"),
        }
    }
}

/// A timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Slot for one pending timer.
#[derive(Debug)]
pub struct TimerSlot {
    kind: TimerKind,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            generation: 0,
            handle: None,
        }
    }

    /// Arm the slot, replacing any pending timer. `on_fire` runs once after
    /// `delay` unless the slot is re-armed, cancelled or dropped first.
    pub fn arm<F>(&mut self, delay: Duration, on_fire: F) -> u64
    where
        F: FnOnce(TimerFired) + Send + 'static,
    {
        self.abort();
        self.generation += 1;
        let fired = TimerFired {
            kind: self.kind,
            generation: self.generation,
        };
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire(fired);
        }));
        self.generation
    }

    /// Cancel the pending timer, if any.
    pub fn cancel(&mut self) {
        if self.handle.is_some() {
            self.abort();
            self.generation += 1;
        }
    }

    /// Accept a firing. Returns false for stale firings; a current firing
    /// disarms the slot.
    pub fn accept(&mut self, fired: TimerFired) -> bool {
        if fired.kind != self.kind || fired.generation != self.generation || self.handle.is_none()
        {
            return false;
        }
        self.handle = None;
        true
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Every timer a session owns.
#[derive(Debug)]
pub struct SessionTimers {
    pub user_flush: TimerSlot,
    pub assistant_flush: TimerSlot,
    pub ai_fallback: TimerSlot,
    pub warning_expiry: TimerSlot,
}

impl Default for SessionTimers {
    fn default() -> Self {
        Self {
            user_flush: TimerSlot::new(TimerKind::UserFlush),
            assistant_flush: TimerSlot::new(TimerKind::AssistantFlush),
            ai_fallback: TimerSlot::new(TimerKind::AiFallback),
            warning_expiry: TimerSlot::new(TimerKind::WarningExpiry),
        }
    }
}

impl SessionTimers {
    pub fn slot_mut(&mut self, kind: TimerKind) -> &mut TimerSlot {
        match kind {
            TimerKind::UserFlush => &mut self.user_flush,
            TimerKind::AssistantFlush => &mut self.assistant_flush,
            TimerKind::AiFallback => &mut self.ai_fallback,
            TimerKind::WarningExpiry => &mut self.warning_expiry,
        }
    }

    /// Cancel the transcript and turn timers. The warning timer is left alone
    /// so a surfaced warning still expires after teardown.
    pub fn cancel_session(&mut self) {
        self.user_flush.cancel();
        self.assistant_flush.cancel();
        self.ai_fallback.cancel();
    }

    pub fn cancel_all(&mut self) {
        self.cancel_session();
        self.warning_expiry.cancel();
    }
}
