//! Lifecycle state for the streaming pipeline.
//!
//! States only move forward: Running → Draining → Cancelling → Stopped. A
//! transition that would move backwards is ignored, which is what makes teardown
//! idempotent.

use crate::cancel::CancelToken;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::task::JoinHandle;

/// Pipeline lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LifecycleState {
    /// Accepting items and analyzing
    Running = 0,
    /// Completion signalled; queued items still drain
    Draining = 1,
    /// Teardown requested; the background task is being stopped
    Cancelling = 2,
    /// Terminal
    Stopped = 3,
}

impl From<u8> for LifecycleState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Draining,
            2 => Self::Cancelling,
            _ => Self::Stopped,
        }
    }
}

/// Shared lifecycle bookkeeping: state, shutdown token, background task handle.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: AtomicU8,
    shutdown: CancelToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Lifecycle {
    pub(crate) fn new(shutdown: CancelToken) -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Running as u8),
            shutdown,
            task: Mutex::new(None),
        }
    }

    pub(crate) fn state(&self) -> LifecycleState {
        LifecycleState::from(self.state.load(Ordering::Acquire))
    }

    /// Move forward to `next`; returns the state held before the call.
    pub(crate) fn advance(&self, next: LifecycleState) -> LifecycleState {
        LifecycleState::from(self.state.fetch_max(next as u8, Ordering::AcqRel))
    }

    pub(crate) const fn shutdown_token(&self) -> &CancelToken {
        &self.shutdown
    }

    pub(crate) fn attach(&self, handle: JoinHandle<()>) {
        *self.task.lock() = Some(handle);
    }

    pub(crate) fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().take()
    }
}
