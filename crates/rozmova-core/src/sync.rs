//! Coordination gate for the external cache refresh.
//!
//! The periodic job that mirrors the call-detail-record database must not
//! run concurrently with itself. Instead of process-wide mutable flags,
//! the caller owns a [`SyncGate`] with explicit acquire/release semantics,
//! which also remembers when the last refresh finished.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

#[derive(Default)]
struct GateState {
    in_flight: bool,
    last_sync: Option<DateTime<Utc>>,
}

/// Single-holder gate with `try_acquire`/`release` semantics.
#[derive(Default)]
pub struct SyncGate {
    state: Mutex<GateState>,
}

impl SyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the gate. Returns false if a sync is already in flight.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.in_flight {
            return false;
        }
        state.in_flight = true;
        true
    }

    /// Release the gate and stamp the completion time.
    pub fn release(&self) {
        let mut state = self.state.lock().unwrap();
        state.in_flight = false;
        state.last_sync = Some(Utc::now());
    }

    /// When the last sync finished, if one ever has.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().last_sync
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().unwrap().in_flight
    }
}
