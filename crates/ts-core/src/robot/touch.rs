//! Shared touch state between the Sense and Act tasks.
//!
//! One mutex guards the touch flag together with the position and cycle the
//! Act task last published. The lock is only ever taken for short critical
//! sections; nothing blocks on I/O while holding it.
//!
//! Sense writes coalesce: several touches between two Act reads are seen as
//! one touched observation, and `writes` on the reading tells how many were
//! folded into it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ts_common::{Observation, Position};

/// Flag value meaning "no contact since the last read".
pub const FLAG_NOT_TOUCHED: f64 = 1.0;
/// Flag value meaning "contact registered".
pub const FLAG_TOUCHED: f64 = 0.0;

#[derive(Debug)]
struct TouchCell {
    flag: f64,
    writes_since_read: u64,
    position: Option<Position>,
    cycle: u64,
    polled_cycle: Option<u64>,
}

impl Default for TouchCell {
    fn default() -> Self {
        TouchCell {
            flag: FLAG_NOT_TOUCHED,
            writes_since_read: 0,
            position: None,
            cycle: 0,
            polled_cycle: None,
        }
    }
}

/// Result of an atomic read-and-reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchReading {
    pub observation: Observation,
    /// Raw flag value before the reset.
    pub flag: f64,
    /// Sense writes folded into this reading.
    pub writes: u64,
}

/// What the Sense task sees of the Act task's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchView {
    pub position: Option<Position>,
    /// Last completed Act cycle (0 before the first move).
    pub cycle: u64,
    /// A touch is waiting to be read.
    pub pending: bool,
}

/// Cloneable handle to the shared touch cell.
#[derive(Debug, Clone, Default)]
pub struct SharedTouchState {
    inner: Arc<(Mutex<TouchCell>, Condvar)>,
}

impl SharedTouchState {
    pub fn new() -> Self {
        Self::default()
    }

    // The cell holds plain values, so a panic in another holder cannot leave
    // it half-updated.
    fn lock(&self) -> MutexGuard<'_, TouchCell> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sense side: register a contact.
    pub fn mark_touched(&self) {
        let mut cell = self.lock();
        cell.flag = FLAG_TOUCHED;
        cell.writes_since_read += 1;
    }

    /// Act side: take the flag and reset it to "not touched" in one critical section.
    pub fn read_and_reset(&self) -> TouchReading {
        let mut cell = self.lock();
        let flag = cell.flag;
        let writes = cell.writes_since_read;
        cell.flag = FLAG_NOT_TOUCHED;
        cell.writes_since_read = 0;
        let observation = if flag == FLAG_TOUCHED {
            Observation::Touched
        } else {
            Observation::NotTouched
        };
        TouchReading {
            observation,
            flag,
            writes,
        }
    }

    /// Act side: publish the position reached and the cycle just completed.
    pub fn publish(&self, position: Option<Position>, cycle: u64) {
        let mut cell = self.lock();
        cell.position = position;
        cell.cycle = cycle;
    }

    /// Sense side: snapshot of the published progress.
    pub fn view(&self) -> TouchView {
        let cell = self.lock();
        TouchView {
            position: cell.position,
            cycle: cell.cycle,
            pending: cell.flag == FLAG_TOUCHED,
        }
    }

    /// Sense side: record that a poll has seen `cycle`, and wake a waiting Act task.
    pub fn acknowledge(&self, cycle: u64) {
        let mut cell = self.lock();
        if cell.polled_cycle.map_or(true, |c| c < cycle) {
            cell.polled_cycle = Some(cycle);
        }
        drop(cell);
        self.inner.1.notify_all();
    }

    /// Act side: wait until Sense has polled at least once after `cycle` was
    /// published. Returns `false` on timeout.
    pub fn wait_polled(&self, cycle: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cell = self.lock();
        loop {
            if cell.polled_cycle.is_some_and(|c| c >= cycle) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .inner
                .1
                .wait_timeout(cell, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            cell = guard;
        }
    }
}
