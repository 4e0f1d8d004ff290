//! Per-room countdown clock for typeclaim.
//!
//! A [`CountdownClock`] counts whole periods (one second by default)
//! down to zero. It does not spawn anything: the room actor owns it and
//! polls [`CountdownClock::wait_for_tick`] inside its `select!` loop, so
//! ticks are processed in the same serialized order as player commands.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* join, claim, leave ... */ }
//!         tick = clock.wait_for_tick() => { /* timerUpdate, maybe game over */ }
//!     }
//! }
//! ```
//!
//! # Cancellation
//!
//! [`CountdownClock::stop`] clears the deadline. Because the tick future
//! is only ever polled by the owner, a stopped clock cannot deliver a
//! late tick. Each [`start`](CountdownClock::start) also opens a new
//! [`ClockEpoch`], which the owner can compare against to reject a tick
//! that belongs to an earlier run.

use std::fmt;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a countdown clock.
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Length of one countdown step. Default: one second.
    pub period: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Identifies one run of a clock, from `start` to expiry or `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockEpoch(u64);

impl fmt::Display for ClockEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch-{}", self.0)
    }
}

/// One elapsed period, returned by [`CountdownClock::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    /// The run this tick belongs to.
    pub epoch: ClockEpoch,
    /// Periods left after this tick.
    pub remaining: u32,
    /// `true` on the tick that reached zero. The clock has already
    /// stopped itself when this is returned.
    pub expired: bool,
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// A cancellable countdown bound to a single owner.
pub struct CountdownClock {
    period: Duration,
    remaining: u32,
    /// Deadline of the next tick; `None` while stopped.
    next_tick: Option<Instant>,
    epoch: u64,
    ticks_fired: u64,
}

impl CountdownClock {
    /// Creates a stopped clock.
    pub fn new(config: ClockConfig) -> Self {
        let period = if config.period.is_zero() {
            warn!("clock period of zero is not allowed, using 1ms");
            Duration::from_millis(1)
        } else {
            config.period
        };
        Self {
            period,
            remaining: 0,
            next_tick: None,
            epoch: 0,
            ticks_fired: 0,
        }
    }

    /// Starts counting down from `periods`, replacing any current run.
    ///
    /// The first tick fires one period from now. Starting with zero
    /// periods expires on that first tick.
    pub fn start(&mut self, periods: u32) -> ClockEpoch {
        if self.next_tick.is_some() {
            debug!(epoch = self.epoch, "restarting clock that was still running");
        }
        self.epoch += 1;
        self.remaining = periods;
        self.next_tick = Some(Instant::now() + self.period);
        debug!(epoch = self.epoch, periods, "clock started");
        ClockEpoch(self.epoch)
    }

    /// Stops the clock. Returns `true` if it was running.
    ///
    /// Safe to call repeatedly.
    pub fn stop(&mut self) -> bool {
        let was_running = self.next_tick.take().is_some();
        if was_running {
            debug!(epoch = self.epoch, remaining = self.remaining, "clock stopped");
        }
        was_running
    }

    /// Waits for the next period to elapse.
    ///
    /// While the clock is stopped this future never resolves, which lets
    /// it sit in a `select!` next to the command channel. It is cancel
    /// safe: state only changes after the sleep completes.
    pub async fn wait_for_tick(&mut self) -> ClockTick {
        let Some(deadline) = self.next_tick else {
            return std::future::pending().await;
        };

        time::sleep_until(deadline).await;

        let now = Instant::now();
        self.ticks_fired += 1;
        self.remaining = self.remaining.saturating_sub(1);
        let expired = self.remaining == 0;

        if expired {
            self.next_tick = None;
            debug!(epoch = self.epoch, "clock expired");
        } else {
            // Hold the cadence unless we fell a whole period behind.
            let late_by = now.saturating_duration_since(deadline);
            self.next_tick = Some(if late_by >= self.period {
                warn!(
                    epoch = self.epoch,
                    late_ms = late_by.as_millis() as u64,
                    "clock tick late, rescheduling from now"
                );
                now + self.period
            } else {
                deadline + self.period
            });
        }

        trace!(epoch = self.epoch, remaining = self.remaining, "clock tick");

        ClockTick {
            epoch: ClockEpoch(self.epoch),
            remaining: self.remaining,
            expired,
        }
    }

    /// Whether a countdown is in progress.
    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// The current run, if the clock is running.
    pub fn epoch(&self) -> Option<ClockEpoch> {
        self.is_running().then_some(ClockEpoch(self.epoch))
    }

    /// Periods left in the current (or last) run.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Total ticks delivered over the clock's lifetime.
    pub fn ticks_fired(&self) -> u64 {
        self.ticks_fired
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for CountdownClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}
