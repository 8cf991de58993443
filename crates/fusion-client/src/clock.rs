//! Time source used by retry backoff, cache freshness and polling.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Monotonic time, wall time and sleeping behind one seam.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Monotonic now.
    fn now(&self) -> Instant;

    /// Wall-clock now.
    fn wall(&self) -> DateTime<Utc>;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Clock shared across components.
pub type SharedClock = Arc<dyn Clock>;

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Test clock. `sleep` returns immediately and advances time instead.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    wall_base: DateTime<Utc>,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// A clock whose wall time starts at `wall`.
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            base: Instant::now(),
            wall_base: wall,
            state: Mutex::new(ManualState::default()),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        self.state.lock().offset += by;
    }

    /// Every duration passed to `sleep`, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }

    /// Total time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().offset
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.state.lock().offset
    }

    fn wall(&self) -> DateTime<Utc> {
        let offset = self.state.lock().offset;
        self.wall_base + chrono::Duration::from_std(offset).unwrap_or_else(|_| chrono::Duration::zero())
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.offset += duration;
        state.sleeps.push(duration);
    }
}
