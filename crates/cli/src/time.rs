// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Time abstraction for the poll loop.
//!
//! The engine sleeps between status polls and checks credential expiry
//! through a `Clock`. Tests swap in a `FakeClock`, which advances virtual
//! time on sleep and records every sleep it was asked for, so poll budgets
//! can be asserted without wall-clock delays.

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Clock trait for time abstraction
pub trait Clock: Send + Sync {
    /// Get current time as milliseconds since epoch
    fn now_millis(&self) -> u64;

    /// Sleep for a duration
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Current time as a UTC timestamp
    fn now_utc(&self) -> chrono::DateTime<chrono::Utc> {
        let millis = i64::try_from(self.now_millis()).unwrap_or(i64::MAX);
        chrono::DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}

/// Real clock using system time
#[derive(Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone, Debug)]
pub struct FakeClock {
    current_millis: Arc<AtomicU64>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl FakeClock {
    /// Create a new fake clock starting at a given time
    pub fn new(start_millis: u64) -> Self {
        Self {
            current_millis: Arc::new(AtomicU64::new(start_millis)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a fake clock starting at Unix epoch
    pub fn at_epoch() -> Self {
        Self::new(0)
    }

    /// Advance time by a duration
    pub fn advance(&self, duration: Duration) {
        self.current_millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Set absolute time
    pub fn set(&self, millis: u64) {
        self.current_millis.store(millis, Ordering::SeqCst);
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Number of sleeps requested so far
    pub fn sleep_count(&self) -> usize {
        self.sleeps.lock().len()
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::at_epoch()
    }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> u64 {
        self.current_millis.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.sleeps.lock().push(duration);
        self.advance(duration);
        Box::pin(async {})
    }
}

/// Clock handle that can be either real or fake
#[derive(Clone, Debug)]
pub enum ClockHandle {
    System(SystemClock),
    Fake(FakeClock),
}

impl ClockHandle {
    /// Create a system clock handle
    pub fn system() -> Self {
        Self::System(SystemClock)
    }

    /// Create a fake clock handle at a specific time
    pub fn fake_at(millis: u64) -> Self {
        Self::Fake(FakeClock::new(millis))
    }

    /// Get as fake clock for manipulation (returns None for system clock)
    pub fn as_fake(&self) -> Option<&FakeClock> {
        match self {
            Self::Fake(f) => Some(f),
            Self::System(_) => None,
        }
    }
}

impl Clock for ClockHandle {
    fn now_millis(&self) -> u64 {
        match self {
            Self::System(c) => c.now_millis(),
            Self::Fake(c) => c.now_millis(),
        }
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        match self {
            Self::System(c) => c.sleep(duration),
            Self::Fake(c) => c.sleep(duration),
        }
    }
}

impl Default for ClockHandle {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
