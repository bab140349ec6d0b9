//! Time source for credential timestamps, throttle windows and date keys

use std::fmt::Debug;

use chrono::{Local, TimeZone, Utc};

#[cfg(any(test, feature = "testing"))]
use parking_lot::Mutex;

/// Time provider. Seconds since the Unix epoch.
pub trait Clock: Send + Sync + Debug {
    fn now_secs(&self) -> i64;

    /// Local calendar day of `now_secs()` as `YYYYMMDD`
    fn date_key(&self) -> String {
        date_key_for(self.now_secs())
    }
}

/// Format a Unix timestamp as a local `YYYYMMDD` key
pub fn date_key_for(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format("%Y%m%d").to_string(),
        None => Utc::now().format("%Y%m%d").to_string(),
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock that only moves when told to.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
pub struct ManualClock {
    secs: Mutex<i64>,
}

#[cfg(any(test, feature = "testing"))]
impl ManualClock {
    pub fn new(secs: i64) -> Self {
        Self {
            secs: Mutex::new(secs),
        }
    }

    pub fn advance(&self, secs: i64) {
        *self.secs.lock() += secs;
    }

    pub fn set(&self, secs: i64) {
        *self.secs.lock() = secs;
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for ManualClock {
    fn now_secs(&self) -> i64 {
        *self.secs.lock()
    }
}
