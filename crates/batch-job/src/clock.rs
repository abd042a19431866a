//! Injectable time source.
//!
//! Every timestamp the core reads goes through a [`Clock`] rather than a
//! direct call to the system clock, so tests can pin `now()` instead of
//! racing real time.

use chrono::{DateTime, Utc};

/// A source of the current UTC instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock: delegates to [`Utc::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
