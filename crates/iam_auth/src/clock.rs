//! Clock abstraction for the token cache
//!
//! The provider never reads ambient time directly; it asks an injected
//! [`Clock`] so tests can drive token staleness deterministically.

use chrono::{DateTime, Utc};

/// Source of the current instant
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
