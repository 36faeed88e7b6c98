//! Timestamped values

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable (timestamp, value) pair.
///
/// Ordering is structural: by timestamp first, then by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamped<T> {
    pub timestamp: DateTime<Utc>,
    pub value: T,
}

impl<T> Timestamped<T> {
    pub fn new(timestamp: DateTime<Utc>, value: T) -> Self {
        Self { timestamp, value }
    }

    /// Pair `value` with the current time
    pub fn now(value: T) -> Self {
        Self::new(Utc::now(), value)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Timestamped<U> {
        Timestamped {
            timestamp: self.timestamp,
            value: f(self.value),
        }
    }
}

/// The zero value: UNIX epoch paired with `T::default()`.
impl<T: Default> Default for Timestamped<T> {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH, T::default())
    }
}

impl<T: fmt::Display> fmt::Display for Timestamped<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.value, self.timestamp.to_rfc3339())
    }
}
