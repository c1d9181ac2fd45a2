//! Deadlines for engine invocations.

use std::time::{Duration, Instant};

/// Calculate the duration from now until a deadline, if the deadline is in the future.
///
/// Returns `None` if the deadline has already passed.
#[inline]
fn duration_until(deadline: Instant) -> Option<Duration> {
    let now = Instant::now();
    if deadline > now {
        Some(deadline - now)
    } else {
        None
    }
}

/// A point in time after which a running engine is abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    limit: Duration,
}

impl Deadline {
    /// Deadline `limit` from now.
    #[must_use]
    pub fn after(limit: Duration) -> Self {
        Deadline {
            at: Instant::now() + limit,
            limit,
        }
    }

    /// Deadline for an optional limit; `None` means wait forever.
    #[must_use]
    pub fn from_limit(limit: Option<Duration>) -> Option<Self> {
        limit.map(Self::after)
    }

    /// Time left, zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        duration_until(self.at).unwrap_or(Duration::ZERO)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        duration_until(self.at).is_none()
    }

    /// The limit this deadline was created with.
    #[must_use]
    pub fn limit(&self) -> Duration {
        self.limit
    }
}
