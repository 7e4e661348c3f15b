//! Confirm timer: a single countdown used to bound a confirmation window

use chrono::{DateTime, Duration, Utc};
use clan_types::{ClanError, ClanResult};

/// A countdown with a fixed duration and an optional deadline.
///
/// Expiry is never detected proactively; callers ask [`ConfirmTimer::in_bounds`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmTimer {
    duration: Duration,
    deadline: Option<DateTime<Utc>>,
}

impl ConfirmTimer {
    /// Create an unstarted timer
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
        }
    }

    pub fn from_secs(secs: u64) -> Self {
        let duration = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self::new(duration)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn is_started(&self) -> bool {
        self.deadline.is_some()
    }

    /// Set the deadline to now + duration
    pub fn start(&mut self) {
        self.start_at(Utc::now());
    }

    pub fn start_at(&mut self, now: DateTime<Utc>) {
        let deadline = now
            .checked_add_signed(self.duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.deadline = Some(deadline);
    }

    /// Clear the deadline
    pub fn reset(&mut self) {
        self.deadline = None;
    }

    /// Whether now precedes the deadline. Asking an unstarted timer is a
    /// caller bug and reported as [`ClanError::TimerNotStarted`].
    pub fn in_bounds(&self) -> ClanResult<bool> {
        self.in_bounds_at(Utc::now())
    }

    pub fn in_bounds_at(&self, now: DateTime<Utc>) -> ClanResult<bool> {
        match self.deadline {
            Some(deadline) => Ok(now < deadline),
            None => Err(ClanError::TimerNotStarted),
        }
    }
}
