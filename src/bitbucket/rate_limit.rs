//! Client-side request budgeting for bulk downloads.
//!
//! Bitbucket Cloud allows roughly 1000 API requests per hour. The bulk
//! image dumper stays under that ceiling by tracking its own request count
//! against a slightly padded window and pausing until the window resets
//! once the budget is spent.

use std::time::{Duration, Instant};

/// Requests permitted per window, leaving jitter headroom under the
/// documented 1000-per-hour ceiling.
pub const CLOUD_REQUEST_LIMIT: u32 = 970;

/// Window length: one hour plus a minute of slack.
pub const CLOUD_WINDOW: Duration = Duration::from_secs(3600 + 60);

/// Tracks requests issued against a fixed per-window budget.
///
/// # Example
///
/// ```
/// use std::time::Instant;
/// use bbexport::bitbucket::rate_limit::RequestBudget;
///
/// let mut budget = RequestBudget::new(2, std::time::Duration::from_secs(60));
/// let now = Instant::now();
/// budget.record(now);
/// assert!(!budget.is_exhausted());
/// budget.record(now);
/// assert!(budget.is_exhausted());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestBudget {
    limit: u32,
    window: Duration,
    used: u32,
    window_opened_at: Option<Instant>,
}

impl RequestBudget {
    /// Creates a budget with the given per-window request limit.
    #[must_use]
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            used: 0,
            window_opened_at: None,
        }
    }

    /// Budget matching the Bitbucket Cloud request ceiling.
    #[must_use]
    pub const fn bitbucket_cloud() -> Self {
        Self::new(CLOUD_REQUEST_LIMIT, CLOUD_WINDOW)
    }

    /// Records one issued request. The window opens on the first request.
    pub const fn record(&mut self, now: Instant) {
        if self.window_opened_at.is_none() {
            self.window_opened_at = Some(now);
        }
        self.used = self.used.saturating_add(1);
    }

    /// Returns the number of requests recorded in the current window.
    #[must_use]
    pub const fn used(&self) -> u32 {
        self.used
    }

    /// Returns true once the window budget is spent.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }

    /// Instant at which the current window closes and requests may resume.
    ///
    /// Returns `now` when no request has opened a window yet.
    #[must_use]
    pub fn resumes_at(&self, now: Instant) -> Instant {
        self.window_opened_at
            .map_or(now, |opened| opened + self.window)
    }

    /// Time left until the window closes, saturating at zero.
    #[must_use]
    pub fn pause_for(&self, now: Instant) -> Duration {
        self.resumes_at(now).saturating_duration_since(now)
    }

    /// Opens a fresh window with the full budget.
    pub const fn reset(&mut self) {
        self.used = 0;
        self.window_opened_at = None;
    }
}

impl Default for RequestBudget {
    fn default() -> Self {
        Self::bitbucket_cloud()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::RequestBudget;

    #[test]
    fn budget_exhausts_after_limit_requests() {
        let mut budget = RequestBudget::new(3, Duration::from_secs(60));
        let now = Instant::now();

        for _ in 0..2 {
            budget.record(now);
        }
        assert!(!budget.is_exhausted());

        budget.record(now);
        assert!(budget.is_exhausted());
    }

    #[test]
    fn window_opens_on_first_request() {
        let mut budget = RequestBudget::new(10, Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(budget.resumes_at(start), start);

        budget.record(start);
        assert_eq!(budget.resumes_at(start), start + Duration::from_secs(60));
    }

    #[test]
    fn pause_for_saturates_once_window_passed() {
        let mut budget = RequestBudget::new(1, Duration::from_secs(1));
        let start = Instant::now();
        budget.record(start);

        let later = start + Duration::from_secs(5);
        assert_eq!(budget.pause_for(later), Duration::ZERO);
    }

    #[test]
    fn reset_restores_the_full_budget() {
        let mut budget = RequestBudget::new(1, Duration::from_secs(60));
        budget.record(Instant::now());
        assert!(budget.is_exhausted());

        budget.reset();
        assert!(!budget.is_exhausted());
        assert_eq!(budget.used(), 0);
    }
}
