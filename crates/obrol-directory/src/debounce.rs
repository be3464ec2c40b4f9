//! Query debouncing.
//!
//! Keystrokes arrive faster than the directory should refetch. The
//! debouncer coalesces raw input into an effective query after a quiet
//! window, using injected time like the session machine does.

use std::time::Duration;

/// Quiet window before raw input becomes the effective query.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(350);

/// Coalesces raw query input into an effective query.
///
/// Feed every keystroke through [`input`](Self::input); poll with
/// [`poll`](Self::poll) on ticks. `poll` yields the pending query once
/// the quiet window has elapsed with no further input, at most once per
/// input burst.
#[derive(Debug, Clone)]
pub struct QueryDebouncer<I> {
    window: Duration,
    pending: Option<(String, I)>,
}

impl<I> QueryDebouncer<I>
where
    I: Copy + Ord + std::ops::Add<Duration, Output = I>,
{
    /// Create a debouncer with the given quiet window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    /// Record raw input, restarting the quiet window.
    pub fn input(&mut self, query: impl Into<String>, now: I) {
        self.pending = Some((query.into(), now));
    }

    /// Yield the effective query if the quiet window has elapsed.
    pub fn poll(&mut self, now: I) -> Option<String> {
        match &self.pending {
            Some((_, since)) if now >= *since + self.window => {
                self.pending.take().map(|(query, _)| query)
            },
            _ => None,
        }
    }

    /// Whether input is waiting for its quiet window.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<I> Default for QueryDebouncer<I>
where
    I: Copy + Ord + std::ops::Add<Duration, Output = I>,
{
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn yields_after_quiet_window() {
        let mut debouncer: QueryDebouncer<Instant> = QueryDebouncer::default();
        let t0 = Instant::now();

        debouncer.input("al", t0);
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(349)), None);
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(350)), Some("al".to_string()));
        // Consumed: not yielded twice.
        assert_eq!(debouncer.poll(t0 + Duration::from_secs(10)), None);
    }

    #[test]
    fn new_input_restarts_the_window() {
        let mut debouncer: QueryDebouncer<Instant> = QueryDebouncer::default();
        let t0 = Instant::now();

        debouncer.input("a", t0);
        debouncer.input("al", t0 + Duration::from_millis(300));

        // 350ms after the first keystroke but only 50ms after the second.
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(350)), None);
        // Only the latest input ever surfaces.
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(650)), Some("al".to_string()));
    }

    #[test]
    fn empty_query_still_debounces() {
        // Clearing the search box is an input like any other.
        let mut debouncer: QueryDebouncer<Instant> = QueryDebouncer::default();
        let t0 = Instant::now();

        debouncer.input("", t0);
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(350)), Some(String::new()));
    }
}
