//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system time. Production uses the real
//! clock ([`SystemEnv`]); tests drive a manual clock
//! ([`test_utils::MockEnv`]) so backoff delays, heartbeat intervals, and
//! debounce windows elapse instantly and deterministically.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// Abstract environment providing monotonic and wall-clock time.
///
/// Implementations MUST guarantee that `now()` never goes backwards within
/// a single execution context.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The monotonic instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; test environments
    /// may advance a virtual clock.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + Add<Duration, Output = Self::Instant>
        + Sub<Self::Instant, Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time as milliseconds since the Unix epoch.
    ///
    /// Used only to timestamp message-log entries; never for scheduling.
    fn unix_millis(&self) -> u64;
}

/// Production environment backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn unix_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Test environments with a manually advanced clock.
pub mod test_utils {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::Environment;

    #[derive(Debug)]
    struct Inner {
        base: std::time::Instant,
        elapsed: Duration,
        wall_ms: u64,
    }

    /// Manual-clock environment for deterministic tests.
    ///
    /// Time only moves when [`MockEnv::advance`] is called.
    #[derive(Debug, Clone)]
    pub struct MockEnv {
        inner: Arc<Mutex<Inner>>,
    }

    impl MockEnv {
        /// Create a mock environment anchored at an arbitrary epoch.
        #[must_use]
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(Inner {
                    base: std::time::Instant::now(),
                    elapsed: Duration::ZERO,
                    wall_ms: 1_700_000_000_000,
                })),
            }
        }

        /// Advance both the monotonic and wall clocks.
        pub fn advance(&self, by: Duration) {
            if let Ok(mut inner) = self.inner.lock() {
                inner.elapsed += by;
                inner.wall_ms += u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
            }
        }
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Environment for MockEnv {
        type Instant = std::time::Instant;

        fn now(&self) -> Self::Instant {
            self.inner
                .lock()
                .map_or_else(|_| std::time::Instant::now(), |inner| inner.base + inner.elapsed)
        }

        fn unix_millis(&self) -> u64 {
            self.inner.lock().map_or(0, |inner| inner.wall_ms)
        }
    }
}
