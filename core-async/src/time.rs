//! Time-related abstractions.
//!
//! Re-exports Tokio's timer primitives. Under `tokio::time::pause()` (the
//! `test-util` feature) every timer here follows the virtual clock, which is
//! what the engine tests rely on to exercise timeouts and backoff without
//! real waiting.
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(5)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(5));
//! }
//! ```

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
pub use tokio::time::{
    interval, sleep, sleep_until, timeout, Instant, Interval, MissedTickBehavior, Sleep, Timeout,
};

/// Error returned by [`timeout`] when the deadline elapses first.
pub use tokio::time::error::Elapsed;
