//! Runtime facade for the playback engine.
//!
//! Every `core-*` and `bridge-*` crate reaches the async runtime through this
//! crate instead of naming Tokio directly. Keeping the runtime behind one seam
//! means the engine can be moved to another executor (or a single-threaded
//! host loop) by changing only these re-exports.
//!
//! # Modules
//!
//! - `task`: Task spawning and join handles
//! - `time`: Sleep, timeouts, intervals and monotonic instants
//! - `sync`: Channels, locks and cooperative cancellation
//! - `runtime`: Blocking entry points for hosts without an ambient runtime
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example(token: CancellationToken) {
//!     core_async::select! {
//!         _ = token.cancelled() => {}
//!         _ = sleep(Duration::from_millis(10)) => {}
//!     }
//! }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

/// Waits on several async branches and runs the first one to complete.
pub use tokio::select;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
