//! Synchronization primitives.
//!
//! Async-aware channels and locks from `tokio::sync`, plus the cooperative
//! [`CancellationToken`] used to abandon superseded work (a resolution for a
//! track the user already skipped, a preload for a queue position that moved).
//!
//! ```rust
//! use core_async::sync::{mpsc, CancellationToken};
//!
//! async fn example() {
//!     let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
//!     let token = CancellationToken::new();
//!     tx.send(7).unwrap();
//!     token.cancel();
//!     assert_eq!(rx.recv().await, Some(7));
//!     assert!(token.is_cancelled());
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard, Semaphore, SemaphorePermit,
};
pub use tokio_util::sync::{CancellationToken, DropGuard};
