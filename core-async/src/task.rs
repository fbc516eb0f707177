//! Task spawning.
//!
//! Tasks spawned here run on the ambient Tokio runtime. Dropping a
//! [`JoinHandle`] detaches the task; call [`JoinHandle::abort`] (or cancel the
//! token the task watches) to stop it.

pub use tokio::task::{yield_now, AbortHandle, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the current runtime.
///
/// ```rust
/// # async fn example() {
/// let handle = core_async::task::spawn(async { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # }
/// ```
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
