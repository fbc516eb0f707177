//! Runtime entry points for hosts that do not already run an executor.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// Returns an I/O error when the runtime cannot be created instead of
/// panicking, so callers on host threads can surface the failure.
pub fn block_on<F>(future: F) -> std::io::Result<F::Output>
where
    F: std::future::Future,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

/// Returns `true` when called from inside a runtime context.
pub fn in_runtime() -> bool {
    Handle::try_current().is_ok()
}
