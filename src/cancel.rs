//! Cooperative cancellation for in-flight resolutions
//!
//! Resolutions share a [`CancellationToken`]: clones observe the same state,
//! and `cancel()` and `is_cancelled()` work without an async runtime. The
//! resolver checks it between phases and during git transfers; once
//! cancelled, the resolution ends with [`ResolveError::Cancelled`] and
//! returns no bundle.

pub use tokio_util::sync::CancellationToken;

use crate::error::{ResolveError, Result};

/// Turns a cancelled token into an error for `?`
pub trait CancellationExt {
    /// Return `Err(Cancelled)` if cancellation was requested
    fn check(&self) -> Result<()>;
}

impl CancellationExt for CancellationToken {
    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ResolveError::Cancelled)
        } else {
            Ok(())
        }
    }
}
