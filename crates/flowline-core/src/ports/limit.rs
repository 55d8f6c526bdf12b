//! Adaptive concurrency limiter port.

use async_trait::async_trait;

use crate::error::CodeError;

/// Permit pool driven by domain-error feedback.
///
/// The engine acquires before dispatching a batch, releases after it
/// returns, and shrinks the ceiling when a batch comes back with errors the
/// limiter classifies as throttling. The engine never grows the ceiling;
/// whether (and how) the pool re-expands is the limiter's own policy.
#[async_trait]
pub trait AutoLimit: Send + Sync {
    /// Block until `n` permits are available, then take them.
    async fn acquire(&self, n: i64);

    /// Return `n` permits unconditionally.
    fn release(&self, n: i64);

    /// Does this record error signal throttling (as opposed to a terminal
    /// failure)? Domain-specific.
    fn is_limit_error(&self, err: &CodeError) -> bool;

    /// Move the permit ceiling by `delta` (negative when throttled).
    fn add_limit_count(&self, delta: i64);
}
