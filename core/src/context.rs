//! Cancellation and deadline handle carried by every request.
//!
//! # Design
//! A `Context` is a cheap `Arc` handle around a `CancellationToken` and an
//! optional deadline. Cloning it yields the *same* context (`same_as` is
//! true); `child*` methods derive a new one whose token is a child of the
//! parent's and whose deadline never outlives the parent's. Cancellation is
//! cooperative: transports poll `err()` and bound their I/O by `remaining()`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A root context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::new(CancellationToken::new(), None)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self::new(CancellationToken::new(), Some(deadline))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    fn new(token: CancellationToken, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner { token, deadline }),
        }
    }

    /// Derive a context cancelled whenever `self` is.
    pub fn child(&self) -> Self {
        self.derive(None)
    }

    /// Derive a context that also expires after `timeout`.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.derive(Some(Instant::now() + timeout))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let deadline = match (self.deadline(), deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self::new(self.inner.token.child_token(), deadline)
    }

    /// Cancel this context and all contexts derived from it.
    pub fn cancel(&self) {
        self.inner.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// The underlying token, for callers that await cancellation.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.inner.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline; `Some(ZERO)` once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// `None` while the context is live. Cancellation wins over expiry.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline() {
            Some(d) if Instant::now() >= d => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// True when both handles refer to the same context.
    pub fn same_as(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_never_done() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
    }

    #[test]
    fn cancel_propagates_to_children_only() {
        let parent = Context::background();
        let child = parent.child();
        let grandchild = child.child();

        child.cancel();
        assert!(parent.err().is_none());
        assert_eq!(child.err(), Some(ContextError::Cancelled));
        assert_eq!(grandchild.err(), Some(ContextError::Cancelled));

        parent.cancel();
        assert_eq!(parent.err(), Some(ContextError::Cancelled));
    }

    #[test]
    fn expired_deadline_reports_deadline_exceeded() {
        let ctx = Context::with_timeout(Duration::ZERO);
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn cancellation_wins_over_expiry() {
        let ctx = Context::with_timeout(Duration::ZERO);
        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
    }

    #[test]
    fn child_keeps_earlier_deadline() {
        let parent = Context::with_timeout(Duration::from_secs(1));
        let child = parent.child_with_timeout(Duration::from_secs(3600));
        assert_eq!(child.deadline(), parent.deadline());

        let tighter = parent.child_with_timeout(Duration::ZERO);
        assert!(tighter.deadline() < parent.deadline());
    }

    #[test]
    fn cancelling_parent_token_reaches_children() {
        let parent = Context::background();
        let child = parent.child_with_timeout(Duration::from_secs(60));

        parent.cancellation_token().cancel();
        assert!(child.cancellation_token().is_cancelled());
        assert_eq!(child.err(), Some(ContextError::Cancelled));
    }

    #[test]
    fn clones_share_identity() {
        let ctx = Context::background();
        assert!(ctx.same_as(&ctx.clone()));
        assert!(!ctx.same_as(&ctx.child()));
        assert!(!ctx.same_as(&Context::background()));
    }
}
