//! Cooperative cancellation for render calls.
//!
//! A [`RenderContext`] travels with every [`crate::renderer::Renderer::process`]
//! call. Components check it at fixed checkpoints (before a chart load and
//! before a template render); an operation already in flight is never
//! interrupted.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::{CancelCause, RenderError, Result};

/// Cancellation token plus optional deadline.
///
/// Cloning is cheap and clones share cancellation state. [`RenderContext::child`]
/// derives a context that is cancelled with its parent but can also be
/// cancelled on its own.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RenderContext {
    /// A context that is never cancelled unless [`RenderContext::cancel`] is called.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    #[must_use]
    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// A context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child context; cancelling the parent cancels the child, not vice versa.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child context whose deadline is the earlier of the parent's and `now + timeout`.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: std::time::Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(existing), Some(candidate)) => Some(existing.min(candidate)),
            (existing, candidate) => existing.or(candidate),
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// Cancel this context and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The deadline, if one was set.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why this context is done, or `None` while it is still live.
    #[must_use]
    pub fn err(&self) -> Option<CancelCause> {
        if self.token.is_cancelled() {
            return Some(CancelCause::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelCause::DeadlineExceeded),
            _ => None,
        }
    }

    /// Whether the context was cancelled or its deadline passed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Checkpoint: fail with [`RenderError::Cancelled`] if the context is done.
    ///
    /// `stage` names the checkpoint in the resulting error, e.g. `"before render"`.
    pub fn check(&self, stage: &'static str) -> Result<()> {
        match self.err() {
            Some(cause) => Err(RenderError::Cancelled {
                stage,
                cause,
            }),
            None => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> CancelCause {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => CancelCause::Cancelled,
                    () = tokio::time::sleep_until(deadline) => CancelCause::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                CancelCause::Cancelled
            }
        }
    }
}
