//! Cooperative cancellation for planning passes.
//!
//! A planning pass has exactly one cancellation point: the check performed
//! right before analysis begins. Collection may still be running on worker
//! threads when a caller decides to abandon the pass, so the token is cheap
//! to clone and share across threads.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::error::{PlanError, PlanResult};

/// A token used to signal that a planning pass should be abandoned.
///
/// # Examples
///
/// ```
/// use ferrous_plan::{CancellationToken, PlanError};
///
/// let token = CancellationToken::new();
/// assert!(token.check().is_ok());
///
/// let child = token.child_token();
/// token.cancel();
/// assert!(matches!(child.check(), Err(PlanError::Cancelled)));
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationTokenInner>,
}

struct CancellationTokenInner {
    cancelled: AtomicBool,
    parent: Option<CancellationToken>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    /// Creates a child token cancelled together with this one.
    ///
    /// Useful when a multi-unit build shares one root token and each unit's
    /// pass gets its own child.
    pub fn child_token(&self) -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Returns true if this token or any ancestor was cancelled.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        match self.inner.parent {
            Some(ref parent) => parent.is_cancelled(),
            None => false,
        }
    }

    /// The single cooperative check.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> PlanResult<()> {
        if self.is_cancelled() {
            Err(PlanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_basic() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_child_token_independent_cancellation() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let token = CancellationToken::new();
        let remote = token.clone();
        std::thread::spawn(move || remote.cancel()).join().unwrap();
        assert!(matches!(token.check(), Err(PlanError::Cancelled)));
    }
}
