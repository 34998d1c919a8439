use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{LoadError, LoadResult};

/// A cooperative cancellation flag shared between a load and its background steps.
#[derive(Clone, Default, Debug)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

#[derive(Default, Debug)]
struct TokenState {
    cancelled: AtomicBool,
    parent: Option<CancellationToken>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is cancelled by itself or by any of its ancestors.
    pub fn child_token(&self) -> Self {
        Self {
            inner: Arc::new(TokenState {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
            || self
                .inner
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_cancelled())
    }

    pub fn check(&self) -> LoadResult<()> {
        if self.is_cancelled() {
            Err(LoadError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_flows_to_children_only() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        let grandchild = child.child_token();

        assert!(grandchild.check().is_ok());

        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(child.is_cancelled());
        assert!(matches!(grandchild.check(), Err(LoadError::Cancelled)));

        let sibling = parent.child_token();
        parent.cancel();
        assert!(sibling.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();

        clone.cancel();
        assert!(token.is_cancelled());
    }
}
