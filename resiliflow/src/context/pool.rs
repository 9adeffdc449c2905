//! Pool of reusable execution contexts.

use super::ExecutionContext;
use crate::cancellation::CancellationToken;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// A thread-safe pool of [`ExecutionContext`] instances.
///
/// [`acquire`](Self::acquire) never blocks: it reuses an idle context or
/// allocates a fresh one. Contexts come back through the [`PooledContext`]
/// guard, on drop or through [`PooledContext::release`].
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<ExecutionContext>>,
    max_retained: usize,
}

impl ContextPool {
    /// Default upper bound on idle contexts kept for reuse.
    pub const DEFAULT_MAX_RETAINED: usize = 1024;

    /// Creates a new pool with the default retention bound.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_MAX_RETAINED)
    }

    /// Creates a pool that keeps at most `max_retained` idle contexts.
    #[must_use]
    pub fn with_capacity(max_retained: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_retained,
        }
    }

    /// Acquires a context bound to `cancellation_token`.
    ///
    /// The returned context always has an empty property bag.
    pub fn acquire(&self, cancellation_token: CancellationToken) -> PooledContext<'_> {
        let recycled = self.idle.lock().pop();
        let context = match recycled {
            Some(mut context) => {
                context.initialize(cancellation_token);
                context
            }
            None => ExecutionContext::new(cancellation_token),
        };

        PooledContext {
            pool: self,
            context: Some(context),
        }
    }

    /// Returns the number of idle contexts currently retained.
    #[must_use]
    pub fn retained(&self) -> usize {
        self.idle.lock().len()
    }

    /// Returns the retention bound.
    #[must_use]
    pub fn max_retained(&self) -> usize {
        self.max_retained
    }

    fn recycle(&self, mut context: ExecutionContext) {
        context.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_retained {
            idle.push(context);
        }
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A context on loan from a [`ContextPool`].
///
/// Dereferences to [`ExecutionContext`]. The context goes back to the pool
/// when the guard is dropped, on every exit path including unwinding.
#[derive(Debug)]
pub struct PooledContext<'a> {
    pool: &'a ContextPool,
    context: Option<ExecutionContext>,
}

impl PooledContext<'_> {
    /// Returns the context to the pool.
    ///
    /// Consumes the guard, so a context cannot be released twice.
    pub fn release(self) {
        drop(self);
    }
}

// `context` is only taken in `drop`, so it is always present while the guard is reachable.
impl Deref for PooledContext<'_> {
    type Target = ExecutionContext;

    #[allow(clippy::expect_used)]
    fn deref(&self) -> &Self::Target {
        self.context
            .as_ref()
            .expect("pooled context is present until released")
    }
}

impl DerefMut for PooledContext<'_> {
    #[allow(clippy::expect_used)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
            .as_mut()
            .expect("pooled context is present until released")
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.pool.recycle(context);
        }
    }
}
