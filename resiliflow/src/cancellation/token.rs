//! Cancellation token for cooperative cancellation.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tracing::warn;

/// A callback type for cancellation notifications.
pub type CancelCallback = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Pending {
    reason: Option<String>,
    callbacks: Vec<CancelCallback>,
    children: Vec<Weak<TokenState>>,
}

#[derive(Default)]
struct TokenState {
    cancelled: AtomicBool,
    pending: Mutex<Pending>,
    notify: Notify,
}

impl TokenState {
    fn is_set(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self, reason: String) {
        let (callbacks, children) = {
            let mut pending = self.pending.lock();
            if self.is_set() {
                return;
            }
            pending.reason = Some(reason.clone());
            self.cancelled.store(true, Ordering::SeqCst);
            (
                std::mem::take(&mut pending.callbacks),
                std::mem::take(&mut pending.children),
            )
        };

        self.notify.notify_waiters();

        for callback in &callbacks {
            invoke_guarded(callback.as_ref());
        }
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel(reason.clone());
        }
    }

    async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }
}

/// A cloneable handle for cooperative cancellation.
///
/// Clones share state. Cancellation is idempotent - only the first reason is kept.
/// A [child token](Self::child_token) is cancelled whenever it or any ancestor is
/// cancelled; cancelling a child never affects its parent.
///
/// Parents only hold weak links to their children, so dropping a child releases
/// its callbacks without touching the parent.
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
    is_child: bool,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is also cancelled when this token is cancelled.
    ///
    /// A child of an already cancelled token starts cancelled with the same reason.
    #[must_use]
    pub fn child_token(&self) -> Self {
        let child = Self {
            state: Arc::new(TokenState::default()),
            is_child: true,
        };

        let inherited = {
            let mut pending = self.state.pending.lock();
            if pending.reason.is_none() {
                pending.children.retain(|link| link.strong_count() > 0);
                pending.children.push(Arc::downgrade(&child.state));
            }
            pending.reason.clone()
        };
        if let Some(reason) = inherited {
            child.state.cancel(reason);
        }

        child
    }

    /// Requests cancellation with a reason.
    ///
    /// This is idempotent - only the first reason is kept.
    /// Callbacks are invoked immediately. Panics in callbacks are logged and suppressed.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.state.cancel(reason.into());
    }

    /// Registers a callback to be invoked on cancellation.
    ///
    /// If already cancelled, the callback is invoked immediately.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: CancelCallback = Box::new(callback);
        {
            let mut pending = self.state.pending.lock();
            if !self.state.is_set() {
                pending.callbacks.push(callback);
                return;
            }
        }
        invoke_guarded(callback.as_ref());
    }

    /// Returns whether cancellation has been requested on this token or an ancestor.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.is_set()
    }

    /// Returns the cancellation reason, if any.
    ///
    /// A child cancelled through an ancestor carries the ancestor's reason.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.state.pending.lock().reason.clone()
    }

    /// Completes once this token or any ancestor is cancelled.
    pub async fn cancelled(&self) {
        self.state.wait().await;
    }
}

fn invoke_guarded(callback: &(dyn Fn() + Send + Sync)) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)) {
        warn!("Cancellation callback panicked: {:?}", e);
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .field("is_child", &self.is_child)
            .finish()
    }
}
