//! Hierarchical cancellation tokens.
//!
//! A token is a channel whose only sender is dropped on cancel, so `done()` can sit
//! in any `crossbeam_channel::select!` next to task queues and timers.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Cancellation handle shared between an owner and everything running under it.
///
/// Cancelling a token cancels every child derived from it with [`CancelToken::child`].
/// Clone is cheap (Arc internally).
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    // `None` once cancelled. Dropping the sender disconnects `done`.
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
    children: Mutex<Vec<Weak<TokenInner>>>,
    cause: Mutex<Option<String>>,
}

impl TokenInner {
    fn new() -> Self {
        let (trigger, done) = bounded(0);
        Self {
            trigger: Mutex::new(Some(trigger)),
            done,
            children: Mutex::new(Vec::new()),
            cause: Mutex::new(None),
        }
    }

    fn cancel(&self, cause: Option<String>) {
        // Clear the trigger before walking children so a concurrent `child()` either
        // registers first (and gets cancelled below) or observes the cancellation.
        let trigger = {
            let mut trigger = self.trigger.lock();
            if trigger.is_some() && cause.is_some() {
                *self.cause.lock() = cause;
            }
            trigger.take()
        };
        if trigger.is_none() {
            return;
        }
        drop(trigger);

        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel(None);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.trigger.lock().is_none()
    }
}

impl CancelToken {
    /// Create a root token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner::new()),
        }
    }

    /// Derive a token that is cancelled together with `self`, but can also be
    /// cancelled on its own without affecting the parent.
    pub fn child(&self) -> Self {
        let child = Self::new();
        let mut children = self.inner.children.lock();
        if self.inner.is_cancelled() {
            drop(children);
            child.cancel();
        } else {
            children.retain(|c| c.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    pub fn cancel(&self) {
        self.inner.cancel(None);
    }

    /// Cancel and record why. Only the first cause is kept, and only if this call is
    /// the one that cancels the token.
    pub fn cancel_with_cause(&self, cause: impl Into<String>) {
        self.inner.cancel(Some(cause.into()));
    }

    /// Cause recorded by [`CancelToken::cancel_with_cause`]. Children cancelled through
    /// their parent have none.
    pub fn cause(&self) -> Option<String> {
        self.inner.cause.lock().clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Receiver that becomes ready (disconnected) once the token is cancelled.
    /// Never yields a message.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }

    /// Block until cancelled.
    pub fn wait(&self) {
        let _ = self.inner.done.recv();
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
