//! Per-statement execution context
//!
//! One context is shared by every operator of a statement execution. It
//! carries the cancellation signal, the panic-recovery sink, and the run's
//! final error. None of this lives in global state; the owning execution
//! hands a handle to each operator at construction time.

use crate::error::Error;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinError;

/// Shared handle to one statement execution's control state.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    cancel: watch::Sender<bool>,
    error: Mutex<Option<Error>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                cancel,
                error: Mutex::new(None),
            }),
        }
    }

    /// Fire the shared cancellation signal. All operator loops return on
    /// their next suspension point.
    pub fn cancel(&self) {
        let _ = self.inner.cancel.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancel.borrow()
    }

    /// A receiver on the cancellation signal. Loops multiplex this against
    /// every channel operation with `wait_for(|cancelled| *cancelled)`.
    pub fn signal(&self) -> watch::Receiver<bool> {
        self.inner.cancel.subscribe()
    }

    /// Record the run's error. The first error wins; later ones are kept
    /// out so the root cause survives.
    pub fn store_error(&self, err: Error) {
        let mut slot = self.inner.error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub fn error(&self) -> Option<Error> {
        self.inner.error.lock().clone()
    }

    /// Fold a task join result into the context: a panicking operator
    /// aborts the statement with the panic's message, a cancelled one is
    /// silent.
    pub fn recover(&self, result: Result<(), JoinError>) {
        if let Err(err) = result {
            if err.is_panic() {
                self.store_error(Error::PanicCaptured(panic_message(err)));
            }
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort extraction of the message a task panicked with.
pub(crate) fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "task cancelled".to_string();
    }
    let panic = err.into_panic();
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_wins() {
        let ctx = ExecutionContext::new();
        ctx.store_error(Error::SourceNotFound("users".to_string()));
        ctx.store_error(Error::MissingScanner("orders".to_string()));
        assert_eq!(
            ctx.error(),
            Some(Error::SourceNotFound("users".to_string()))
        );
    }

    #[test]
    fn test_cancel_flag() {
        let ctx = ExecutionContext::new();
        assert!(!ctx.is_cancelled());
        ctx.cancel();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_observes_cancel() {
        let ctx = ExecutionContext::new();
        let mut sig = ctx.signal();
        ctx.cancel();
        // wait_for returns immediately when the value already satisfies the
        // predicate, covering signals fired before the subscription.
        sig.wait_for(|cancelled| *cancelled).await.unwrap();
    }

    #[tokio::test]
    async fn test_recover_captures_panic() {
        let ctx = ExecutionContext::new();
        let handle: tokio::task::JoinHandle<()> = tokio::spawn(async { panic!("boom") });
        ctx.recover(handle.await);
        assert_eq!(
            ctx.error(),
            Some(Error::PanicCaptured("boom".to_string()))
        );
    }
}
