//! # Cancellation Token
//!
//! A request carries one `CancelToken` propagated to every provider call and
//! health probe (spec §5). Cancelling it asks in-flight work to abort at its
//! next await point; breaker state is only ever updated for outcomes that
//! were actually observed, never invented for an aborted call. Built on
//! `tokio::sync::watch` rather than pulling in `tokio-util` solely for
//! `CancellationToken`, since the teacher's own dependency table doesn't
//! carry that crate (see `DESIGN.md`).

use tokio::sync::watch;

#[derive(Clone)]
pub struct CancelToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: std::sync::Arc::new(tx), rx }
    }

    /// Marks the token cancelled. Idempotent; subsequent calls are no-ops.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `cancel()` has been called. Safe to await from many
    /// clones concurrently.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_resolves_immediately_if_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test]
    async fn cancelled_resolves_once_cancel_is_called_from_a_clone() {
        let token = CancelToken::new();
        let clone = token.clone();
        let waiter = tokio::spawn(async move {
            clone.cancelled().await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        token.cancel();
        waiter.await.expect("task doesn't panic");
    }

    #[tokio::test]
    async fn uncancelled_token_reports_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }
}
